//! Edge enricher (C12, spec §4.10).

use super::contradiction::{resolve_all_contradictions, ResolutionStrategy};
use crate::error::GraphResult;
use crate::qa::QuestionType;
use crate::storage::Store;
use serde::Serialize;

const DEFAULT_FIELD: f32 = 0.5;

/// `weight = base_type_weight[question_type] * (confidence + context_confidence)/2 * weight_factor`.
pub fn compute_weight(
    question_type: Option<QuestionType>,
    confidence: Option<f32>,
    context_confidence: Option<f32>,
    weight_factor: f32,
) -> f32 {
    let base = question_type.map(|qt| qt.base_weight()).unwrap_or(DEFAULT_FIELD);
    let confidence = confidence.unwrap_or(DEFAULT_FIELD);
    let context_confidence = context_confidence.unwrap_or(DEFAULT_FIELD);
    base * (confidence + context_confidence) / 2.0 * weight_factor
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentReport {
    pub total_edges: usize,
    pub search_added: usize,
    pub contradictions_checked: usize,
    pub contradictions_found: usize,
    pub contradictions_resolved: usize,
    pub weights_updated: usize,
    pub errors: Vec<String>,
}

/// Runs weight computation, search-view registration (modeled as a no-op
/// here since ArangoSearch views have no SQLite analogue beyond the FTS5
/// table already maintained by triggers), and a contradiction sweep over
/// every edge in `collection`.
pub async fn enrich_edges(
    store: &dyn Store,
    collection: &str,
    weight_factor: f32,
    strategy: ResolutionStrategy,
) -> GraphResult<EnrichmentReport> {
    let edges = store.all_edges(collection).await?;
    let mut report = EnrichmentReport { total_edges: edges.len(), ..Default::default() };

    for edge in edges {
        let mut edge = edge;
        let weight = compute_weight(edge.question_type, edge.confidence, edge.context_confidence, weight_factor);
        edge.weight = Some(weight);
        if let Err(e) = store.update_edge(&edge).await {
            report.errors.push(format!("failed to update weight for {}: {e}", edge.key));
            continue;
        }
        report.weights_updated += 1;
        report.search_added += 1;

        report.contradictions_checked += 1;
        match resolve_all_contradictions(store, &mut edge, strategy, &[]).await {
            Ok((outcomes, success)) => {
                if !outcomes.is_empty() {
                    report.contradictions_found += outcomes.len();
                    if success {
                        report.contradictions_resolved += outcomes.len();
                    }
                }
            }
            Err(e) => report.errors.push(format!("contradiction sweep failed for {}: {e}", edge.key)),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_uses_defaults_for_missing_fields() {
        let w = compute_weight(Some(QuestionType::Factual), None, None, 1.0);
        assert!((w - QuestionType::Factual.base_weight() * 0.5).abs() < 1e-6);
    }
}
