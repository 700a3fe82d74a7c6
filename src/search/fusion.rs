//! Weighted Reciprocal Rank Fusion (C8, spec §4.7).

use super::SearchHit;
use crate::document::DocumentId;
use std::collections::HashMap;

pub const DEFAULT_RRF_K: f32 = 60.0;

/// One ranked input list plus its fusion weight.
pub struct WeightedList<'a> {
    pub hits: &'a [SearchHit],
    pub weight: f32,
}

/// `hybrid(d) = sum_i w_i / (rrf_k + r_i(d))`, where a document absent from
/// list `i` is assigned rank `len(list_i) + 1` (SPEC_FULL §3.S, confirmed
/// against the original's `weighted_reciprocal_rank_fusion`).
///
/// Pure and deterministic: same inputs and weights always produce the same
/// output, and no signal's underlying score scale leaks into the result.
pub fn weighted_reciprocal_rank_fusion(lists: &[WeightedList], rrf_k: f32) -> Vec<SearchHit> {
    let mut rank_of: Vec<HashMap<String, usize>> = Vec::with_capacity(lists.len());
    for list in lists {
        let mut ranks = HashMap::new();
        for hit in list.hits {
            ranks.entry(hit.document_id.as_str().to_string()).or_insert(hit.rank);
        }
        rank_of.push(ranks);
    }

    let mut all_ids: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for list in lists {
        for hit in list.hits {
            let id = hit.document_id.as_str().to_string();
            if seen.insert(id.clone()) {
                all_ids.push(id);
            }
        }
    }

    let mut fused: Vec<SearchHit> = all_ids
        .into_iter()
        .map(|id| {
            let mut score = 0.0f32;
            for (i, list) in lists.iter().enumerate() {
                let not_present_rank = list.hits.len() + 1;
                let rank = *rank_of[i].get(&id).unwrap_or(&not_present_rank);
                score += list.weight / (rrf_k + rank as f32);
            }
            SearchHit {
                document_id: DocumentId::from_string(id),
                score,
                similarity_score: None,
                tag_match_score: None,
                rank: 0,
            }
        })
        .collect();

    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    for (i, hit) in fused.iter_mut().enumerate() {
        hit.rank = i + 1;
    }
    fused
}

/// Normalize weights to sum to 1.0, returning whether renormalization
/// actually changed anything (spec §4.8 step 1: "warn if renormalized").
pub fn normalize_weights(weights: &mut [f32]) -> bool {
    let sum: f32 = weights.iter().sum();
    if sum <= 0.0 || (sum - 1.0).abs() < 1e-6 {
        return false;
    }
    for w in weights.iter_mut() {
        *w /= sum;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, rank: usize) -> SearchHit {
        SearchHit { document_id: DocumentId::from(id), score: 0.0, similarity_score: None, tag_match_score: None, rank }
    }

    #[test]
    fn scenario_rrf_fusion_orders_a_then_c() {
        let l1 = vec![hit("a", 1), hit("b", 2), hit("c", 3)];
        let l2 = vec![hit("c", 1), hit("a", 2), hit("d", 3)];
        let fused = weighted_reciprocal_rank_fusion(
            &[WeightedList { hits: &l1, weight: 0.5 }, WeightedList { hits: &l2, weight: 0.5 }],
            60.0,
        );
        let top2: Vec<&str> = fused.iter().take(2).map(|h| h.document_id.as_str()).collect();
        assert_eq!(top2, vec!["a", "c"]);
    }

    #[test]
    fn fusion_bound_holds_for_every_document() {
        let l1 = vec![hit("a", 1), hit("b", 2)];
        let l2 = vec![hit("b", 1), hit("a", 2)];
        let weights = [0.5, 0.5];
        let rrf_k = 60.0;
        let fused = weighted_reciprocal_rank_fusion(
            &[WeightedList { hits: &l1, weight: weights[0] }, WeightedList { hits: &l2, weight: weights[1] }],
            rrf_k,
        );
        let bound: f32 = weights.iter().sum::<f32>() / (rrf_k + 1.0);
        assert!(fused.iter().all(|h| h.score <= bound + 1e-6));
    }

    #[test]
    fn swapping_equal_weight_signals_swaps_their_contribution_symmetrically() {
        let l1 = vec![hit("a", 1), hit("b", 2)];
        let l2 = vec![hit("b", 1), hit("a", 2)];
        let fused_ab = weighted_reciprocal_rank_fusion(
            &[WeightedList { hits: &l1, weight: 0.5 }, WeightedList { hits: &l2, weight: 0.5 }],
            60.0,
        );
        let fused_ba = weighted_reciprocal_rank_fusion(
            &[WeightedList { hits: &l2, weight: 0.5 }, WeightedList { hits: &l1, weight: 0.5 }],
            60.0,
        );
        let score_a_1 = fused_ab.iter().find(|h| h.document_id.as_str() == "a").unwrap().score;
        let score_a_2 = fused_ba.iter().find(|h| h.document_id.as_str() == "a").unwrap().score;
        assert!((score_a_1 - score_a_2).abs() < 1e-6);
    }

    #[test]
    fn normalize_weights_only_reports_change_when_needed() {
        let mut w = [0.5, 0.5];
        assert!(!normalize_weights(&mut w));
        let mut w2 = [1.0, 1.0];
        assert!(normalize_weights(&mut w2));
        assert!((w2[0] - 0.5).abs() < 1e-6);
    }
}
