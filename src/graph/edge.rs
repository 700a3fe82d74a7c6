//! Edge representation and state machine (spec §3, §4.13 state table).

use crate::document::DocumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    pub fn new(collection: &str) -> Self {
        Self(format!("{}/{}", collection, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EdgeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A bi-temporal relationship between two documents.
///
/// `valid_at`/`invalid_at`/`created_at` carry knowledge-time; only
/// `invalid_at`, `invalidation_reason`, and `invalidated_by` ever mutate after
/// insertion (§3 Lifecycles) — `valid_at` is write-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub key: String,
    pub from: DocumentId,
    pub to: DocumentId,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub valid_at: DateTime<Utc>,
    pub invalid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub confidence: Option<f32>,
    pub context_confidence: Option<f32>,
    pub rationale: Option<String>,
    pub invalidation_reason: Option<String>,
    pub invalidated_by: Option<String>,
    pub merged_from: Vec<String>,
    pub weight: Option<f32>,
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    /// Set when this edge was materialized from a retained `QAPair` (C12/C13).
    #[serde(default)]
    pub question_type: Option<crate::qa::QuestionType>,
}

impl Edge {
    pub fn new(
        collection: &str,
        from: DocumentId,
        to: DocumentId,
        edge_type: impl Into<String>,
        valid_at: DateTime<Utc>,
    ) -> Self {
        let id = EdgeId::new(collection);
        let key = id.as_str().rsplit('/').next().unwrap_or_default().to_string();
        Self {
            id,
            key,
            from,
            to,
            edge_type: edge_type.into(),
            valid_at,
            invalid_at: None,
            created_at: Utc::now(),
            confidence: None,
            context_confidence: None,
            rationale: None,
            invalidation_reason: None,
            invalidated_by: None,
            merged_from: Vec::new(),
            weight: None,
            attributes: HashMap::new(),
            question_type: None,
        }
    }

    /// Invariant 1 (spec §3): active at `t` iff `valid_at <= t < invalid_at`
    /// (half-open interval, per spec §9's resolution of the source's mixed
    /// overlap semantics).
    pub fn active_at(&self, t: DateTime<Utc>) -> bool {
        self.valid_at <= t && self.invalid_at.map(|inv| t < inv).unwrap_or(true)
    }

    pub fn is_active(&self) -> bool {
        self.invalid_at.is_none()
    }

    /// `invalidate_edge`: idempotent — invalidating an already-invalidated
    /// edge is a no-op so `invalid_at` never moves (testable property
    /// "Invalidation idempotence").
    pub fn invalidate(&mut self, invalid_at: DateTime<Utc>, reason: impl Into<String>, by: Option<String>) {
        if self.invalid_at.is_some() {
            return;
        }
        self.invalid_at = Some(invalid_at);
        self.invalidation_reason = Some(reason.into());
        self.invalidated_by = by;
    }

    /// Two half-open intervals `[a1,b1)` and `[a2,b2)` overlap iff
    /// `a1 < b2 && a2 < b1`, treating a `None` upper bound as `+inf`.
    pub fn overlaps(&self, other: &Edge) -> bool {
        let a1 = self.valid_at;
        let b1 = self.invalid_at;
        let a2 = other.valid_at;
        let b2 = other.invalid_at;
        let lhs = match b2 {
            Some(b2) => a1 < b2,
            None => true,
        };
        let rhs = match b1 {
            Some(b1) => a2 < b1,
            None => true,
        };
        lhs && rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn edge(valid: DateTime<Utc>, invalid: Option<DateTime<Utc>>) -> Edge {
        let mut e = Edge::new(
            "relationships",
            DocumentId::from("documents/x"),
            DocumentId::from("documents/y"),
            "relates_to",
            valid,
        );
        e.invalid_at = invalid;
        e
    }

    #[test]
    fn active_at_is_half_open() {
        let e = edge(t(2020, 1, 1), Some(t(2020, 6, 1)));
        assert!(e.active_at(t(2020, 1, 1)));
        assert!(!e.active_at(t(2020, 6, 1)));
    }

    #[test]
    fn invalidation_is_idempotent() {
        let mut e = edge(t(2020, 1, 1), None);
        e.invalidate(t(2020, 6, 1), "first", None);
        let first = e.invalid_at;
        e.invalidate(t(2020, 7, 1), "second", None);
        assert_eq!(e.invalid_at, first);
    }

    #[test]
    fn overlap_detects_touching_but_not_adjacent_intervals() {
        let e1 = edge(t(2020, 1, 1), Some(t(2020, 6, 1)));
        let e2 = edge(t(2020, 6, 1), Some(t(2020, 12, 1)));
        assert!(!e1.overlaps(&e2));

        let e3 = edge(t(2020, 5, 1), Some(t(2020, 12, 1)));
        assert!(e1.overlaps(&e3));
    }
}
