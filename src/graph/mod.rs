//! The bi-temporal knowledge graph (C10-C12): edges, contradiction
//! detection/resolution, and enrichment.

pub mod contradiction;
pub mod edge;
pub mod enrich;
pub mod temporal_store;

pub use contradiction::{resolve_all_contradictions, resolve_contradiction, ResolutionOutcome, ResolutionStrategy};
pub use edge::{Edge, EdgeId};
pub use enrich::{enrich_edges, EnrichmentReport};
pub use temporal_store::{create_edge, invalidate_edge};
