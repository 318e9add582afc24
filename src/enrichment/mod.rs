//! Complaint enrichment.
//!
//! Raw text goes in, an [`EnrichmentResult`] comes out:
//! 1. `validate_text()`: the only way enrichment can fail
//! 2. `EnrichmentOrchestrator`: concurrent classifier fan-out with per-call deadlines
//! 3. `CategoryMapper`: folds free-form category labels into buckets
//!
//! External-service failures degrade values; they never abort enrichment.

pub mod mapping;
pub mod orchestrator;
pub mod types;

pub use mapping::CategoryMapper;
pub use orchestrator::{EnrichmentOrchestrator, validate_text};
pub use types::{Category, EnrichmentResult, Sentiment};
