/// Correlation module for discovering incidents that share artifact values
///
/// This module provides:
/// - Cross-incident artifact search with bounded fan-out
/// - The related-incident set (deduplicated, base incident excluded, sorted output)
/// - Strict and lenient handling of failed searches

pub mod engine;
pub mod models;

pub use engine::{CorrelationEngine, ValueMatches};
pub use models::{CorrelationOutcome, RelatedIncidentSet, SkippedQuery};
