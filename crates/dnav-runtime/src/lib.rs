//! D-NAV Runtime — extraction strategies and the end-to-end extractor.
//!
//! Three interchangeable strategies (`LocalHeuristic`, `ModelExtraction`,
//! `ModelRefinement`) share one local core; the [`Extractor`] handles page
//! selection, the secondary-pass fallback, ranking and the response shape.

pub mod extractor;
pub mod request;
pub mod scoring;
pub mod strategy;

pub use extractor::{rank_and_cap, Extractor};
pub use request::{ExtractRequest, ValidatedRequest};
pub use scoring::CandidateScorer;
pub use strategy::{
    ExtractionStrategy, LocalHeuristic, ModelExtraction, ModelRefinement, PassInput, PassOutput,
};
