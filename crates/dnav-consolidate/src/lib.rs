//! Consolidation — near-duplicate clustering and candidate merging.
//!
//! The clusterer collapses canonicalized units into canonical decisions with
//! provenance; the merge resolver decides which of two duplicate user-facing
//! candidates survives and how their evidence and tags combine.

pub mod cluster;
pub mod merge;
pub mod types;

pub use cluster::Clusterer;
pub use merge::MergeResolver;
pub use types::*;
