//! Consolidation types.

use serde::Serialize;

use dnav_core::CanonicalDecision;

/// Counts from one clustering run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterReport {
    pub units: usize,
    #[serde(rename = "keyGroups")]
    pub key_groups: usize,
    pub decisions: usize,
    #[serde(rename = "mergedDecisions")]
    pub merged_decisions: usize,
    #[serde(rename = "suggestedPairs")]
    pub suggested_pairs: usize,
}

/// Canonical decisions plus the run report.
#[derive(Debug, Clone, Default)]
pub struct Clustering {
    pub decisions: Vec<CanonicalDecision>,
    pub report: ClusterReport,
}

/// Which duplicate threshold a merge uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeScope {
    /// Local candidates merged with each other.
    Local,
    /// Local candidates merged with model output.
    Cross,
}
