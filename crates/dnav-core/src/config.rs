//! Extraction thresholds and runtime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which extraction strategy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Heuristic pipeline only, no external calls.
    #[default]
    Local,
    /// Page snippets are sent to the external model for extraction.
    Extract,
    /// Locally extracted candidates are sent to the external model for refinement.
    Refine,
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Extract => write!(f, "extract"),
            Self::Refine => write!(f, "refine"),
        }
    }
}

impl std::str::FromStr for ExtractionMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "heuristic" => Ok(Self::Local),
            "extract" | "extraction" | "llm" => Ok(Self::Extract),
            "refine" | "refinement" => Ok(Self::Refine),
            other => Err(crate::Error::Config(format!("unknown extraction mode: {other}"))),
        }
    }
}

/// Every tunable threshold of the extraction pipeline.
///
/// The similarity thresholds only separate "near" from "far" duplicates;
/// none of them carries meaning beyond that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Units shorter than this (chars) are discarded.
    pub min_unit_chars: usize,
    /// Units longer than this (chars) are discarded or chunked.
    pub max_unit_chars: usize,
    /// Target size for last-resort chunking of unpunctuated text.
    pub hard_chunk_chars: usize,
    pub max_title_chars: usize,
    /// Optionality at or above this is a `Decision`.
    pub decision_threshold: f64,
    /// Optionality at or above this (and below `decision_threshold`) is a `MaybeDecision`.
    pub maybe_threshold: f64,
    /// Jaccard similarity needed to join an existing cluster.
    pub cluster_join_similarity: f64,
    /// Lower bound of the band where clusters are suggested for manual merge.
    pub suggest_merge_floor: f64,
    /// Duplicate threshold when merging local candidates with each other.
    pub local_merge_similarity: f64,
    /// Duplicate threshold when merging local and model candidates.
    pub cross_merge_similarity: f64,
    #[serde(with = "duration_secs")]
    pub model_timeout: Duration,
    pub primary_page_limit: usize,
    pub secondary_page_limit: usize,
    pub snippets_per_page: usize,
    pub per_page_candidate_cap: usize,
    /// Minimum number of candidates a refinement response must keep.
    pub min_keep: usize,
    pub max_candidates: usize,
    pub default_mode: ExtractionMode,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_unit_chars: 30,
            max_unit_chars: 280,
            hard_chunk_chars: 300,
            max_title_chars: 96,
            decision_threshold: 0.55,
            maybe_threshold: 0.45,
            cluster_join_similarity: 0.72,
            suggest_merge_floor: 0.58,
            local_merge_similarity: 0.65,
            cross_merge_similarity: 0.55,
            model_timeout: Duration::from_secs(30),
            primary_page_limit: 24,
            secondary_page_limit: 60,
            snippets_per_page: 6,
            per_page_candidate_cap: 4,
            min_keep: 3,
            max_candidates: 40,
            default_mode: ExtractionMode::Local,
        }
    }
}

impl ExtractionConfig {
    /// Defaults overridden by `DNAV_MODEL_TIMEOUT_SECS` and `DNAV_MODE`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = std::env::var("DNAV_MODEL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
        {
            config.model_timeout = Duration::from_secs(secs);
        }

        if let Ok(mode) = std::env::var("DNAV_MODE") {
            match mode.parse() {
                Ok(m) => config.default_mode = m,
                Err(e) => tracing::warn!("Ignoring DNAV_MODE: {}", e),
            }
        }

        config
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.max_unit_chars, 280);
        assert!(c.suggest_merge_floor < c.cluster_join_similarity);
        assert!(c.cross_merge_similarity < c.local_merge_similarity);
        assert_eq!(c.model_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("refine".parse::<ExtractionMode>().unwrap(), ExtractionMode::Refine);
        assert_eq!("LLM".parse::<ExtractionMode>().unwrap(), ExtractionMode::Extract);
        assert!("bogus".parse::<ExtractionMode>().is_err());
    }

    #[test]
    fn test_config_json_roundtrip_keeps_timeout() {
        let c = ExtractionConfig {
            model_timeout: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_string(&c).unwrap();
        let back: ExtractionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model_timeout, Duration::from_millis(1500));
    }
}
