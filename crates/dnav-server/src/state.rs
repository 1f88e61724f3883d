//! Shared application state.

use dnav_augment::{LLMConfig, LLMStatus};
use dnav_core::ExtractionConfig;
use dnav_runtime::Extractor;

use crate::config::ServerConfig;

/// Shared application state accessible from all route handlers. Nothing in
/// it changes after startup; each request runs independently.
pub struct AppState {
    pub llm_status: LLMStatus,
    pub extractor: Extractor,
}

impl AppState {
    pub fn new(config: &ServerConfig, extraction: ExtractionConfig) -> Self {
        let llm_config = LLMConfig::load(&config.llm_config_file());
        let extractor = Extractor::from_llm_config(extraction, &llm_config);
        Self::with_extractor(llm_config.status(), extractor)
    }

    /// State around a prebuilt extractor.
    pub fn with_extractor(llm_status: LLMStatus, extractor: Extractor) -> Self {
        Self {
            llm_status,
            extractor,
        }
    }
}
