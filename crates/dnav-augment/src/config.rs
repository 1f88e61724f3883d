//! LLM configuration loading and provider selection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{LLMProvider, LLMStatus, ProviderSelection};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// File name of the config inside the data directory.
pub const CONFIG_FILE: &str = "llm-config.json";

/// Stored LLM configuration (read from llm-config.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: "auto".into(),
            openai_api_key: None,
            anthropic_api_key: None,
            groq_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.into(),
            groq_model: DEFAULT_GROQ_MODEL.into(),
            config_path: PathBuf::new(),
        }
    }
}

impl LLMConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config = Self::read_file(config_path);
        config.config_path = config_path.to_path_buf();
        config.fill_from_env(|name| std::env::var(name).ok());

        match config.resolve_provider() {
            Some(sel) => info!("External model: {} ({})", sel.provider, sel.model),
            None => info!("No external model key configured; extraction stays local"),
        }
        config
    }

    fn read_file(config_path: &Path) -> Self {
        let text = match std::fs::read_to_string(config_path) {
            Ok(t) => t,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&text) {
            Ok(c) => c,
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", config_path.display(), e);
                Self::default()
            }
        }
    }

    /// Env vars as fallback for API keys; blank values count as missing.
    fn fill_from_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let pick = |current: &mut Option<String>, name: &str| {
            if current.as_deref().map_or(true, |k| k.trim().is_empty()) {
                *current = var(name).filter(|k| !k.trim().is_empty());
            }
        };
        pick(&mut self.openai_api_key, "OPENAI_API_KEY");
        pick(&mut self.anthropic_api_key, "ANTHROPIC_API_KEY");
        pick(&mut self.groq_api_key, "GROQ_API_KEY");
    }

    /// Resolve which provider and model to use.
    pub fn resolve_provider(&self) -> Option<ProviderSelection> {
        let select = |provider, model: &String, key: &Option<String>| {
            key.as_ref().map(|k| ProviderSelection {
                provider,
                model: model.clone(),
                api_key: k.clone(),
            })
        };

        // Explicit preference
        if self.preferred_provider != "auto" {
            return match self.preferred_provider.as_str() {
                "openai" => select(LLMProvider::OpenAI, &self.openai_model, &self.openai_api_key),
                "anthropic" => select(
                    LLMProvider::Anthropic,
                    &self.anthropic_model,
                    &self.anthropic_api_key,
                ),
                "groq" => select(LLMProvider::Groq, &self.groq_model, &self.groq_api_key),
                _ => None,
            };
        }

        // Auto mode: Anthropic > Groq > OpenAI
        select(LLMProvider::Anthropic, &self.anthropic_model, &self.anthropic_api_key)
            .or_else(|| select(LLMProvider::Groq, &self.groq_model, &self.groq_api_key))
            .or_else(|| select(LLMProvider::OpenAI, &self.openai_model, &self.openai_api_key))
    }

    /// Public status (no API keys exposed).
    pub fn status(&self) -> LLMStatus {
        let resolved = self.resolve_provider();
        LLMStatus {
            preferred_provider: self.preferred_provider.clone(),
            openai_configured: self.openai_api_key.is_some(),
            anthropic_configured: self.anthropic_api_key.is_some(),
            groq_configured: self.groq_api_key.is_some(),
            active_provider: resolved.as_ref().map(|s| s.provider.to_string()),
            active_model: resolved.map(|s| s.model),
        }
    }
}
