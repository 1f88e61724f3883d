//! Provider identifiers and the model-facing wire types.

use serde::{Deserialize, Serialize};

use dnav_core::DecisionCandidate;

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Anthropic,
    Groq,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Groq => write!(f, "groq"),
        }
    }
}

/// The provider, model and key a client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub provider: LLMProvider,
    pub model: String,
    pub api_key: String,
}

/// Message in a model conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Which commitments an extraction call asks for. A run issues both
/// passes concurrently over the same snippets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentPass {
    Hard,
    Soft,
}

impl std::fmt::Display for CommitmentPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hard => write!(f, "hard"),
            Self::Soft => write!(f, "soft"),
        }
    }
}

/// One kept entry of a refinement response.
#[derive(Debug, Clone, Deserialize)]
pub struct KeptCandidate {
    pub id: String,
    #[serde(default, rename = "rewrittenDecision")]
    pub rewritten_decision: Option<String>,
    #[serde(default, rename = "reasonKeep")]
    pub reason_keep: Option<String>,
    #[serde(default, rename = "mergedFromIds")]
    pub merged_from_ids: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Top-level refinement response.
#[derive(Debug, Clone, Deserialize)]
pub struct RefineResponse {
    pub kept_candidates: Vec<KeptCandidate>,
    #[serde(default)]
    pub drop_ids: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of applying a refinement response to the local candidates.
#[derive(Debug, Clone, Default)]
pub struct Refinement {
    pub candidates: Vec<DecisionCandidate>,
    pub dropped: usize,
    /// Ids in the response that matched no input candidate.
    pub unknown_ids: usize,
    pub notes: Option<String>,
}

/// Candidates from one extraction call plus the items that were dropped.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub candidates: Vec<DecisionCandidate>,
    pub dropped: usize,
}

/// Augmentation status (keys never exposed).
#[derive(Debug, Clone, Serialize)]
pub struct LLMStatus {
    #[serde(rename = "preferredProvider")]
    pub preferred_provider: String,
    #[serde(rename = "openaiConfigured")]
    pub openai_configured: bool,
    #[serde(rename = "anthropicConfigured")]
    pub anthropic_configured: bool,
    #[serde(rename = "groqConfigured")]
    pub groq_configured: bool,
    #[serde(rename = "activeProvider")]
    pub active_provider: Option<String>,
    #[serde(rename = "activeModel")]
    pub active_model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refine_response_defaults() {
        let r: RefineResponse = serde_json::from_str(
            r#"{"kept_candidates":[{"id":"a","rewrittenDecision":"Build the plant"}]}"#,
        )
        .unwrap();
        assert_eq!(r.kept_candidates.len(), 1);
        assert!(r.kept_candidates[0].merged_from_ids.is_empty());
        assert!(r.drop_ids.is_empty());
        assert!(r.notes.is_none());
    }

    #[test]
    fn test_provider_display() {
        assert_eq!(LLMProvider::Anthropic.to_string(), "anthropic");
        assert_eq!(CommitmentPass::Soft.to_string(), "soft");
    }
}
