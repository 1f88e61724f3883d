//! Augmentation failures. None of them is fatal to an extraction run.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AugmentError {
    #[error("No external model configured; using local extraction")]
    NotConfigured,

    #[error("Model timeout after {}s; using local candidates", .0.as_secs())]
    Timeout(Duration),

    #[error("Model provider error: {0}")]
    Provider(String),

    #[error("Model returned malformed JSON: {0}")]
    Malformed(String),

    #[error("Model response violates schema: {0}")]
    Schema(String),

    #[error("Refinement kept {kept} candidates, need at least {required}; using local candidates")]
    Insufficient { kept: usize, required: usize },
}

impl From<reqwest::Error> for AugmentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Provider(format!("request timed out: {e}"))
        } else {
            Self::Provider(format!("request failed: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_mentions_timeout() {
        let msg = AugmentError::Timeout(Duration::from_secs(30)).to_string();
        assert!(msg.contains("timeout"));
        assert!(msg.contains("30s"));
    }

    #[test]
    fn test_insufficient_message() {
        let msg = AugmentError::Insufficient { kept: 1, required: 3 }.to_string();
        assert!(msg.contains("kept 1"));
        assert!(msg.contains("at least 3"));
    }
}
