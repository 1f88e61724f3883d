//! External model augmentation (OpenAI/Anthropic/Groq).
//!
//! Sends page snippets or locally extracted candidates to an external
//! language model under a fixed JSON contract. Every call races a timeout,
//! malformed output gets exactly one repair call, and any failure is a typed
//! [`AugmentError`] the caller turns into a warning.

pub mod augmentor;
pub mod config;
pub mod error;
pub mod json;
pub mod normalize;
pub mod prompts;
pub mod providers;
pub mod types;

pub use augmentor::Augmentor;
pub use config::LLMConfig;
pub use error::AugmentError;
pub use providers::{HttpLlmClient, LlmClient};
pub use types::*;
