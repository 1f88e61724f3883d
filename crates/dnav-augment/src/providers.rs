//! External LLM provider calls.
//!
//! OpenAI and Groq share the chat-completions format; Anthropic uses the
//! Messages API with the system prompt as a top-level field. Calls are
//! single-shot (no streaming): the augmentor needs the whole JSON document.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error};

use crate::error::AugmentError;
use crate::types::{ChatMessage, LLMProvider, ProviderSelection};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

/// Low temperature: the model must copy quotes, not paraphrase them.
const TEMPERATURE: f64 = 0.1;
const MAX_TOKENS: usize = 4096;

/// A text-in, text-out model endpoint.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one conversation and return the assistant text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AugmentError>;

    /// `provider/model`, for logs.
    fn describe(&self) -> String;
}

/// [`LlmClient`] over the providers' HTTP APIs.
pub struct HttpLlmClient {
    client: Client,
    selection: ProviderSelection,
}

impl HttpLlmClient {
    pub fn new(selection: ProviderSelection) -> Self {
        Self {
            client: Client::new(),
            selection,
        }
    }

    async fn complete_openai_compat(
        &self,
        url: &str,
        messages: &[ChatMessage],
    ) -> Result<String, AugmentError> {
        let msgs: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();
        let body = json!({
            "model": self.selection.model,
            "messages": msgs,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
            "response_format": {"type": "json_object"},
        });

        debug!("Requesting {} with model {}", url, self.selection.model);

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.selection.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let parsed = read_json(response).await?;
        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AugmentError::Provider("response has no message content".into()))
    }

    async fn complete_anthropic(&self, messages: &[ChatMessage]) -> Result<String, AugmentError> {
        // Separate system message from conversation
        let system_msg: Option<&str> = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str());
        let conv_msgs: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();

        let mut body = json!({
            "model": self.selection.model,
            "messages": conv_msgs,
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });
        if let Some(sys) = system_msg {
            body["system"] = json!(sys);
        }

        debug!("Requesting Anthropic with model {}", self.selection.model);

        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.selection.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let parsed = read_json(response).await?;
        let text: String = parsed["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"] == "text")
                    .filter_map(|b| b["text"].as_str())
                    .collect()
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(AugmentError::Provider("response has no text content".into()));
        }
        Ok(text)
    }
}

async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, AugmentError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        error!("Model API error {}: {}", status, body);
        return Err(AugmentError::Provider(format!("API error {status}: {body}")));
    }
    serde_json::from_str(&body)
        .map_err(|e| AugmentError::Provider(format!("unreadable API response: {e}")))
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AugmentError> {
        match self.selection.provider {
            LLMProvider::OpenAI => self.complete_openai_compat(OPENAI_URL, messages).await,
            LLMProvider::Groq => self.complete_openai_compat(GROQ_URL, messages).await,
            LLMProvider::Anthropic => self.complete_anthropic(messages).await,
        }
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.selection.provider, self.selection.model)
    }
}
