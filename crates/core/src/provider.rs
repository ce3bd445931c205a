//! Provider trait: the abstraction over the language model.
//!
//! A Provider takes a transcript plus an optional output-shape constraint and
//! returns the model's reply. Callers that ask for a shape still have to
//! tolerate free text coming back; decoding lives in `murmur-providers`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Message;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "anthropic/claude-sonnet-4.5")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Structured output constraint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    /// Let the provider ground the answer with a web search
    #[serde(default)]
    pub web_search: bool,

    /// Ask for image output alongside text
    #[serde(default)]
    pub image_output: bool,
}

fn default_temperature() -> f32 {
    0.8
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: default_temperature(),
            max_tokens: None,
            response_format: None,
            web_search: false,
            image_output: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn with_web_search(mut self) -> Self {
        self.web_search = true;
        self
    }

    pub fn with_image_output(mut self) -> Self {
        self.image_output = true;
        self
    }
}

/// A named JSON schema the model's reply must conform to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    pub name: String,
    pub schema: serde_json::Value,
}

impl ResponseFormat {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Generated images as `data:` URIs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    /// Number of web citations backing the answer
    #[serde(default)]
    pub citations: usize,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The agent loop calls `complete()` without knowing which backend answers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_request_defaults() {
        let req = ProviderRequest::new("anthropic/claude-sonnet-4.5", vec![]);
        assert!((req.temperature - 0.8).abs() < f32::EPSILON);
        assert!(req.response_format.is_none());
        assert!(!req.web_search);
    }

    #[test]
    fn builder_sets_format_and_search() {
        let req = ProviderRequest::new("m", vec![Message::user("hi")])
            .with_max_tokens(1024)
            .with_format(ResponseFormat::new("post_text", serde_json::json!({"type": "object"})))
            .with_web_search();
        assert_eq!(req.max_tokens, Some(1024));
        assert_eq!(req.response_format.as_ref().map(|f| f.name.as_str()), Some("post_text"));
        assert!(req.web_search);
    }
}
