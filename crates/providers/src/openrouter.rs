//! OpenRouter chat-completions provider.
//!
//! Supports:
//! - Structured output via `response_format: json_schema`
//! - Web-grounded answers via the `web` plugin
//! - Image output (`modalities: ["image", "text"]`) and image input
//!   (multi-part user content)

use async_trait::async_trait;
use murmur_config::OpenRouterConfig;
use murmur_core::error::ProviderError;
use murmur_core::message::{Message, Role};
use murmur_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A provider backed by the OpenRouter API.
pub struct OpenRouterProvider {
    base_url: String,
    api_key: String,
    referer: String,
    title: String,
    timeout: Duration,
    image_timeout: Duration,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    /// Create a provider with default endpoints.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_config(&OpenRouterConfig {
            api_key: Some(api_key.into()),
            ..OpenRouterConfig::default()
        })
    }

    /// Build from the `[openrouter]` config section.
    pub fn from_config(config: &OpenRouterConfig) -> Self {
        Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
            referer: config.referer.clone(),
            title: config.title.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            image_timeout: Duration::from_secs(config.image_timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    /// Convert our Message types to OpenRouter API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                };
                let content = if m.images.is_empty() {
                    ApiContent::Text(m.content.clone())
                } else {
                    let mut parts = vec![ApiPart::Text { text: m.content.clone() }];
                    parts.extend(m.images.iter().map(|url| ApiPart::ImageUrl {
                        image_url: ApiImageUrl { url: url.clone() },
                    }));
                    ApiContent::Parts(parts)
                };
                ApiMessage {
                    role: role.into(),
                    content,
                }
            })
            .collect()
    }

    /// Assemble the JSON request body.
    fn build_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if let Some(format) = &request.response_format {
            body["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": format.name,
                    "strict": true,
                    "schema": format.schema,
                }
            });
        }

        if request.web_search {
            body["plugins"] = serde_json::json!([{ "id": "web", "max_results": 5 }]);
        }

        if request.image_output {
            body["modalities"] = serde_json::json!(["image", "text"]);
        }

        body
    }

    /// Turn a parsed API response into our domain response.
    fn into_response(api: ApiResponse) -> Result<ProviderResponse, ProviderError> {
        let choice = api
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let images = choice
            .message
            .images
            .unwrap_or_default()
            .into_iter()
            .map(|i| i.image_url.url)
            .collect();

        let citations = choice
            .message
            .annotations
            .unwrap_or_default()
            .iter()
            .filter(|a| a.r#type == "url_citation")
            .count();

        let usage = api.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message: Message::assistant(choice.message.content.unwrap_or_default()),
            usage,
            model: api.model,
            images,
            citations,
        })
    }
}

#[async_trait]
impl murmur_core::Provider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured("OPENROUTER_API_KEY is not set".into()));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(&request);
        let timeout = if request.image_output { self.image_timeout } else { self.timeout };

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            structured = request.response_format.is_some(),
            web = request.web_search,
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        Self::into_response(api_response)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- OpenRouter API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: ApiContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Parts(Vec<ApiPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiPart {
    Text { text: String },
    ImageUrl { image_url: ApiImageUrl },
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
    images: Option<Vec<ApiImage>>,
    annotations: Option<Vec<ApiAnnotation>>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    image_url: ApiImageUrl,
}

#[derive(Debug, Deserialize)]
struct ApiAnnotation {
    #[serde(default)]
    r#type: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
