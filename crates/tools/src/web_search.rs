//! Web search, answered by the model with its web plugin enabled.

use crate::context::{ToolContext, ToolOutput};
use crate::image::truncate;
use crate::params::decode;
use crate::Tool;
use async_trait::async_trait;
use murmur_core::error::{ProviderError, ToolError};
use murmur_core::message::Message;
use murmur_core::provider::ProviderRequest;
use murmur_core::tool::{ParamSpec, ToolName};
use serde::Deserialize;
use tracing::{error, info};

pub struct WebSearchTool;

#[derive(Deserialize)]
struct Params {
    query: String,
}

const PARAMS: &[ParamSpec] = &[ParamSpec::required("query", "string", "The search query")];

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> ToolName {
        ToolName::WebSearch
    }

    fn description(&self) -> &'static str {
        "Search the web for current information, news, facts, or any data that might not be in training data"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    async fn execute(&self, params: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let Params { query } = decode(params)?;
        info!(query = %truncate(&query, 80), "Starting web search");

        let request = ProviderRequest::new(&ctx.settings.model, vec![Message::user(&query)]).with_web_search();
        match ctx.provider.complete(request).await {
            Ok(response) => {
                info!(sources = response.citations, "Web search completed");
                Ok(ToolOutput::ok(format!(
                    "Search results:\n{}\n\nSources: {}",
                    response.message.content, response.citations
                )))
            }
            Err(ProviderError::Timeout(_)) => {
                error!("Web search timed out");
                Ok(ToolOutput::failure("Error: Search timed out"))
            }
            Err(ProviderError::ApiError { status_code, .. }) => {
                error!(status_code, "Web search API error");
                Ok(ToolOutput::failure(format!("Error: Search failed (HTTP {status_code})")))
            }
            Err(e) => {
                error!(error = %e, "Web search failed");
                Ok(ToolOutput::failure(format!("Error: Search failed - {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture;
    use murmur_providers::ScriptedProvider;
    use murmur_core::provider::ProviderResponse;
    use murmur_social::RecordingClient;
    use serde_json::json;

    #[tokio::test]
    async fn formats_results_with_source_count() {
        let response = ProviderResponse {
            citations: 3,
            ..murmur_providers::text_response("Storms expected tonight.")
        };
        let f = fixture(ScriptedProvider::new(vec![response]), RecordingClient::new()).await;

        let out = WebSearchTool.execute(json!({"query": "weather"}), &f.ctx).await.unwrap();
        assert!(out.success);
        assert_eq!(out.text, "Search results:\nStorms expected tonight.\n\nSources: 3");
    }

    #[tokio::test]
    async fn requests_the_web_plugin() {
        let provider = ScriptedProvider::from_texts(["ok"]);
        let f = fixture(provider, RecordingClient::new()).await;
        WebSearchTool.execute(json!({"query": "@bot lore"}), &f.ctx).await.unwrap();
        let request = &f.provider.requests()[0];
        assert!(request.web_search);
        assert_eq!(request.messages[0].content, "@bot lore");
    }

    #[tokio::test]
    async fn http_failure_is_an_observation() {
        let provider = ScriptedProvider::new(vec![]).then_fail(ProviderError::ApiError {
            status_code: 502,
            message: "bad gateway".into(),
        });
        let f = fixture(provider, RecordingClient::new()).await;
        let out = WebSearchTool.execute(json!({"query": "q"}), &f.ctx).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.text, "Error: Search failed (HTTP 502)");
    }

    #[tokio::test]
    async fn timeout_is_an_observation() {
        let provider = ScriptedProvider::new(vec![]).then_fail(ProviderError::Timeout("60s".into()));
        let f = fixture(provider, RecordingClient::new()).await;
        let out = WebSearchTool.execute(json!({"query": "q"}), &f.ctx).await.unwrap();
        assert_eq!(out.text, "Error: Search timed out");
    }
}
