//! Past exchanges with one author, from the ledger.

use crate::context::{ToolContext, ToolOutput};
use crate::params::{decode, handle};
use crate::Tool;
use async_trait::async_trait;
use murmur_core::error::ToolError;
use murmur_core::ledger::NO_CONVERSATIONS;
use murmur_core::tool::{ParamSpec, ToolName};
use serde::Deserialize;
use tracing::info;

pub struct GetConversationHistoryTool;

#[derive(Deserialize)]
struct Params {
    #[serde(deserialize_with = "handle")]
    username: String,
}

const PARAMS: &[ParamSpec] = &[ParamSpec::required("username", "string", "Twitter handle without @")];

#[async_trait]
impl Tool for GetConversationHistoryTool {
    fn name(&self) -> ToolName {
        ToolName::GetConversationHistory
    }

    fn description(&self) -> &'static str {
        "Get your past conversation history with a user from database"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    async fn execute(&self, params: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let Params { username } = decode(params)?;
        let username = username.to_lowercase();
        info!(%username, "Loading conversation history");

        let history = ctx
            .ledger
            .conversation_history(&username, ctx.settings.history_limit)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().to_string(),
                reason: e.to_string(),
            })?;

        if history.trim().is_empty() || history == NO_CONVERSATIONS {
            return Ok(ToolOutput::ok(format!("No previous conversations with @{username}")));
        }
        Ok(ToolOutput::ok(format!("Conversation history with @{username}:\n{history}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture;
    use murmur_core::ledger::{Ledger, MentionOutcome};
    use murmur_providers::ScriptedProvider;
    use murmur_social::RecordingClient;
    use serde_json::json;

    #[tokio::test]
    async fn empty_history() {
        let f = fixture(ScriptedProvider::new(vec![]), RecordingClient::new()).await;
        let out = GetConversationHistoryTool
            .execute(json!({"username": "@Bob"}), &f.ctx)
            .await
            .unwrap();
        assert_eq!(out.text, "No previous conversations with @bob");
    }

    #[tokio::test]
    async fn lists_replied_exchanges() {
        let f = fixture(ScriptedProvider::new(vec![]), RecordingClient::new()).await;
        f.ledger.upsert_pending_mention("7", "bob", "are you a cat?").await.unwrap();
        f.ledger
            .finalize_mention(&MentionOutcome::replied("7", "mostly, yes", vec![]))
            .await
            .unwrap();

        let out = GetConversationHistoryTool
            .execute(json!({"username": "BOB"}), &f.ctx)
            .await
            .unwrap();
        assert!(out.text.starts_with("Conversation history with @bob:\n"));
        assert!(out.text.contains("are you a cat?"));
        assert!(out.text.contains("mostly, yes"));
    }
}
