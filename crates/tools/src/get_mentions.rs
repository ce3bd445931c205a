//! Fetch mentions that still need a decision.

use crate::context::{ToolContext, ToolOutput};
use crate::Tool;
use async_trait::async_trait;
use murmur_core::error::ToolError;
use murmur_core::social::InboundMention;
use murmur_core::tool::{ParamSpec, ToolName};
use tracing::{error, info, warn};

pub struct GetMentionsTool;

fn render(mention: &InboundMention) -> String {
    format!(
        "- tweet_id: {}\n  from: @{}\n  text: {}",
        mention.id, mention.author, mention.text
    )
}

#[async_trait]
impl Tool for GetMentionsTool {
    fn name(&self) -> ToolName {
        ToolName::GetMentions
    }

    fn description(&self) -> &'static str {
        "Get unread mentions/replies to you (Basic+ tier only)"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    async fn execute(&self, _params: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let admission = ctx.gate.can_use_reply_features().await;
        if !admission.allowed {
            return Ok(ToolOutput::failure(format!("Error: {}", admission.reason_or_empty())));
        }

        let fetched = match ctx.social.get_mentions(None).await {
            Ok(m) => m,
            Err(e) => {
                error!(error = %e, "Fetching mentions failed");
                return Ok(ToolOutput::failure(format!("Error fetching mentions: {e}")));
            }
        };
        if fetched.is_empty() {
            return Ok(ToolOutput::ok("No new mentions found."));
        }

        let features = &ctx.settings.features;
        let allowed: Vec<_> = fetched.into_iter().filter(|m| features.is_whitelisted(&m.author)).collect();
        if allowed.is_empty() {
            return Ok(ToolOutput::ok("No new mentions from whitelisted users."));
        }

        // Pending rows are listed again: they were seen but never decided.
        let mut unprocessed = Vec::new();
        for mention in allowed {
            match ctx.ledger.mention_exists(&mention.id, false).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    warn!(id = %mention.id, error = %e, "Mention lookup failed, listing it anyway");
                }
            }
            if let Err(e) = ctx
                .ledger
                .upsert_pending_mention(&mention.id, &mention.author, &mention.text)
                .await
            {
                warn!(id = %mention.id, error = %e, "Failed to record pending mention");
            }
            unprocessed.push(mention);
        }

        if unprocessed.is_empty() {
            return Ok(ToolOutput::ok("No new unprocessed mentions."));
        }
        info!(count = unprocessed.len(), "Unprocessed mentions found");
        let listed: Vec<String> = unprocessed.iter().map(render).collect();
        Ok(ToolOutput::ok(format!(
            "Found {} unprocessed mentions:\n\n{}",
            unprocessed.len(),
            listed.join("\n\n")
        )))
    }
}
