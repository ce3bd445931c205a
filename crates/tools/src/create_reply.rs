//! Reply to a mention (continuous mode, Basic tier and up).

use crate::context::{Published, ToolContext, ToolOutput};
use crate::create_post::attach_image;
use crate::params::{decode, id_string, lenient_bool, strip_handle};
use crate::publish::{Target, publish_with_retry};
use crate::text::cap_length;
use crate::Tool;
use async_trait::async_trait;
use murmur_core::error::ToolError;
use murmur_core::ledger::{ActionKind, MentionOutcome, NewAction};
use murmur_core::tool::{ParamSpec, ToolName};
use serde::Deserialize;
use tracing::{error, info, warn};

pub struct CreateReplyTool;

#[derive(Deserialize)]
struct Params {
    #[serde(default)]
    text: String,
    #[serde(default, deserialize_with = "id_string")]
    reply_to_tweet_id: String,
    #[serde(default)]
    reply_to_author: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    include_image: bool,
}

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("text", "string", "Reply text (max 280 characters)"),
    ParamSpec::required("reply_to_tweet_id", "string", "Tweet ID to reply to"),
    ParamSpec::required("reply_to_author", "string", "Username of the tweet author (without @)"),
    ParamSpec::image_flag("include_image", "Whether to generate and attach an image (true/false)"),
];

#[async_trait]
impl Tool for CreateReplyTool {
    fn name(&self) -> ToolName {
        ToolName::CreateReply
    }

    fn description(&self) -> &'static str {
        "Reply to a tweet (Basic+ tier only)"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    async fn execute(&self, params: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let params: Params = decode(params)?;
        let author = params
            .reply_to_author
            .as_deref()
            .map(strip_handle)
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        let target = params.reply_to_tweet_id;
        info!(%author, %target, include_image = params.include_image, tools_used = ?ctx.tools_used, "Creating reply");

        let admission = ctx.gate.can_use_reply_features().await;
        if !admission.allowed {
            return Ok(ToolOutput::failure(format!("Error: {}", admission.reason_or_empty())));
        }
        if params.text.trim().is_empty() {
            return Ok(ToolOutput::failure("Error: Reply text is empty"));
        }
        if target.is_empty() {
            return Ok(ToolOutput::failure("Error: reply_to_tweet_id is required"));
        }

        let limit = ctx.gate.daily_quota(ActionKind::Reply).await;
        let replies_today = ctx.ledger.count_today(ActionKind::Reply).await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: self.name().to_string(),
                reason: e.to_string(),
            }
        })?;
        if replies_today >= limit {
            warn!(replies_today, limit, "Daily reply limit reached");
            return Ok(ToolOutput::failure(format!(
                "Error: Daily reply limit reached ({limit}). Cannot reply."
            )));
        }

        let text = cap_length(&params.text);
        let media_id = if params.include_image { attach_image(ctx, &text).await } else { None };
        let has_media = media_id.is_some();

        let publish = publish_with_retry(
            ctx.social.as_ref(),
            &text,
            Target::Reply { to: &target },
            media_id.as_deref(),
            ctx.settings.publish_retry,
        );
        let reply_id = match publish.await {
            Ok(id) => id,
            Err(e) => {
                return Ok(ToolOutput::failure(format!("Error replying: {e}")));
            }
        };

        let action = NewAction::reply(&text, &reply_id, has_media, &target, &author);
        if let Err(e) = ctx.ledger.record_action(&action).await {
            error!(%reply_id, error = %e, "Failed to record published reply");
        }
        let outcome = MentionOutcome::replied(&target, &text, ctx.tools_used.clone()).with_author(&author, "");
        if let Err(e) = ctx.ledger.finalize_mention(&outcome).await {
            error!(%target, error = %e, "Failed to finalize mention");
        }

        let remaining = limit.saturating_sub(replies_today + 1);
        info!(%reply_id, %target, has_media, remaining, "Reply published");
        Ok(ToolOutput::ok(format!(
            "Replied successfully to {target}! Image: {}. Remaining replies today: {remaining}",
            if has_media { "yes" } else { "no" }
        ))
        .with_published(Published {
            kind: ActionKind::Reply,
            external_id: reply_id,
            has_media,
        }))
    }
}
