//! Publish a top-level post (continuous mode).

use crate::context::{Published, ToolContext, ToolOutput};
use crate::params::{decode, lenient_bool};
use crate::publish::{Target, publish_with_retry};
use crate::text::cap_length;
use crate::Tool;
use async_trait::async_trait;
use murmur_core::error::ToolError;
use murmur_core::ledger::{ActionKind, NewAction};
use murmur_core::tool::{ParamSpec, ToolName};
use serde::Deserialize;
use tracing::{error, info, warn};

pub struct CreatePostTool;

#[derive(Deserialize)]
struct Params {
    #[serde(default)]
    text: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    include_image: bool,
}

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("text", "string", "Tweet text (max 280 characters)"),
    ParamSpec::image_flag("include_image", "Generate and attach an image"),
];

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

/// Generate an image for `text` and upload it. Any failure degrades to no media.
pub(crate) async fn attach_image(ctx: &ToolContext, text: &str) -> Option<String> {
    if !ctx.studio.is_enabled() {
        return None;
    }
    let bytes = ctx.studio.generate(text).await?;
    match ctx.social.upload_media(&bytes).await {
        Ok(media_id) => {
            info!(%media_id, "Image generated and uploaded");
            Some(media_id)
        }
        Err(e) => {
            error!(error = %e, "Media upload failed, continuing without image");
            None
        }
    }
}

#[async_trait]
impl Tool for CreatePostTool {
    fn name(&self) -> ToolName {
        ToolName::CreatePost
    }

    fn description(&self) -> &'static str {
        "Create a new tweet (max 280 chars, optional image)"
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    async fn execute(&self, params: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let Params { text, include_image } = decode(params)?;
        if text.trim().is_empty() {
            return Ok(ToolOutput::failure("Error: Post text is empty"));
        }
        info!(include_image, tools_used = ?ctx.tools_used, "Creating post");

        let admission = ctx.gate.can_publish_post().await;
        if !admission.allowed {
            return Ok(ToolOutput::failure(format!("Error: {}", admission.reason_or_empty())));
        }

        let limit = ctx.gate.daily_quota(ActionKind::Post).await;
        let posts_today = ctx.ledger.count_today(ActionKind::Post).await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: self.name().to_string(),
                reason: e.to_string(),
            }
        })?;
        if posts_today >= limit {
            warn!(posts_today, limit, "Daily post limit reached");
            return Ok(ToolOutput::failure(format!(
                "Error: Daily post limit reached ({limit}). Cannot post."
            )));
        }

        let text = cap_length(&text);
        let media_id = if include_image { attach_image(ctx, &text).await } else { None };
        let has_media = media_id.is_some();

        let publish = publish_with_retry(
            ctx.social.as_ref(),
            &text,
            Target::Post,
            media_id.as_deref(),
            ctx.settings.publish_retry,
        );
        let post_id = match publish.await {
            Ok(id) => id,
            Err(e) => {
                return Ok(ToolOutput::failure(format!("Error posting: {e}")));
            }
        };

        // The post is live; a ledger failure must not report it as failed.
        if let Err(e) = ctx.ledger.record_action(&NewAction::post(&text, &post_id, has_media)).await {
            error!(%post_id, error = %e, "Failed to record published post");
        }

        let remaining = limit.saturating_sub(posts_today + 1);
        info!(%post_id, has_media, remaining, "Post published");
        Ok(ToolOutput::ok(format!(
            "Posted successfully! Tweet ID: {post_id}. Image: {}. Remaining posts today: {remaining}",
            yes_no(has_media)
        ))
        .with_published(Published {
            kind: ActionKind::Post,
            external_id: post_id,
            has_media,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ToolSettings;
    use crate::testing::{fixture, fixture_with};
    use murmur_core::ledger::Ledger;
    use murmur_providers::{ScriptedProvider, image_response};
    use murmur_social::RecordingClient;
    use serde_json::json;

    #[tokio::test]
    async fn publishes_and_records() {
        let f = fixture(ScriptedProvider::new(vec![]), RecordingClient::new()).await;
        let out = CreatePostTool
            .execute(json!({"text": "  rain again tonight  "}), &f.ctx)
            .await
            .unwrap();

        assert!(out.success, "{}", out.text);
        assert_eq!(
            out.text,
            "Posted successfully! Tweet ID: dry-1. Image: no. Remaining posts today: 14"
        );
        assert_eq!(f.social.published()[0].text, "rain again tonight");
        assert_eq!(f.ledger.count_today(ActionKind::Post).await.unwrap(), 1);
        let published = out.published.unwrap();
        assert_eq!(published.external_id, "dry-1");
        assert!(!published.has_media);
    }

    #[tokio::test]
    async fn long_text_is_truncated() {
        let f = fixture(ScriptedProvider::new(vec![]), RecordingClient::new()).await;
        CreatePostTool
            .execute(json!({"text": "x".repeat(300)}), &f.ctx)
            .await
            .unwrap();
        let text = &f.social.published()[0].text;
        assert_eq!(text.chars().count(), 280);
        assert!(text.ends_with("..."));
    }

    #[tokio::test]
    async fn refuses_at_daily_limit() {
        let f = fixture(ScriptedProvider::new(vec![]), RecordingClient::new()).await;
        for i in 0..15 {
            f.ledger
                .record_action(&NewAction::post(format!("p{i}"), format!("{i}"), false))
                .await
                .unwrap();
        }
        let out = CreatePostTool.execute(json!({"text": "one more"}), &f.ctx).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.text, "Error: Daily post limit reached (15). Cannot post.");
        assert!(f.social.published().is_empty());
    }

    #[tokio::test]
    async fn platform_error_is_an_observation() {
        let f = fixture(ScriptedProvider::new(vec![]), RecordingClient::new().always_failing()).await;
        let out = CreatePostTool.execute(json!({"text": "hello"}), &f.ctx).await.unwrap();
        assert!(!out.success);
        assert!(out.text.starts_with("Error posting: "));
        assert_eq!(f.ledger.count_today(ActionKind::Post).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let f = fixture(ScriptedProvider::new(vec![]), RecordingClient::new().failing_publishes(1)).await;
        let out = CreatePostTool.execute(json!({"text": "hello"}), &f.ctx).await.unwrap();
        assert!(out.success, "{}", out.text);
        assert_eq!(f.social.publish_attempts(), 2);
        assert_eq!(f.social.published()[0].text, "hello");
        assert_eq!(f.ledger.count_today(ActionKind::Post).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn retries_stop_at_the_bound() {
        let f = fixture(ScriptedProvider::new(vec![]), RecordingClient::new().always_failing()).await;
        CreatePostTool.execute(json!({"text": "hello"}), &f.ctx).await.unwrap();
        assert_eq!(f.social.publish_attempts(), 3);
    }

    #[tokio::test]
    async fn attaches_generated_image() {
        let mut settings = ToolSettings::default();
        settings.features.enable_image_generation = true;
        let provider = ScriptedProvider::new(vec![image_response("data:image/png;base64,aGVsbG8=")]);
        let f = fixture_with(provider, RecordingClient::new(), settings).await;

        let out = CreatePostTool
            .execute(json!({"text": "moonlit", "include_image": "true"}), &f.ctx)
            .await
            .unwrap();
        assert!(out.text.contains("Image: yes"));
        assert_eq!(f.social.upload_count(), 1);
        assert!(f.social.published()[0].media_id.is_some());
    }

    #[tokio::test]
    async fn image_request_ignored_when_disabled() {
        let f = fixture(ScriptedProvider::new(vec![]), RecordingClient::new()).await;
        let out = CreatePostTool
            .execute(json!({"text": "moonlit", "include_image": true}), &f.ctx)
            .await
            .unwrap();
        assert!(out.text.contains("Image: no"));
        assert_eq!(f.social.upload_count(), 0);
        assert_eq!(f.provider.call_count(), 0);
    }
}
