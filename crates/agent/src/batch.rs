//! Batch-plan mode: one plan, executed with reflections, then exactly one post.

use crate::finalize::{FinalText, finalize_text, pick_fallback};
use crate::planner::{execute_plan, request_plan};
use crate::prompts::{FINAL_POST_REQUEST, PostText, autopost_request, autopost_system, post_text_format};
use murmur_tools::publish::{RetryPolicy, Target, publish_with_retry, upload};
use crate::runtime::{Runtime, conversation};
use crate::summary::BatchSummary;
use murmur_core::ledger::{ActionKind, NewAction};
use murmur_core::message::Message;
use murmur_core::tool::Mode;
use murmur_tools::Published;
use tracing::{error, info, warn};

/// Runs batch post cycles.
pub struct BatchPoster {
    rt: Runtime,
}

impl BatchPoster {
    pub fn new(rt: Runtime) -> Self {
        Self { rt }
    }

    async fn blocked(&self, reason: &str) -> BatchSummary {
        warn!(%reason, "Posting blocked");
        let gate = self.rt.gate();
        BatchSummary {
            success: false,
            error: Some(format!("posting_blocked: {reason}")),
            tier: Some(gate.status().await.tier),
            usage_percent: gate.usage_percent().await,
            ..BatchSummary::default()
        }
    }

    /// One full cycle. `Err` only for ledger faults before anything was published.
    pub async fn run(&self) -> Result<BatchSummary, murmur_core::Error> {
        let rt = &self.rt;
        info!("Batch cycle starting");

        let admission = rt.gate().can_publish_post().await;
        if !admission.allowed {
            return Ok(self.blocked(admission.reason_or_empty()).await);
        }
        let (posts_today, limit) = rt.quota(ActionKind::Post).await?;
        if posts_today >= limit {
            return Ok(self.blocked("daily_post_limit_reached").await);
        }

        let previous = rt.ctx.ledger.recent_actions_context(rt.settings.recent_actions_limit).await?;
        let tools_desc = rt.registry.describe(Mode::Batch, rt.tool_tier().await);
        let mut conv = conversation(
            autopost_system(&rt.settings.persona, &tools_desc),
            autopost_request(&previous),
        );

        let plan = request_plan(rt, &mut conv).await;
        let execution = execute_plan(rt, &mut conv, &plan).await;

        conv.push(Message::user(FINAL_POST_REQUEST));
        let final_text = match rt.ask::<PostText>(&conv, post_text_format()).await {
            Ok(reply) => finalize_text(&reply.post_text),
            Err(e) => {
                warn!(error = %e, "Post text request failed, using fallback");
                FinalText::fallback()
            }
        };

        let media_id = upload(rt.ctx.social.as_ref(), execution.image.as_deref()).await;
        let Some((post_id, final_text)) = self.publish(final_text, media_id.as_deref()).await else {
            return Ok(BatchSummary {
                success: false,
                error: Some("publish_failed".into()),
                tools_used: execution.tools_used,
                ..BatchSummary::default()
            });
        };
        let has_media = media_id.is_some();

        if let Err(e) = rt
            .ctx
            .ledger
            .record_action(&NewAction::post(&final_text.text, &post_id, has_media))
            .await
        {
            error!(%post_id, error = %e, "Failed to record published post");
        }
        rt.announce(&Published {
            kind: ActionKind::Post,
            external_id: post_id.clone(),
            has_media,
        });

        info!(%post_id, has_media, used_fallback = final_text.used_fallback, "Batch cycle posted");
        Ok(BatchSummary {
            success: true,
            tweet_id: Some(post_id),
            text: Some(final_text.text),
            tools_used: execution.tools_used,
            has_image: has_media,
            used_fallback: final_text.used_fallback,
            ..BatchSummary::default()
        })
    }

    /// Publish with bounded retries; once they are exhausted, one more try
    /// with a fallback message.
    async fn publish(&self, text: FinalText, media: Option<&str>) -> Option<(String, FinalText)> {
        let rt = &self.rt;
        let social = rt.ctx.social.as_ref();
        let policy = rt.ctx.settings.publish_retry;

        match publish_with_retry(social, &text.text, Target::Post, media, policy).await {
            Ok(id) => return Some((id, text)),
            Err(e) => warn!(error = %e, "Retries exhausted, trying a fallback message"),
        }

        let fallback = FinalText {
            text: pick_fallback(Some(&text.text)).to_string(),
            used_fallback: true,
        };
        match publish_with_retry(social, &fallback.text, Target::Post, media, RetryPolicy::new(1, policy.delay)).await {
            Ok(id) => Some((id, fallback)),
            Err(e) => {
                error!(error = %e, "Fallback publish failed");
                None
            }
        }
    }
}
