//! Mention processing: select which inbound mentions deserve an answer,
//! then plan, write and publish one reply per selection.

use crate::finalize::finalize_text;
use crate::planner::{execute_plan, request_plan};
use crate::prompts::{
    FINAL_REPLY_REQUEST, MentionSelection, ReplyText, SelectedMention, mention_selection_format, reply_request,
    reply_system, reply_text_format, selector_request, selector_system,
};
use murmur_tools::publish::{Target, publish_with_retry, upload};
use crate::runtime::{Runtime, conversation};
use crate::summary::{CheckMentionsSummary, MentionPreview, MentionReply, MentionsSummary};
use murmur_core::ledger::{ActionKind, MentionOutcome, NewAction};
use murmur_core::message::Message;
use murmur_core::social::InboundMention;
use murmur_core::tool::Mode;
use murmur_tools::Published;
use std::collections::HashSet;
use tracing::{error, info, warn};

/// State key holding the newest mention id seen by [`MentionResponder::check_mentions`].
pub const LAST_MENTION_KEY: &str = "last_mention_id";

const SELECTION_HISTORY: usize = 10;
const PREVIEW_CHARS: usize = 100;

pub struct MentionResponder {
    rt: Runtime,
}

impl MentionResponder {
    pub fn new(rt: Runtime) -> Self {
        Self { rt }
    }

    /// Fetch every mention the platform returns and answer the ones worth it.
    pub async fn run(&self) -> Result<MentionsSummary, murmur_core::Error> {
        let admission = self.rt.gate().can_use_reply_features().await;
        if !admission.allowed {
            warn!(reason = admission.reason_or_empty(), "Mention processing blocked");
            return Ok(MentionsSummary {
                success: false,
                error: Some(format!("mentions_blocked: {}", admission.reason_or_empty())),
                tier: Some(self.rt.gate().status().await.tier),
                ..MentionsSummary::default()
            });
        }

        let mentions = match self.rt.ctx.social.get_mentions(None).await {
            Ok(mentions) => mentions,
            Err(e) => {
                error!(error = %e, "Failed to fetch mentions");
                return Ok(MentionsSummary {
                    success: false,
                    error: Some(format!("fetch_failed: {e}")),
                    ..MentionsSummary::default()
                });
            }
        };
        self.process(mentions).await
    }

    /// Fetch mentions newer than the stored watermark. A dry run only lists
    /// them; otherwise they are processed and the watermark advances.
    pub async fn check_mentions(&self, dry_run: bool) -> Result<CheckMentionsSummary, murmur_core::Error> {
        let rt = &self.rt;
        let admission = rt.gate().can_use_reply_features().await;
        if !admission.allowed {
            return Ok(CheckMentionsSummary {
                success: false,
                dry_run,
                error: Some(format!("mentions_blocked: {}", admission.reason_or_empty())),
                ..CheckMentionsSummary::default()
            });
        }

        let since = rt.ctx.ledger.get_state(LAST_MENTION_KEY).await?;
        let mentions = match rt.ctx.social.get_mentions(since.as_deref()).await {
            Ok(mentions) => mentions,
            Err(e) => {
                error!(error = %e, "Failed to fetch mentions");
                return Ok(CheckMentionsSummary {
                    success: false,
                    dry_run,
                    error: Some(format!("fetch_failed: {e}")),
                    ..CheckMentionsSummary::default()
                });
            }
        };
        info!(since = ?since, found = mentions.len(), dry_run, "Checked mentions");

        let previews = mentions
            .iter()
            .map(|m| MentionPreview {
                tweet_id: m.id.clone(),
                author: m.author.clone(),
                text: m.text.chars().take(PREVIEW_CHARS).collect(),
            })
            .collect();
        let newest = newest_id(&mentions).map(str::to_string);

        let mut summary = CheckMentionsSummary {
            success: true,
            found: mentions.len(),
            mentions: previews,
            dry_run,
            ..CheckMentionsSummary::default()
        };
        if dry_run || mentions.is_empty() {
            return Ok(summary);
        }

        let processing = self.process(mentions).await?;
        summary.success = processing.success;
        summary.processing = Some(processing);
        if let Some(newest) = newest {
            rt.ctx.ledger.set_state(LAST_MENTION_KEY, &newest).await?;
        }
        Ok(summary)
    }

    async fn process(&self, mentions: Vec<InboundMention>) -> Result<MentionsSummary, murmur_core::Error> {
        let rt = &self.rt;
        let found = mentions.len();
        let features = &rt.ctx.settings.features;

        let mut fresh = Vec::new();
        for mention in mentions.into_iter().filter(|m| features.is_whitelisted(&m.author)) {
            if rt.ctx.ledger.mention_exists(&mention.id, false).await? {
                continue;
            }
            rt.ctx
                .ledger
                .upsert_pending_mention(&mention.id, &mention.author, &mention.text)
                .await?;
            fresh.push(mention);
        }
        info!(found, unprocessed = fresh.len(), "Mentions fetched");

        let mut summary = MentionsSummary {
            success: true,
            found,
            unprocessed: fresh.len(),
            tier: rt.gate().tier().await.map(|t| t.to_string()),
            ..MentionsSummary::default()
        };
        if fresh.is_empty() {
            return Ok(summary);
        }

        let selections = match self.select(&fresh).await {
            Ok(selections) => selections,
            Err(e) => {
                // Everything stays pending for the next run.
                warn!(error = %e, "Mention selection failed");
                summary.success = false;
                summary.error = Some(format!("selection_failed: {e}"));
                return Ok(summary);
            }
        };
        summary.selected = selections.len();

        let chosen: HashSet<&str> = selections.iter().map(|s| s.tweet_id.as_str()).collect();
        for mention in fresh.iter().filter(|m| !chosen.contains(m.id.as_str())) {
            rt.ctx
                .ledger
                .finalize_mention(&MentionOutcome::ignored(&mention.id).with_author(&mention.author, &mention.text))
                .await?;
        }

        for selection in &selections {
            let Some(mention) = fresh.iter().find(|m| m.id == selection.tweet_id) else {
                continue;
            };
            let (used, limit) = rt.quota(ActionKind::Reply).await?;
            if used >= limit {
                warn!(used, limit, "Daily reply limit reached, leaving the rest pending");
                summary.results.push(MentionReply::failed(&mention.id, "daily_reply_limit_reached"));
                break;
            }
            let result = self.reply_to(mention, selection).await?;
            if result.success {
                summary.processed += 1;
            }
            summary.results.push(result);
        }

        info!(selected = summary.selected, processed = summary.processed, "Mentions processed");
        Ok(summary)
    }

    /// Ask the model which mentions to answer. Picks are ordered by priority
    /// and restricted to ids actually offered.
    async fn select(&self, mentions: &[InboundMention]) -> Result<Vec<SelectedMention>, murmur_core::Error> {
        let rt = &self.rt;
        let listing = mentions
            .iter()
            .map(|m| format!("- tweet_id: {}\n  from: @{}\n  text: {}", m.id, m.author, m.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        let recent = rt.ctx.ledger.recent_replies_context(SELECTION_HISTORY).await?;
        let conv = conversation(selector_system(&rt.settings.persona), selector_request(&listing, &recent));

        let reply: MentionSelection = rt.ask(&conv, mention_selection_format()).await?;
        let mut picks = reply.selected_mentions;
        picks.sort_by_key(|s| s.priority);

        let mut seen = HashSet::new();
        picks.retain(|s| mentions.iter().any(|m| m.id == s.tweet_id) && seen.insert(s.tweet_id.clone()));
        info!(selected = picks.len(), of = mentions.len(), "Mentions selected");
        Ok(picks)
    }

    async fn reply_to(&self, mention: &InboundMention, selection: &SelectedMention) -> Result<MentionReply, murmur_core::Error> {
        let rt = &self.rt;
        info!(tweet_id = %mention.id, author = %mention.author, "Replying to mention");

        let history = rt.ctx.ledger.conversation_history(&mention.author, rt.settings.history_limit).await?;
        let tools_desc = rt.registry.describe(Mode::Batch, rt.tool_tier().await);
        let mut conv = conversation(
            reply_system(&rt.settings.persona, &tools_desc),
            reply_request(
                &mention.author,
                &mention.text,
                &selection.reasoning,
                &selection.suggested_approach,
                &history,
            ),
        );

        let plan = request_plan(rt, &mut conv).await;
        let execution = execute_plan(rt, &mut conv, &plan).await;

        conv.push(Message::user(FINAL_REPLY_REQUEST));
        let raw = match rt.ask::<ReplyText>(&conv, reply_text_format()).await {
            Ok(reply) => reply.reply_text,
            Err(e) => {
                warn!(tweet_id = %mention.id, error = %e, "Reply text request failed");
                String::new()
            }
        };
        let finalized = finalize_text(&raw);
        if finalized.used_fallback {
            // Canned lines make poor answers; the mention stays pending.
            return Ok(MentionReply {
                tools_used: execution.tools_used,
                ..MentionReply::failed(&mention.id, "empty_reply")
            });
        }
        let text = finalized.text;

        let media_id = upload(rt.ctx.social.as_ref(), execution.image.as_deref()).await;
        let policy = rt.ctx.settings.publish_retry;
        let reply_id = match publish_with_retry(
            rt.ctx.social.as_ref(),
            &text,
            Target::Reply { to: &mention.id },
            media_id.as_deref(),
            policy,
        )
        .await
        {
            Ok(id) => id,
            Err(e) => {
                return Ok(MentionReply {
                    author: Some(mention.author.clone()),
                    tools_used: execution.tools_used,
                    ..MentionReply::failed(&mention.id, format!("publish_failed: {e}"))
                });
            }
        };
        let has_media = media_id.is_some();

        let action = NewAction::reply(&text, &reply_id, has_media, &mention.id, &mention.author);
        if let Err(e) = rt.ctx.ledger.record_action(&action).await {
            error!(%reply_id, error = %e, "Failed to record published reply");
        }
        rt.ctx
            .ledger
            .finalize_mention(
                &MentionOutcome::replied(&mention.id, &text, execution.tools_used.clone())
                    .with_author(&mention.author, &mention.text),
            )
            .await?;
        rt.announce(&Published {
            kind: ActionKind::Reply,
            external_id: reply_id.clone(),
            has_media,
        });

        info!(tweet_id = %mention.id, %reply_id, has_media, "Mention answered");
        Ok(MentionReply {
            success: true,
            tweet_id: mention.id.clone(),
            author: Some(mention.author.clone()),
            reply: Some(text),
            tools_used: execution.tools_used,
            has_image: has_media,
            error: None,
        })
    }
}

/// The greatest numeric id. Ids are decimal strings of varying length.
fn newest_id(mentions: &[InboundMention]) -> Option<&str> {
    mentions
        .iter()
        .map(|m| m.id.as_str())
        .max_by(|a, b| (a.len(), *a).cmp(&(b.len(), *b)))
}
