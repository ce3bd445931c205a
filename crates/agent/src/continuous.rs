//! Continuous mode: one tool per model turn until the model finishes the
//! cycle or the step budget runs out.

use crate::context::{CycleContext, render};
use crate::prompts::{CYCLE_KICKOFF, StepDecision, continuous_system, step_format, step_observation};
use crate::runtime::{Runtime, conversation};
use crate::summary::{ContinuousSummary, Termination};
use chrono::Utc;
use murmur_core::ledger::ActionKind;
use murmur_core::message::Message;
use murmur_core::tool::{Mode, ToolName};
use murmur_tools::ToolOutput;
use tracing::{info, warn};

pub struct ContinuousAgent {
    rt: Runtime,
}

impl ContinuousAgent {
    pub fn new(rt: Runtime) -> Self {
        Self { rt }
    }

    async fn cycle_context(&self) -> Result<String, murmur_core::Error> {
        let rt = &self.rt;
        let recent_actions = rt.ctx.ledger.recent_actions_context(rt.settings.recent_actions_limit).await?;
        let (posts_today, post_limit) = rt.quota(ActionKind::Post).await?;
        let (replies_today, reply_limit) = rt.quota(ActionKind::Reply).await?;
        Ok(render(&CycleContext {
            recent_actions,
            posts_today,
            post_limit,
            replies_today,
            reply_limit,
            tier: rt.gate().tier().await,
            replies_available: rt.gate().can_use_reply_features().await.allowed,
            now: Utc::now(),
        }))
    }

    /// Run one cycle. Model transport failures end it with `Err`; everything
    /// a tool does wrong is fed back as an observation.
    pub async fn run(&self) -> Result<ContinuousSummary, murmur_core::Error> {
        let rt = &self.rt;
        let tier = rt.tool_tier().await;
        let admissible = rt.registry.admissible(Mode::Continuous, tier);
        let system = continuous_system(
            &rt.settings.persona,
            &rt.registry.describe(Mode::Continuous, tier),
            &self.cycle_context().await?,
        );
        let schema = rt.registry.step_schema(Mode::Continuous, tier);
        let mut conv = conversation(system, CYCLE_KICKOFF.to_string());

        info!(max_steps = rt.settings.max_steps, tools = admissible.len(), "Continuous cycle starting");

        let mut summary = ContinuousSummary {
            success: true,
            ..ContinuousSummary::default()
        };
        // Auxiliary tools since the last publish; handed to the next publish.
        let mut tools_used: Vec<String> = Vec::new();

        while (summary.steps as usize) < rt.settings.max_steps {
            summary.steps += 1;
            let step = summary.steps;

            let decision: StepDecision = rt.ask(&conv, step_format(schema.clone())).await?;
            conv.push(Message::assistant(serde_json::to_string(&decision).unwrap_or_default()));
            info!(step, tool = %decision.tool, thinking = %decision.thinking.chars().take(100).collect::<String>(), "Step decided");

            let name = decision.tool.parse::<ToolName>().ok().filter(|n| admissible.contains(n));
            let output = match name {
                Some(name) => {
                    let params = if decision.params.is_object() {
                        decision.params
                    } else {
                        serde_json::json!({})
                    };
                    let ctx = rt.ctx.with_tools_used(tools_used.clone());
                    let output = rt.registry.invoke(name.as_str(), params, &ctx).await;
                    if name.publishes().is_none() && !name.is_terminal() {
                        tools_used.push(name.as_str().to_string());
                    }
                    output
                }
                None => {
                    warn!(step, tool = %decision.tool, "Model chose a tool outside the admissible set");
                    ToolOutput::unknown_tool(&decision.tool)
                }
            };

            if let Some(published) = &output.published {
                match published.kind {
                    ActionKind::Post => summary.posts += 1,
                    ActionKind::Reply => summary.replies += 1,
                }
                tools_used.clear();
                rt.announce(published);
            }

            if let Some(reason) = output.finished {
                info!(step, %reason, "Cycle finished by the model");
                summary.termination = Some(Termination::Finished);
                summary.finish_reason = Some(reason);
                break;
            }

            let tool = name.map_or(decision.tool.as_str(), |n| n.as_str());
            conv.push(Message::user(step_observation(tool, &output.text)));
        }

        if summary.termination.is_none() {
            warn!(steps = summary.steps, "Step budget exhausted");
            summary.termination = Some(Termination::StepCap);
        }
        info!(
            steps = summary.steps,
            posts = summary.posts,
            replies = summary.replies,
            termination = ?summary.termination,
            "Continuous cycle done"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, harness_settings};
    use murmur_core::error::ProviderError;
    use murmur_core::ledger::Ledger;
    use murmur_core::social::InboundMention;
    use murmur_providers::ScriptedProvider;
    use murmur_social::RecordingClient;

    #[tokio::test]
    async fn post_then_finish() {
        let provider = ScriptedProvider::from_texts([
            r#"{"thinking": "check the news", "tool": "web_search", "params": {"query": "cats"}}"#,
            "Cats are trending.",
            r#"{"thinking": "post about it", "tool": "create_post", "params": {"text": "cats everywhere"}}"#,
            r#"{"thinking": "done", "tool": "finish_cycle", "params": {"reasoning": "posted once"}}"#,
        ]);
        let h = harness(provider, RecordingClient::new()).await;

        let summary = ContinuousAgent::new(h.rt.clone()).run().await.unwrap();
        assert!(summary.success);
        assert_eq!(summary.posts, 1);
        assert_eq!(summary.steps, 3);
        assert_eq!(summary.termination, Some(Termination::Finished));
        assert_eq!(summary.finish_reason.as_deref(), Some("posted once"));
        assert_eq!(h.social.published()[0].text, "cats everywhere");
        assert_eq!(h.ledger.count_today(ActionKind::Post).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn step_cap_ends_the_cycle() {
        let provider = ScriptedProvider::from_texts([
            r#"{"thinking": "hmm", "tool": "get_twitter_profile", "params": {"username": "nobody"}}"#,
        ])
        .repeat_last();
        let mut settings = harness_settings();
        settings.max_steps = 4;
        let h = crate::testing::harness_full(provider, RecordingClient::new(), false, settings).await;

        let summary = ContinuousAgent::new(h.rt.clone()).run().await.unwrap();
        assert!(summary.success);
        assert_eq!(summary.steps, 4);
        assert_eq!(summary.termination, Some(Termination::StepCap));
        assert_eq!(h.provider.call_count(), 4);
    }

    #[tokio::test]
    async fn inadmissible_tool_is_fed_back() {
        let provider = ScriptedProvider::from_texts([
            r#"{"thinking": "draw", "tool": "generate_image", "params": {"prompt": "x"}}"#,
            r#"{"thinking": "stop", "tool": "finish_cycle", "params": {}}"#,
        ]);
        let h = harness(provider, RecordingClient::new()).await;
        let summary = ContinuousAgent::new(h.rt.clone()).run().await.unwrap();

        assert_eq!(summary.termination, Some(Termination::Finished));
        let second = &h.provider.requests()[1];
        let last = second.messages.last().unwrap();
        assert_eq!(
            last.content,
            "Tool result (generate_image):\nError: Unknown tool 'generate_image'\n\nDecide what to do next."
        );
    }

    #[tokio::test]
    async fn reply_carries_auxiliary_tools() {
        let provider = ScriptedProvider::from_texts([
            r#"{"thinking": "inbox", "tool": "get_mentions", "params": {}}"#,
            r#"{"thinking": "who is this", "tool": "get_conversation_history", "params": {"username": "alice"}}"#,
            r#"{"thinking": "answer", "tool": "create_reply", "params": {"text": "hi alice", "reply_to_tweet_id": "101", "reply_to_author": "alice"}}"#,
            r#"{"thinking": "done", "tool": "finish_cycle", "params": {"reasoning": "answered"}}"#,
        ]);
        let social = RecordingClient::new().with_mentions(vec![InboundMention {
            id: "101".into(),
            author: "alice".into(),
            text: "@murmur hello".into(),
        }]);
        let h = harness(provider, social).await;
        h.gate.initialize().await;

        let summary = ContinuousAgent::new(h.rt.clone()).run().await.unwrap();
        assert_eq!(summary.replies, 1);
        assert!(h.ledger.mention_exists("101", false).await.unwrap());
        let history = h.ledger.conversation_history("alice", 5).await.unwrap();
        assert!(history.contains("You replied: hi alice"));
        let context = h.ledger.recent_replies_context(5).await.unwrap();
        assert!(context.contains("hi alice"));
    }

    #[tokio::test]
    async fn model_failure_is_an_error() {
        let provider = ScriptedProvider::new(vec![]).then_fail(ProviderError::Timeout("60s".into()));
        let h = harness(provider, RecordingClient::new()).await;
        assert!(ContinuousAgent::new(h.rt.clone()).run().await.is_err());
    }

    #[tokio::test]
    async fn context_block_reaches_the_model() {
        let provider = ScriptedProvider::from_texts([r#"{"thinking": "", "tool": "finish_cycle", "params": {}}"#]);
        let h = harness(provider, RecordingClient::new()).await;
        ContinuousAgent::new(h.rt.clone()).run().await.unwrap();

        let request = &h.provider.requests()[0];
        let system = &request.messages[0].content;
        assert!(system.contains("## AVAILABLE TOOLS"));
        assert!(system.contains("- Posts today: 0/15 (15 remaining)"));
        assert!(system.contains("Tier: UNKNOWN"));
        assert_eq!(request.messages[1].content, CYCLE_KICKOFF);
        let format = request.response_format.as_ref().unwrap();
        assert_eq!(format.name, "step_decision");
    }
}
