//! The plan-then-execute half of a batch cycle, shared by posts and replies.

use crate::prompts::{PlanReply, Reaction, plan_format, plan_observation, reaction_format};
use crate::runtime::Runtime;
use crate::sanitizer::{PlanStep, sanitize_plan};
use murmur_core::message::{Conversation, Message};
use murmur_core::tool::Mode;
use tracing::{info, warn};

/// What running a plan left behind.
#[derive(Debug, Default)]
pub struct PlanExecution {
    /// Tool names in execution order
    pub tools_used: Vec<String>,
    pub image: Option<Vec<u8>>,
}

/// Ask for a plan, record it in the transcript, and sanitize it.
///
/// A failed or unreadable plan request yields an empty plan.
pub async fn request_plan(rt: &Runtime, conversation: &mut Conversation) -> Vec<PlanStep> {
    let reply: PlanReply = match rt.ask(conversation, plan_format()).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "Plan request failed, continuing without tools");
            PlanReply::default()
        }
    };

    let recorded = serde_json::to_string(&reply).unwrap_or_default();
    conversation.push(Message::assistant(recorded));

    let tier = rt.tool_tier().await;
    let admissible = rt.registry.admissible(Mode::Batch, tier);
    let plan = sanitize_plan(&reply.plan, &admissible, rt.settings.max_plan_steps);

    let names: Vec<&str> = plan.iter().map(|s| s.tool.as_str()).collect();
    info!(reasoning = %reply.reasoning, steps = plan.len(), plan = ?names, "Plan ready");
    plan
}

/// Run each step in order. After every observation the model is asked to
/// reflect; the reflection goes into the transcript and nothing else.
pub async fn execute_plan(rt: &Runtime, conversation: &mut Conversation, plan: &[PlanStep]) -> PlanExecution {
    let mut execution = PlanExecution::default();

    for (i, step) in plan.iter().enumerate() {
        let name = step.tool.as_str();
        info!(step = i + 1, of = plan.len(), tool = name, "Executing plan step");

        let output = rt.registry.invoke(name, step.params.clone(), &rt.ctx).await;
        execution.tools_used.push(name.to_string());
        if let Some(bytes) = output.image {
            execution.image = Some(bytes);
        }
        if !output.success {
            warn!(tool = name, result = %output.text, "Plan step failed, continuing");
        }
        conversation.push(Message::user(plan_observation(name, &output.text)));

        match rt.ask::<Reaction>(conversation, reaction_format()).await {
            Ok(reaction) => {
                info!(step = i + 1, thinking = %reaction.thinking.chars().take(80).collect::<String>(), "Reflection");
                conversation.push(Message::assistant(reaction.thinking));
            }
            Err(e) => warn!(error = %e, "Reflection request failed, skipping it"),
        }
    }

    execution
}
