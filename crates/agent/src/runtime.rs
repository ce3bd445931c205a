//! Handles and settings shared by every loop.

use crate::prompts::DEFAULT_PERSONA;
use chrono::Utc;
use murmur_config::AppConfig;
use murmur_core::error::ProviderError;
use murmur_core::event::{DomainEvent, EventBus};
use murmur_core::ledger::ActionKind;
use murmur_core::message::{Conversation, Message};
use murmur_core::provider::{ProviderRequest, ResponseFormat};
use murmur_core::tier::Tier;
use murmur_gate::CapabilityGate;
use murmur_providers::decode_structured;
use murmur_tools::{Published, ToolContext, ToolRegistry};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Loop knobs, resolved from configuration.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub persona: String,
    pub max_steps: usize,
    pub max_plan_steps: usize,
    pub recent_actions_limit: usize,
    pub history_limit: usize,
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let agent = &config.agent;
        Self {
            model: config.openrouter.model.clone(),
            temperature: config.openrouter.temperature,
            max_tokens: config.openrouter.max_tokens,
            persona: agent
                .persona
                .clone()
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            max_steps: agent.max_steps,
            max_plan_steps: agent.max_plan_steps.clamp(1, murmur_config::MAX_PLAN_STEPS),
            recent_actions_limit: agent.recent_actions_limit,
            history_limit: agent.history_limit,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Everything a loop needs, cheap to clone.
#[derive(Clone)]
pub struct Runtime {
    pub ctx: ToolContext,
    pub registry: Arc<ToolRegistry>,
    pub settings: Arc<AgentSettings>,
    pub events: Arc<EventBus>,
}

impl Runtime {
    pub fn new(ctx: ToolContext, registry: Arc<ToolRegistry>, settings: AgentSettings, events: Arc<EventBus>) -> Self {
        Self {
            ctx,
            registry,
            settings: Arc::new(settings),
            events,
        }
    }

    pub fn gate(&self) -> &CapabilityGate {
        &self.ctx.gate
    }

    /// The tier used to filter tools. Reply features being unavailable
    /// narrows it to free so mention tools drop out.
    pub async fn tool_tier(&self) -> Option<Tier> {
        if self.gate().can_use_reply_features().await.allowed {
            self.gate().tier().await
        } else {
            Some(Tier::Free)
        }
    }

    /// Ask the model for a shaped reply and decode it. Only transport
    /// failures are errors; a reply that does not fit decodes to defaults.
    pub async fn ask<T>(&self, conversation: &Conversation, format: ResponseFormat) -> Result<T, ProviderError>
    where
        T: DeserializeOwned + Default,
    {
        let shape = format.name.clone();
        let request = ProviderRequest::new(&self.settings.model, conversation.messages.clone())
            .with_format(format)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);
        let response = self.ctx.provider.complete(request).await?;
        debug!(%shape, raw = %response.message.content, "Model reply");
        Ok(decode_structured(&response.message.content))
    }

    /// Same-day count and quota for `kind`.
    pub async fn quota(&self, kind: ActionKind) -> Result<(u32, u32), murmur_core::Error> {
        let used = self.ctx.ledger.count_today(kind).await?;
        let limit = self.gate().daily_quota(kind).await;
        Ok((used, limit))
    }

    pub fn announce(&self, published: &Published) {
        self.events.publish(DomainEvent::ActionPublished {
            kind: published.kind,
            external_id: published.external_id.clone(),
            has_media: published.has_media,
            timestamp: Utc::now(),
        });
    }
}

/// Seed a conversation with a system prompt and the first user turn.
pub fn conversation(system: String, user: String) -> Conversation {
    let mut conversation = Conversation::with_system(system);
    conversation.push(Message::user(user));
    conversation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_budget_is_clamped() {
        let mut config = AppConfig::default();
        config.agent.max_plan_steps = 10;
        assert_eq!(AgentSettings::from_config(&config).max_plan_steps, murmur_config::MAX_PLAN_STEPS);

        config.agent.max_plan_steps = 0;
        assert_eq!(AgentSettings::from_config(&config).max_plan_steps, 1);
    }

    #[test]
    fn history_limit_comes_from_config() {
        let mut config = AppConfig::default();
        config.agent.history_limit = 7;
        assert_eq!(AgentSettings::from_config(&config).history_limit, 7);
    }
}
