//! The action registry and the tools the agent can call.
//!
//! Each tool is a [`Tool`] keyed by a closed [`ToolName`]. Tools take their
//! parameters as the model sent them, decode them into a typed struct, and
//! report expected failures as observation text rather than errors, so the
//! loop can feed them back to the model.
//!
//! The [`ToolRegistry`] filters the registered tools by mode, tier and feature
//! flags, renders their description block, and dispatches invocations.

pub mod context;
pub mod image;
pub mod params;
pub mod publish;
pub mod registry;
pub mod text;

pub mod create_post;
pub mod create_reply;
pub mod finish_cycle;
pub mod generate_image;
pub mod get_conversation_history;
pub mod get_mentions;
pub mod get_twitter_profile;
pub mod web_search;

use async_trait::async_trait;
use murmur_core::error::ToolError;
use murmur_core::tool::{ParamSpec, ToolName};

pub use context::{Published, ToolContext, ToolOutput, ToolSettings};
pub use image::ImageStudio;
pub use publish::{RetryPolicy, Target, publish_with_retry};
pub use registry::ToolRegistry;

/// One capability the model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> ToolName;

    /// One-line description shown to the model.
    fn description(&self) -> &'static str;

    /// Parameters in display order.
    fn params(&self) -> &'static [ParamSpec];

    /// Run the tool. Expected failures come back as `Ok` with `success = false`;
    /// `Err` is reserved for bad arguments and infrastructure faults.
    async fn execute(&self, params: serde_json::Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError>;
}

/// A registry holding all eight built-in tools in registration order.
pub fn default_registry(settings: &ToolSettings) -> ToolRegistry {
    let mut registry = ToolRegistry::new(settings.image_generation(), settings.allow_mentions());
    registry.register(Box::new(web_search::WebSearchTool));
    registry.register(Box::new(get_twitter_profile::GetTwitterProfileTool));
    registry.register(Box::new(get_conversation_history::GetConversationHistoryTool));
    registry.register(Box::new(generate_image::GenerateImageTool));
    registry.register(Box::new(create_post::CreatePostTool));
    registry.register(Box::new(create_reply::CreateReplyTool));
    registry.register(Box::new(get_mentions::GetMentionsTool));
    registry.register(Box::new(finish_cycle::FinishCycleTool));
    registry
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for tool tests.

    use super::*;
    use murmur_gate::{CapabilityGate, ProbeOutcome, UsageProbe, UsageSnapshot};
    use murmur_core::error::SocialError;
    use murmur_core::provider::Provider;
    use murmur_ledger::SqliteLedger;
    use murmur_providers::ScriptedProvider;
    use murmur_social::RecordingClient;
    use std::sync::Arc;

    pub struct FixedProbe(pub Option<u64>);

    #[async_trait]
    impl UsageProbe for FixedProbe {
        async fn probe(&self) -> Result<ProbeOutcome, SocialError> {
            Ok(match self.0 {
                Some(cap) => ProbeOutcome::Usage(UsageSnapshot {
                    project_cap: cap,
                    project_usage: 0,
                    cap_reset_day: None,
                    project_id: None,
                }),
                None => ProbeOutcome::Forbidden,
            })
        }
    }

    pub struct Fixture {
        pub ctx: ToolContext,
        pub provider: Arc<ScriptedProvider>,
        pub social: Arc<RecordingClient>,
        pub ledger: Arc<SqliteLedger>,
        pub gate: Arc<CapabilityGate>,
    }

    /// A context over an in-memory ledger, a recording client and an
    /// uninitialized gate.
    pub async fn fixture(provider: ScriptedProvider, social: RecordingClient) -> Fixture {
        fixture_with(provider, social, quick_settings()).await
    }

    /// Default settings without the pause between publish retries.
    pub fn quick_settings() -> ToolSettings {
        ToolSettings {
            publish_retry: crate::RetryPolicy::new(3, std::time::Duration::ZERO),
            ..ToolSettings::default()
        }
    }

    pub async fn fixture_with(provider: ScriptedProvider, social: RecordingClient, settings: ToolSettings) -> Fixture {
        let provider = Arc::new(provider);
        let social = Arc::new(social);
        let ledger = Arc::new(SqliteLedger::in_memory().await.unwrap());
        let gate = Arc::new(CapabilityGate::new(Arc::new(FixedProbe(Some(10_000))), settings.allow_mentions()));
        let ctx = ToolContext::new(provider.clone() as Arc<dyn Provider>, social.clone(), ledger.clone(), gate.clone(), settings);
        Fixture { ctx, provider, social, ledger, gate }
    }
}
