//! The agent loops and the service that runs them.
//!
//! Two autonomous modes share one [`Runtime`]:
//!
//! - **Batch**: plan up to three tool steps, run them with a reflection after
//!   each, then write and publish exactly one post. Mentions are answered the
//!   same way, one reply per selected mention.
//! - **Continuous**: the model picks one tool per turn until it calls the
//!   terminal tool or the step budget runs out.
//!
//! [`AgentService`] wraps both behind a single-flight guard and turns every
//! outcome, including failures, into a serializable summary.

pub mod batch;
pub mod context;
pub mod continuous;
pub mod finalize;
pub mod mentions;
pub mod planner;
pub mod prompts;
pub mod runtime;
pub mod sanitizer;
pub mod service;
pub mod summary;

pub use batch::BatchPoster;
pub use continuous::ContinuousAgent;
pub use mentions::MentionResponder;
pub use runtime::{AgentSettings, Runtime};
pub use sanitizer::{PlanStep, sanitize_plan};
pub use service::{AgentService, CycleMode};
pub use summary::{
    BatchSummary, CheckMentionsSummary, ContinuousSummary, CycleSummary, HealthSummary, MentionReply,
    MentionsSummary, MetricsSummary, RefreshSummary, Termination,
};

#[cfg(test)]
pub(crate) mod testing {
    //! An agent runtime over in-process fakes.

    use super::*;
    use async_trait::async_trait;
    use murmur_core::error::SocialError;
    use murmur_core::event::EventBus;
    use murmur_core::provider::Provider;
    use murmur_gate::{CapabilityGate, ProbeOutcome, UsageProbe, UsageSnapshot};
    use murmur_ledger::SqliteLedger;
    use murmur_providers::ScriptedProvider;
    use murmur_social::RecordingClient;
    use murmur_tools::{RetryPolicy, ToolContext, ToolSettings, default_registry};
    use std::sync::Arc;
    use std::time::Duration;

    /// Reports a basic-tier cap whenever asked.
    struct BasicProbe;

    #[async_trait]
    impl UsageProbe for BasicProbe {
        async fn probe(&self) -> Result<ProbeOutcome, SocialError> {
            Ok(ProbeOutcome::Usage(UsageSnapshot {
                project_cap: 10_000,
                project_usage: 120,
                cap_reset_day: None,
                project_id: None,
            }))
        }
    }

    pub struct Harness {
        pub rt: Runtime,
        pub provider: Arc<ScriptedProvider>,
        pub social: Arc<RecordingClient>,
        pub ledger: Arc<SqliteLedger>,
        pub gate: Arc<CapabilityGate>,
    }

    pub fn harness_settings() -> AgentSettings {
        AgentSettings::default()
    }

    /// Uninitialized gate, image generation off.
    pub async fn harness(provider: ScriptedProvider, social: RecordingClient) -> Harness {
        harness_with(provider, social, false).await
    }

    pub async fn harness_with(provider: ScriptedProvider, social: RecordingClient, images: bool) -> Harness {
        harness_full(provider, social, images, harness_settings()).await
    }

    pub async fn harness_full(
        provider: ScriptedProvider,
        social: RecordingClient,
        images: bool,
        settings: AgentSettings,
    ) -> Harness {
        let mut tool_settings = ToolSettings::default();
        tool_settings.features.enable_image_generation = images;
        tool_settings.publish_retry = RetryPolicy::new(3, Duration::ZERO);

        let provider = Arc::new(provider);
        let social = Arc::new(social);
        let ledger = Arc::new(SqliteLedger::in_memory().await.unwrap());
        let gate = Arc::new(CapabilityGate::new(Arc::new(BasicProbe), tool_settings.allow_mentions()));
        let events = Arc::new(EventBus::default());
        let registry = Arc::new(default_registry(&tool_settings).with_events(events.clone()));
        let ctx = ToolContext::new(
            provider.clone() as Arc<dyn Provider>,
            social.clone(),
            ledger.clone(),
            gate.clone(),
            tool_settings,
        );
        Harness {
            rt: Runtime::new(ctx, registry, settings, events),
            provider,
            social,
            ledger,
            gate,
        }
    }
}
