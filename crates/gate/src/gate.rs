//! The capability gate: tier state, admission checks and daily quotas.

use chrono::{DateTime, Utc};
use murmur_core::event::{DomainEvent, EventBus};
use murmur_core::ledger::ActionKind;
use murmur_core::tier::{Tier, TierLimits};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{error, info, warn};
use crate::probe::{ProbeOutcome, UsageProbe, UsageSnapshot};

/// Minimum spacing between detection calls.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

const CAP_REACHED: &str = "monthly_cap_reached";

/// The answer to an admission question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Admission {
    pub fn allow() -> Self {
        Self { allowed: true, reason: None }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: Some(reason.into()) }
    }

    /// Reason string for logs and results, empty when allowed.
    pub fn reason_or_empty(&self) -> &str {
        self.reason.as_deref().unwrap_or("")
    }
}

/// What a refresh attempt did to the gate state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Tier determined from the reported cap.
    Detected { tier: Tier },
    /// Cap matched no known plan; previous tier kept.
    UnknownCap { project_cap: u64 },
    /// Endpoint throttled us; state unchanged.
    Throttled,
    /// Endpoint forbidden; assumed the most restrictive tier.
    Downgraded,
    /// Network or schema failure; state unchanged.
    Failed { error: String },
}

/// Serializable snapshot for status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateStatus {
    pub tier: String,
    pub is_initialized: bool,
    pub is_paused: bool,
    pub pause_reason: Option<String>,
    pub project_cap: Option<u64>,
    pub project_usage: Option<u64>,
    pub usage_percent: Option<f64>,
    pub cap_reset_day: Option<u32>,
    pub features: TierLimits,
    pub allow_mentions: bool,
    pub last_check: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct GateState {
    tier: Option<Tier>,
    usage: Option<UsageSnapshot>,
    paused: bool,
    pause_reason: Option<String>,
    last_attempt: Option<Instant>,
    last_check: Option<DateTime<Utc>>,
}

impl GateState {
    fn initialized(&self) -> bool {
        self.tier.is_some()
    }

    fn usage_percent(&self) -> Option<f64> {
        self.usage.as_ref().filter(|u| u.project_cap > 0).map(UsageSnapshot::percent)
    }
}

/// Process-wide admission authority. Construct once and share by `Arc`.
pub struct CapabilityGate {
    probe: Arc<dyn UsageProbe>,
    allow_mentions: bool,
    refresh_interval: Duration,
    events: Option<Arc<EventBus>>,
    state: RwLock<GateState>,
}

impl CapabilityGate {
    pub fn new(probe: Arc<dyn UsageProbe>, allow_mentions: bool) -> Self {
        Self {
            probe,
            allow_mentions,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            events: None,
            state: RwLock::new(GateState::default()),
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// First, best-effort detection at startup.
    pub async fn initialize(&self) -> RefreshOutcome {
        let outcome = self.refresh().await;
        let state = self.state.read().await;
        match state.tier {
            Some(tier) => info!(tier = %tier, "Capability gate initialized"),
            None => warn!("Tier detection did not succeed; admission stays permissive until it does"),
        }
        outcome
    }

    /// Query the usage endpoint and fold the answer into the state.
    ///
    /// Never fails: throttling and errors leave the previous state in place.
    pub async fn refresh(&self) -> RefreshOutcome {
        {
            let mut state = self.state.write().await;
            state.last_attempt = Some(Instant::now());
        }

        // No lock is held across the network call.
        let probed = self.probe.probe().await;

        let mut state = self.state.write().await;
        let previous = state.tier;
        let outcome = match probed {
            Ok(ProbeOutcome::Throttled) => {
                warn!("Usage endpoint throttled (429), keeping current tier");
                RefreshOutcome::Throttled
            }
            Ok(ProbeOutcome::Forbidden) => {
                warn!("Usage endpoint forbidden (403), assuming free tier");
                state.tier = Some(Tier::Free);
                state.last_check = Some(Utc::now());
                RefreshOutcome::Downgraded
            }
            Ok(ProbeOutcome::Usage(snapshot)) => {
                state.last_check = Some(Utc::now());
                let cap = snapshot.project_cap;
                let percent = snapshot.percent();
                state.usage = Some(snapshot);

                if cap > 0 {
                    if percent >= 100.0 {
                        if !state.paused {
                            error!(percent, "Monthly cap reached, pausing publishing");
                        }
                        state.paused = true;
                        state.pause_reason = Some(CAP_REACHED.into());
                    } else if percent >= 90.0 {
                        warn!(percent, "Monthly usage above 90%");
                    } else if percent >= 80.0 {
                        warn!(percent, "Monthly usage above 80%");
                    }
                }

                match Tier::from_project_cap(cap) {
                    Some(tier) => {
                        state.tier = Some(tier);
                        RefreshOutcome::Detected { tier }
                    }
                    None => {
                        warn!(project_cap = cap, "Unrecognized project cap, keeping current tier");
                        RefreshOutcome::UnknownCap { project_cap: cap }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Tier detection failed, keeping last known state");
                RefreshOutcome::Failed { error: e.to_string() }
            }
        };

        if let Some(current) = state.tier
            && previous != Some(current)
        {
            info!(from = ?previous, to = %current, "Tier changed");
            if let Some(events) = &self.events {
                events.publish(DomainEvent::TierChanged {
                    from: previous,
                    to: current,
                    timestamp: Utc::now(),
                });
            }
        }

        outcome
    }

    /// Refresh only when the minimum interval has elapsed since the last attempt.
    pub async fn maybe_refresh(&self) -> Option<RefreshOutcome> {
        let due = {
            let state = self.state.read().await;
            state
                .last_attempt
                .is_none_or(|at| at.elapsed() >= self.refresh_interval)
        };
        if due { Some(self.refresh().await) } else { None }
    }

    /// Whether a post may be published now.
    ///
    /// A confirmed cap blocks even when no tier has been detected yet;
    /// otherwise an uninitialized gate allows.
    pub async fn can_publish_post(&self) -> Admission {
        let state = self.state.read().await;
        if state.paused {
            return Admission::deny(state.pause_reason.clone().unwrap_or_else(|| CAP_REACHED.into()));
        }
        if state.usage_percent().is_some_and(|p| p >= 100.0) {
            return Admission::deny(CAP_REACHED);
        }
        Admission::allow()
    }

    /// Whether mention reading and replying are available.
    pub async fn can_use_reply_features(&self) -> Admission {
        if !self.allow_mentions {
            return Admission::deny("mentions_disabled_in_settings");
        }
        let state = self.state.read().await;
        match state.tier {
            None => Admission::allow(),
            Some(tier) if tier.limits().mentions => Admission::allow(),
            Some(tier) => Admission::deny(format!("mentions_not_available_on_{tier}_tier")),
        }
    }

    /// Daily ceiling for `kind`. Undetected tiers get the free limits.
    pub async fn daily_quota(&self, kind: ActionKind) -> u32 {
        let limits = self.state.read().await.tier.unwrap_or(Tier::Free).limits();
        match kind {
            ActionKind::Post => limits.daily_posts,
            ActionKind::Reply => limits.daily_replies,
        }
    }

    /// The known tier, if detection ever succeeded.
    pub async fn tier(&self) -> Option<Tier> {
        self.state.read().await.tier
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.initialized()
    }

    pub async fn usage_percent(&self) -> Option<f64> {
        self.state.read().await.usage_percent()
    }

    /// Clear a pause. The only way out of `monthly_cap_reached`.
    pub async fn resume(&self) {
        let mut state = self.state.write().await;
        if state.paused {
            info!(reason = ?state.pause_reason, "Publishing resumed");
        }
        state.paused = false;
        state.pause_reason = None;
    }

    pub async fn status(&self) -> GateStatus {
        let state = self.state.read().await;
        GateStatus {
            tier: state.tier.map(|t| t.to_string()).unwrap_or_else(|| "unknown".into()),
            is_initialized: state.initialized(),
            is_paused: state.paused,
            pause_reason: state.pause_reason.clone(),
            project_cap: state.usage.as_ref().map(|u| u.project_cap),
            project_usage: state.usage.as_ref().map(|u| u.project_usage),
            usage_percent: state.usage_percent().map(|p| (p * 100.0).round() / 100.0),
            cap_reset_day: state.usage.as_ref().and_then(|u| u.cap_reset_day),
            features: state.tier.unwrap_or(Tier::Free).limits(),
            allow_mentions: self.allow_mentions,
            last_check: state.last_check,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use murmur_core::error::SocialError;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays scripted probe outcomes; repeats the last one when exhausted.
    struct ScriptedProbe {
        outcomes: Mutex<VecDeque<Result<ProbeOutcome, SocialError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(outcomes: Vec<Result<ProbeOutcome, SocialError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UsageProbe for ScriptedProbe {
        async fn probe(&self) -> Result<ProbeOutcome, SocialError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.len() > 1 {
                outcomes.pop_front().unwrap()
            } else {
                outcomes.front().cloned().unwrap_or(Ok(ProbeOutcome::Throttled))
            }
        }
    }

    fn usage(cap: u64, used: u64) -> Result<ProbeOutcome, SocialError> {
        Ok(ProbeOutcome::Usage(UsageSnapshot {
            project_cap: cap,
            project_usage: used,
            cap_reset_day: Some(1),
            project_id: None,
        }))
    }

    fn gate(outcomes: Vec<Result<ProbeOutcome, SocialError>>) -> (CapabilityGate, Arc<ScriptedProbe>) {
        let probe = ScriptedProbe::new(outcomes);
        (CapabilityGate::new(probe.clone(), true), probe)
    }

    #[tokio::test]
    async fn uninitialized_gate_is_permissive() {
        let (gate, _) = gate(vec![]);
        assert!(!gate.is_initialized().await);
        assert!(gate.can_publish_post().await.allowed);
        assert!(gate.can_use_reply_features().await.allowed);
        assert_eq!(gate.daily_quota(ActionKind::Post).await, 15);
        assert_eq!(gate.status().await.tier, "unknown");
    }

    #[tokio::test]
    async fn detects_basic_tier() {
        let (gate, _) = gate(vec![usage(10_000, 10)]);
        assert_eq!(gate.initialize().await, RefreshOutcome::Detected { tier: Tier::Basic });
        assert_eq!(gate.tier().await, Some(Tier::Basic));
        assert_eq!(gate.daily_quota(ActionKind::Reply).await, 50);
        assert!(gate.can_use_reply_features().await.allowed);
    }

    #[tokio::test]
    async fn exactly_full_cap_blocks_posting() {
        let (gate, _) = gate(vec![usage(10_000, 10_000)]);
        gate.refresh().await;
        let admission = gate.can_publish_post().await;
        assert!(!admission.allowed);
        assert_eq!(admission.reason.as_deref(), Some("monthly_cap_reached"));
        assert!(gate.status().await.is_paused);
    }

    #[tokio::test]
    async fn just_under_cap_still_allows() {
        let (gate, _) = gate(vec![usage(10_000, 9_990)]);
        gate.refresh().await;
        assert!(gate.can_publish_post().await.allowed);
        assert!(!gate.status().await.is_paused);
    }

    #[tokio::test]
    async fn pause_survives_refresh_until_resume() {
        let (gate, _) = gate(vec![usage(10_000, 10_000), usage(10_000, 10)]);
        gate.refresh().await;
        gate.refresh().await;
        assert!(!gate.can_publish_post().await.allowed);

        gate.resume().await;
        assert!(gate.can_publish_post().await.allowed);
    }

    #[tokio::test]
    async fn throttled_refresh_keeps_tier() {
        let (gate, _) = gate(vec![usage(1_000_000, 5), Ok(ProbeOutcome::Throttled)]);
        gate.refresh().await;
        assert_eq!(gate.refresh().await, RefreshOutcome::Throttled);
        assert_eq!(gate.tier().await, Some(Tier::Pro));
    }

    #[tokio::test]
    async fn forbidden_downgrades_to_free() {
        let (gate, _) = gate(vec![usage(1_000_000, 5), Ok(ProbeOutcome::Forbidden)]);
        gate.refresh().await;
        assert_eq!(gate.refresh().await, RefreshOutcome::Downgraded);
        assert_eq!(gate.tier().await, Some(Tier::Free));
        let admission = gate.can_use_reply_features().await;
        assert!(!admission.allowed);
        assert_eq!(admission.reason.as_deref(), Some("mentions_not_available_on_free_tier"));
    }

    #[tokio::test]
    async fn failure_keeps_last_known_state() {
        let (gate, _) = gate(vec![
            usage(10_000, 100),
            Err(SocialError::Transient("connection reset".into())),
        ]);
        gate.refresh().await;
        assert!(matches!(gate.refresh().await, RefreshOutcome::Failed { .. }));
        assert_eq!(gate.tier().await, Some(Tier::Basic));
        assert_eq!(gate.status().await.project_usage, Some(100));
    }

    #[tokio::test]
    async fn unknown_cap_keeps_prior_tier() {
        let (gate, _) = gate(vec![usage(10_000, 1), usage(2_000, 1)]);
        gate.refresh().await;
        assert_eq!(gate.refresh().await, RefreshOutcome::UnknownCap { project_cap: 2_000 });
        assert_eq!(gate.tier().await, Some(Tier::Basic));
    }

    #[tokio::test]
    async fn confirmed_cap_blocks_before_tier_is_known() {
        let (gate, _) = gate(vec![usage(2_000, 2_000)]);
        assert_eq!(gate.initialize().await, RefreshOutcome::UnknownCap { project_cap: 2_000 });
        assert!(!gate.is_initialized().await);

        let admission = gate.can_publish_post().await;
        assert!(!admission.allowed);
        assert_eq!(admission.reason.as_deref(), Some("monthly_cap_reached"));
        assert!(gate.can_use_reply_features().await.allowed);
    }

    #[tokio::test]
    async fn mentions_disabled_in_settings_wins() {
        let probe = ScriptedProbe::new(vec![usage(10_000_000, 1)]);
        let gate = CapabilityGate::new(probe, false);
        gate.refresh().await;
        let admission = gate.can_use_reply_features().await;
        assert_eq!(admission.reason.as_deref(), Some("mentions_disabled_in_settings"));
    }

    #[tokio::test(start_paused = true)]
    async fn maybe_refresh_is_time_gated() {
        let (gate, probe) = gate(vec![usage(10_000, 1)]);
        let gate = gate.with_refresh_interval(Duration::from_secs(3600));

        assert!(gate.maybe_refresh().await.is_some());
        assert!(gate.maybe_refresh().await.is_none());
        assert_eq!(probe.calls(), 1);

        tokio::time::advance(Duration::from_secs(3601)).await;
        assert!(gate.maybe_refresh().await.is_some());
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_attempt_still_counts_for_spacing() {
        let (gate, probe) = gate(vec![Err(SocialError::Transient("down".into()))]);
        gate.maybe_refresh().await;
        assert!(gate.maybe_refresh().await.is_none());
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn tier_change_is_published() {
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let probe = ScriptedProbe::new(vec![usage(1_000_000, 1)]);
        let gate = CapabilityGate::new(probe, true).with_events(bus);
        gate.refresh().await;

        let event = rx.recv().await.unwrap();
        assert!(matches!(event.as_ref(), DomainEvent::TierChanged { to: Tier::Pro, from: None, .. }));
    }
}
