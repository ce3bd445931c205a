//! The process-facing surface of the agent.
//!
//! Every operation returns a summary value. Errors and panics inside a cycle
//! become `success = false`; a cycle requested while another runs is skipped.

use crate::batch::BatchPoster;
use crate::continuous::ContinuousAgent;
use crate::mentions::MentionResponder;
use crate::runtime::Runtime;
use crate::summary::{
    BatchSummary, CheckMentionsSummary, ContinuousSummary, CycleResult, CycleSummary, HealthSummary, MentionsSummary,
    MetricsSummary, RefreshSummary, round_seconds,
};
use chrono::Utc;
use futures::FutureExt;
use murmur_core::event::DomainEvent;
use murmur_gate::{GateStatus, RefreshOutcome};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Which loop a scheduled cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleMode {
    Batch,
    Continuous,
}

impl CycleMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleMode::Batch => "batch",
            CycleMode::Continuous => "continuous",
        }
    }
}

impl std::fmt::Display for CycleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CycleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batch" => Ok(CycleMode::Batch),
            "continuous" => Ok(CycleMode::Continuous),
            other => Err(format!("unknown cycle mode '{other}' (expected batch or continuous)")),
        }
    }
}

pub struct AgentService {
    rt: Runtime,
    /// Single-flight guard shared by every cycle kind.
    cycle_lock: Mutex<()>,
    started: Instant,
}

impl AgentService {
    pub fn new(rt: Runtime) -> Self {
        Self {
            rt,
            cycle_lock: Mutex::new(()),
            started: Instant::now(),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    async fn guarded<S, F>(&self, label: &'static str, cycle: F) -> S
    where
        S: CycleResult,
        F: Future<Output = Result<S, murmur_core::Error>>,
    {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            warn!(cycle = label, "Another cycle is running, skipping");
            return S::skipped();
        };

        if let Some(outcome) = self.rt.gate().maybe_refresh().await {
            debug!(?outcome, "Tier refreshed before cycle");
        }

        let start = Instant::now();
        let outcome = match AssertUnwindSafe(cycle).catch_unwind().await {
            Ok(Ok(summary)) => Ok(summary),
            Ok(Err(e)) => {
                error!(cycle = label, error = %e, "Cycle failed");
                Err(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(cycle = label, %message, "Cycle panicked");
                Err(format!("internal_error: {message}"))
            }
        };
        let mut summary = match outcome {
            Ok(summary) => summary,
            Err(message) => {
                self.rt.events.publish(DomainEvent::ErrorOccurred {
                    context: label.to_string(),
                    error_message: message.clone(),
                    timestamp: Utc::now(),
                });
                S::failed(message)
            }
        };
        let elapsed = start.elapsed();
        summary.set_duration(round_seconds(elapsed));

        self.rt.events.publish(DomainEvent::CycleCompleted {
            mode: label.to_string(),
            success: summary.success(),
            published: summary.published(),
            duration_ms: elapsed.as_millis() as u64,
            timestamp: Utc::now(),
        });
        summary
    }

    pub async fn run_cycle(&self, mode: CycleMode) -> CycleSummary {
        match mode {
            CycleMode::Batch => CycleSummary::Batch(self.run_batch().await),
            CycleMode::Continuous => CycleSummary::Continuous(self.run_continuous().await),
        }
    }

    pub async fn run_batch(&self) -> BatchSummary {
        let poster = BatchPoster::new(self.rt.clone());
        self.guarded("batch", async move { poster.run().await }).await
    }

    pub async fn run_continuous(&self) -> ContinuousSummary {
        let agent = ContinuousAgent::new(self.rt.clone());
        self.guarded("continuous", async move { agent.run().await }).await
    }

    pub async fn process_mentions(&self) -> MentionsSummary {
        let responder = MentionResponder::new(self.rt.clone());
        self.guarded("mentions", async move { responder.run().await }).await
    }

    pub async fn check_mentions(&self, dry_run: bool) -> CheckMentionsSummary {
        let responder = MentionResponder::new(self.rt.clone());
        self.guarded("check_mentions", async move { responder.check_mentions(dry_run).await })
            .await
    }

    pub async fn tier_status(&self) -> GateStatus {
        self.rt.gate().status().await
    }

    /// Force a detection call regardless of the refresh interval.
    pub async fn refresh_tier(&self) -> RefreshSummary {
        let outcome = self.rt.gate().refresh().await;
        let success = !matches!(outcome, RefreshOutcome::Failed { .. });
        info!(?outcome, "Tier refresh requested");
        RefreshSummary {
            success,
            outcome,
            status: self.rt.gate().status().await,
        }
    }

    /// Clear a cap pause.
    pub async fn resume(&self) -> GateStatus {
        self.rt.gate().resume().await;
        self.rt.gate().status().await
    }

    pub async fn health(&self) -> HealthSummary {
        let ping = self.rt.ctx.ledger.ping().await;
        let tier = self.rt.gate().status().await.tier;
        HealthSummary {
            status: if ping.is_ok() { "healthy" } else { "degraded" }.to_string(),
            ledger: ping.is_ok(),
            tier,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.started.elapsed().as_secs(),
            error: ping.err().map(|e| e.to_string()),
        }
    }

    pub async fn metrics(&self) -> MetricsSummary {
        let uptime_seconds = self.started.elapsed().as_secs();
        match self.rt.ctx.ledger.stats().await {
            Ok(stats) => MetricsSummary {
                success: true,
                stats: Some(stats),
                uptime_seconds,
                error: None,
            },
            Err(e) => MetricsSummary {
                success: false,
                stats: None,
                uptime_seconds,
                error: Some(e.to_string()),
            },
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
