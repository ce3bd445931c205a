//! Structured results of every operation the service exposes.
//!
//! None of these carry a Rust error: failure is `success = false` plus an
//! `error` string, so callers can branch without logs.

use murmur_core::ledger::LedgerStats;
use murmur_gate::{GateStatus, RefreshOutcome};
use serde::{Deserialize, Serialize};

/// Returned when another cycle holds the single-flight guard.
pub const CYCLE_IN_PROGRESS: &str = "cycle_in_progress";

/// Uniform handling of the cycle summaries by the service.
pub trait CycleResult: Sized {
    fn failed(error: String) -> Self;
    fn skipped() -> Self;
    fn set_duration(&mut self, seconds: f64);
    fn success(&self) -> bool;
    /// Artifacts published
    fn published(&self) -> u32;
}

macro_rules! cycle_result {
    ($ty:ty, |$s:ident| $published:expr) => {
        impl CycleResult for $ty {
            fn failed(error: String) -> Self {
                Self {
                    success: false,
                    error: Some(error),
                    ..Self::default()
                }
            }

            fn skipped() -> Self {
                Self {
                    success: false,
                    skipped: true,
                    error: Some(CYCLE_IN_PROGRESS.into()),
                    ..Self::default()
                }
            }

            fn set_duration(&mut self, seconds: f64) {
                self.duration_seconds = seconds;
            }

            fn success(&self) -> bool {
                self.success
            }

            fn published(&self) -> u32 {
                let $s = self;
                $published
            }
        }
    };
}

/// Outcome of a batch post cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub success: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub tools_used: Vec<String>,
    pub has_image: bool,
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_percent: Option<f64>,
    pub duration_seconds: f64,
}

cycle_result!(BatchSummary, |s| u32::from(s.tweet_id.is_some()));

/// How a continuous cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The model called the terminal tool
    Finished,
    /// The step budget ran out first
    StepCap,
}

/// Outcome of a continuous cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuousSummary {
    pub success: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    pub posts: u32,
    pub replies: u32,
    pub steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_seconds: f64,
}

cycle_result!(ContinuousSummary, |s| s.posts + s.replies);

/// What happened to one selected mention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MentionReply {
    pub success: bool,
    pub tweet_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    pub tools_used: Vec<String>,
    pub has_image: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MentionReply {
    pub fn failed(tweet_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            tweet_id: tweet_id.into(),
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Outcome of a mention-processing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MentionsSummary {
    pub success: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    pub found: usize,
    pub unprocessed: usize,
    pub selected: usize,
    /// Replies actually published
    pub processed: usize,
    pub results: Vec<MentionReply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    pub duration_seconds: f64,
}

cycle_result!(MentionsSummary, |s| s.processed as u32);

/// A mention as shown by a dry-run check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionPreview {
    pub tweet_id: String,
    pub author: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckMentionsSummary {
    pub success: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    pub found: usize,
    pub mentions: Vec<MentionPreview>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing: Option<MentionsSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_seconds: f64,
}

cycle_result!(CheckMentionsSummary, |s| s.processing.as_ref().map_or(0, |p| p.processed as u32));

/// Either kind of cycle, for callers that pick the mode at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CycleSummary {
    Batch(BatchSummary),
    Continuous(ContinuousSummary),
}

impl CycleSummary {
    pub fn success(&self) -> bool {
        match self {
            CycleSummary::Batch(s) => s.success,
            CycleSummary::Continuous(s) => s.success,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub success: bool,
    pub outcome: RefreshOutcome,
    pub status: GateStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSummary {
    /// `healthy` or `degraded`
    pub status: String,
    pub ledger: bool,
    pub tier: String,
    pub version: String,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<LedgerStats>,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Seconds with one decimal, as reported in summaries.
pub fn round_seconds(elapsed: std::time::Duration) -> f64 {
    (elapsed.as_secs_f64() * 10.0).round() / 10.0
}
