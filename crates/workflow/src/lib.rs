//! Interval scheduler for the agent's recurring jobs.
//!
//! Jobs fire when at least their period has passed since they last fired.
//! The scheduler only decides *when*; triggered jobs are sent over a channel
//! and the caller decides what running one means.

use chrono::{DateTime, Utc};
use murmur_config::ScheduleConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// How often the scheduler checks for due jobs.
pub const DEFAULT_TICK: Duration = Duration::from_secs(30);

/// What a job does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAction {
    /// One continuous-mode cycle
    AgentCycle,
    /// One batch post cycle
    BatchPost,
    /// Fetch new mentions and answer them
    ProcessMentions,
    /// Re-detect the tier if the refresh interval elapsed
    TierRefresh,
}

/// A recurring job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub period_secs: u64,
    pub enabled: bool,
    pub action: JobAction,
    #[serde(skip)]
    last_run: Option<Instant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fired_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn every(name: impl Into<String>, period: Duration, action: JobAction) -> Self {
        Self {
            name: name.into(),
            period_secs: period.as_secs(),
            enabled: true,
            action,
            last_run: None,
            last_fired_at: None,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

/// A job that came due.
#[derive(Debug, Clone)]
pub struct TriggeredJob {
    pub name: String,
    pub action: JobAction,
    pub fired_at: DateTime<Utc>,
}

pub struct Scheduler {
    jobs: Arc<RwLock<Vec<Job>>>,
    tick: Duration,
}

impl Scheduler {
    pub fn new(tick: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
            tick,
        }
    }

    /// The jobs the configuration asks for.
    ///
    /// The mention job is only scheduled when reply features are available.
    pub async fn from_config(config: &ScheduleConfig, mentions_allowed: bool) -> Self {
        let scheduler = Self::default();
        let minutes = |m: u64| Duration::from_secs(m * 60);

        let mut jobs = Vec::new();
        if config.use_unified_agent {
            jobs.push(Job::every("agent_cycle", minutes(config.agent_interval_minutes), JobAction::AgentCycle));
        } else {
            jobs.push(Job::every("autopost", minutes(config.post_interval_minutes), JobAction::BatchPost));
            if mentions_allowed {
                jobs.push(Job::every(
                    "mentions",
                    minutes(config.mentions_interval_minutes),
                    JobAction::ProcessMentions,
                ));
            } else {
                info!("Mention job not scheduled: reply features unavailable");
            }
        }
        jobs.push(Job::every("tier_refresh", minutes(config.tier_refresh_minutes), JobAction::TierRefresh));

        for job in jobs {
            if let Err(e) = scheduler.add_job(job).await {
                warn!(error = %e, "Skipping job");
            }
        }
        scheduler
    }

    /// Add a job, replacing one with the same name. Its first run is one
    /// period from now.
    pub async fn add_job(&self, mut job: Job) -> Result<(), String> {
        if job.period_secs == 0 {
            return Err(format!("Job '{}' has a zero period", job.name));
        }
        info!(job = %job.name, period_secs = job.period_secs, action = ?job.action, "Adding job");
        job.last_run = Some(Instant::now());

        let mut jobs = self.jobs.write().await;
        match jobs.iter_mut().find(|j| j.name == job.name) {
            Some(existing) => *existing = job,
            None => jobs.push(job),
        }
        Ok(())
    }

    pub async fn remove_job(&self, name: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|j| j.name != name);
        jobs.len() != before
    }

    pub async fn list_jobs(&self) -> Vec<Job> {
        self.jobs.read().await.clone()
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.jobs.write().await.iter_mut().find(|j| j.name == name) {
            Some(job) => {
                job.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub async fn pause_job(&self, name: &str) -> bool {
        self.set_enabled(name, false).await
    }

    pub async fn resume_job(&self, name: &str) -> bool {
        self.set_enabled(name, true).await
    }

    /// Start ticking in the background.
    ///
    /// Returns the receiver of triggered jobs and the task handle. The loop
    /// stops when the receiver is dropped.
    pub fn start(&self) -> (mpsc::Receiver<TriggeredJob>, tokio::task::JoinHandle<()>) {
        let jobs = self.jobs.clone();
        let tick = self.tick;
        let (tx, rx) = mpsc::channel::<TriggeredJob>(16);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                let now = Instant::now();

                let due: Vec<TriggeredJob> = {
                    let mut jobs = jobs.write().await;
                    jobs.iter_mut()
                        .filter(|job| job.enabled)
                        .filter(|job| job.last_run.is_none_or(|last| now.duration_since(last) >= job.period()))
                        .map(|job| {
                            let fired_at = Utc::now();
                            job.last_run = Some(now);
                            job.last_fired_at = Some(fired_at);
                            info!(job = %job.name, "Job triggered");
                            TriggeredJob {
                                name: job.name.clone(),
                                action: job.action,
                                fired_at,
                            }
                        })
                        .collect()
                };

                for triggered in due {
                    if tx.send(triggered).await.is_err() {
                        debug!("Triggered job receiver dropped, stopping scheduler");
                        return;
                    }
                }
            }
        });

        (rx, handle)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unified_schedule() {
        let scheduler = Scheduler::from_config(&ScheduleConfig::default(), true).await;
        let jobs = scheduler.list_jobs().await;
        let actions: Vec<JobAction> = jobs.iter().map(|j| j.action).collect();
        assert_eq!(actions, [JobAction::AgentCycle, JobAction::TierRefresh]);
        assert_eq!(jobs[0].period(), Duration::from_secs(4 * 60));
    }

    #[tokio::test]
    async fn legacy_schedule_respects_mentions() {
        let config = ScheduleConfig {
            use_unified_agent: false,
            ..ScheduleConfig::default()
        };
        let with = Scheduler::from_config(&config, true).await.list_jobs().await;
        assert_eq!(with.len(), 3);
        assert_eq!(with[1].action, JobAction::ProcessMentions);

        let without = Scheduler::from_config(&config, false).await.list_jobs().await;
        assert!(without.iter().all(|j| j.action != JobAction::ProcessMentions));
    }

    #[tokio::test]
    async fn zero_period_rejected() {
        let scheduler = Scheduler::default();
        assert!(scheduler.add_job(Job::every("x", Duration::ZERO, JobAction::BatchPost)).await.is_err());
        assert!(scheduler.list_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn pause_resume_remove() {
        let scheduler = Scheduler::default();
        scheduler
            .add_job(Job::every("autopost", Duration::from_secs(60), JobAction::BatchPost))
            .await
            .unwrap();

        assert!(scheduler.pause_job("autopost").await);
        assert!(!scheduler.list_jobs().await[0].enabled);
        assert!(scheduler.resume_job("autopost").await);
        assert!(scheduler.list_jobs().await[0].enabled);
        assert!(!scheduler.pause_job("missing").await);

        assert!(scheduler.remove_job("autopost").await);
        assert!(!scheduler.remove_job("autopost").await);
    }

    #[tokio::test(start_paused = true)]
    async fn fires_on_period() {
        let scheduler = Scheduler::new(Duration::from_secs(1));
        scheduler
            .add_job(Job::every("fast", Duration::from_secs(60), JobAction::BatchPost))
            .await
            .unwrap();
        scheduler
            .add_job(Job::every("slow", Duration::from_secs(150), JobAction::TierRefresh))
            .await
            .unwrap();
        let start = Instant::now();
        let (mut rx, handle) = scheduler.start();

        let mut fired = Vec::new();
        for _ in 0..3 {
            let job = rx.recv().await.unwrap();
            fired.push((job.name, start.elapsed().as_secs()));
        }
        handle.abort();

        assert_eq!(fired[0], ("fast".to_string(), 60));
        assert_eq!(fired[1], ("fast".to_string(), 120));
        assert_eq!(fired[2], ("slow".to_string(), 150));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_jobs_do_not_fire() {
        let scheduler = Scheduler::new(Duration::from_secs(1));
        scheduler
            .add_job(Job::every("quiet", Duration::from_secs(5), JobAction::BatchPost))
            .await
            .unwrap();
        scheduler
            .add_job(Job::every("loud", Duration::from_secs(30), JobAction::TierRefresh))
            .await
            .unwrap();
        scheduler.pause_job("quiet").await;

        let (mut rx, handle) = scheduler.start();
        let job = rx.recv().await.unwrap();
        handle.abort();
        assert_eq!(job.name, "loud");
        assert_eq!(job.action, JobAction::TierRefresh);
    }

    #[test]
    fn jobs_serialize_without_clock() {
        let job = Job::every("autopost", Duration::from_secs(240), JobAction::BatchPost);
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["action"], "batch_post");
        assert_eq!(json["period_secs"], 240);
        assert!(json.get("last_run").is_none());
    }
}
