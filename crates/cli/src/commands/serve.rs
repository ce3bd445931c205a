//! `murmur serve`: HTTP gateway plus the job scheduler.

use super::{CliResult, build_app, load_config};
use murmur_agent::AgentService;
use murmur_gateway::GatewayState;
use murmur_workflow::{JobAction, Scheduler, TriggeredJob};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub async fn run(config_path: &Path, port: Option<u16>) -> CliResult {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.gateway.port = port;
    }
    let app = build_app(config, false).await?;
    let addr = format!("{}:{}", app.config.gateway.host, app.config.gateway.port);

    let mentions_allowed = app.gate.can_use_reply_features().await.allowed;
    let scheduler = Scheduler::from_config(&app.config.schedule, mentions_allowed).await;
    for job in scheduler.list_jobs().await {
        info!(job = %job.name, every_secs = job.period_secs, action = ?job.action, "Scheduled");
    }
    let (mut jobs, _scheduler_handle) = scheduler.start();

    let service = app.service.clone();
    tokio::spawn(async move {
        while let Some(job) = jobs.recv().await {
            dispatch(&service, job).await;
        }
    });

    let state = Arc::new(GatewayState {
        service: app.service.clone(),
        crc_secret: app.config.twitter.api_secret.clone(),
    });
    murmur_gateway::serve(&addr, state).await?;
    Ok(())
}

async fn dispatch(service: &AgentService, job: TriggeredJob) {
    info!(job = %job.name, "Running scheduled job");
    match job.action {
        JobAction::AgentCycle => {
            let s = service.run_continuous().await;
            info!(success = s.success, posts = s.posts, replies = s.replies, steps = s.steps, "Scheduled cycle done");
        }
        JobAction::BatchPost => {
            let s = service.run_batch().await;
            info!(success = s.success, tweet_id = ?s.tweet_id, error = ?s.error, "Scheduled post done");
        }
        JobAction::ProcessMentions => {
            let s = service.check_mentions(false).await;
            info!(success = s.success, found = s.found, error = ?s.error, "Scheduled mention check done");
        }
        JobAction::TierRefresh => {
            if let Some(outcome) = service.runtime().gate().maybe_refresh().await {
                info!(?outcome, "Scheduled tier refresh");
            }
        }
    }
}
