//! Command implementations and the shared composition root.

pub mod init;
pub mod mentions;
pub mod run;
pub mod serve;
pub mod status;
pub mod tier;

use murmur_agent::{AgentService, AgentSettings, Runtime};
use murmur_config::AppConfig;
use murmur_core::event::EventBus;
use murmur_core::ledger::Ledger;
use murmur_core::provider::Provider;
use murmur_core::social::SocialClient;
use murmur_gate::{CapabilityGate, HttpUsageProbe};
use murmur_ledger::SqliteLedger;
use murmur_providers::OpenRouterProvider;
use murmur_social::{RecordingClient, TwitterClient};
use murmur_tools::{ToolContext, ToolSettings, default_registry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn default_config_path() -> PathBuf {
    AppConfig::config_dir().join("config.toml")
}

pub fn load_config(path: &Path) -> CliResult<AppConfig> {
    AppConfig::load_with_overrides(path).map_err(|e| format!("Failed to load config: {e}").into())
}

/// Everything a command needs, wired once.
pub struct App {
    pub config: AppConfig,
    pub service: Arc<AgentService>,
    pub gate: Arc<CapabilityGate>,
}

/// Build the service from configuration.
///
/// A dry run publishes into an in-process recording client and keeps its
/// ledger in memory, so nothing real is touched.
pub async fn build_app(config: AppConfig, dry_run: bool) -> CliResult<App> {
    if !config.has_api_key() {
        return Err(format!(
            "No OpenRouter API key. Set OPENROUTER_API_KEY or add it to {}",
            default_config_path().display()
        )
        .into());
    }
    let provider: Arc<dyn Provider> = Arc::new(OpenRouterProvider::from_config(&config.openrouter));

    let social: Arc<dyn SocialClient>;
    let ledger: Arc<dyn Ledger>;
    if dry_run {
        info!("Dry run: publishing to a recording client with an in-memory ledger");
        social = Arc::new(RecordingClient::new());
        ledger = Arc::new(SqliteLedger::in_memory().await?);
    } else {
        if let Some(dir) = Path::new(&config.database.path).parent() {
            std::fs::create_dir_all(dir)?;
        }
        social = Arc::new(TwitterClient::from_config(&config.twitter)?);
        ledger = Arc::new(SqliteLedger::open(&config.database.path, config.database.max_connections).await?);
    }

    let events = Arc::new(EventBus::default());
    let gate = Arc::new(
        CapabilityGate::new(
            Arc::new(HttpUsageProbe::from_config(&config.twitter)),
            config.features.allow_mentions,
        )
        .with_events(events.clone()),
    );
    gate.initialize().await;

    let tool_settings = ToolSettings::from_config(&config);
    let registry = Arc::new(default_registry(&tool_settings).with_events(events.clone()));
    let ctx = ToolContext::new(provider, social, ledger, gate.clone(), tool_settings);
    let runtime = Runtime::new(ctx, registry, AgentSettings::from_config(&config), events);

    Ok(App {
        config,
        service: Arc::new(AgentService::new(runtime)),
        gate,
    })
}

/// Print a summary as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
