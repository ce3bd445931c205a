//! Configuration loading, validation, and management for murmur.
//!
//! Loads configuration from `~/.murmur/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.murmur/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language model provider
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Social platform credentials
    #[serde(default)]
    pub twitter: TwitterConfig,

    /// Ledger storage
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Cycle scheduling
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Feature switches
    #[serde(default)]
    pub features: FeatureConfig,

    /// Agent loop bounds
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP surface
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

// --- openrouter ---

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used for every text decision
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used by image generation
    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_image_timeout_secs")]
    pub image_timeout_secs: u64,

    /// Attribution headers sent with every request
    #[serde(default = "default_referer")]
    pub referer: String,

    #[serde(default = "default_title")]
    pub title: String,
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4.5".into()
}
fn default_image_model() -> String {
    "google/gemini-3-pro-image-preview".into()
}
fn default_temperature() -> f32 {
    0.8
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_image_timeout_secs() -> u64 {
    120
}
fn default_referer() -> String {
    "https://github.com/murmur-bot/murmur".into()
}
fn default_title() -> String {
    "murmur".into()
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            image_model: default_image_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            image_timeout_secs: default_image_timeout_secs(),
            referer: default_referer(),
            title: default_title(),
        }
    }
}

impl std::fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("image_model", &self.image_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("image_timeout_secs", &self.image_timeout_secs)
            .finish()
    }
}

// --- twitter ---

#[derive(Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_secret: Option<String>,

    /// App-only token used by the usage endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,

    #[serde(default = "default_twitter_api_base")]
    pub api_base: String,

    #[serde(default = "default_twitter_upload_base")]
    pub upload_base: String,
}

fn default_twitter_api_base() -> String {
    "https://api.twitter.com".into()
}
fn default_twitter_upload_base() -> String {
    "https://upload.twitter.com".into()
}

impl TwitterConfig {
    /// All four user-context credentials are present.
    pub fn has_user_credentials(&self) -> bool {
        self.api_key.is_some()
            && self.api_secret.is_some()
            && self.access_token.is_some()
            && self.access_secret.is_some()
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            access_token: None,
            access_secret: None,
            bearer_token: None,
            api_base: default_twitter_api_base(),
            upload_base: default_twitter_upload_base(),
        }
    }
}

impl std::fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .field("access_token", &redact(&self.access_token))
            .field("access_secret", &redact(&self.access_secret))
            .field("bearer_token", &redact(&self.bearer_token))
            .field("api_base", &self.api_base)
            .field("upload_base", &self.upload_base)
            .finish()
    }
}

// --- database ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`
    #[serde(default = "default_database_path")]
    pub path: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    AppConfig::config_dir().join("murmur.db").display().to_string()
}
fn default_max_connections() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// --- schedule ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Continuous agent instead of separate post/mention jobs
    #[serde(default = "default_true")]
    pub use_unified_agent: bool,

    #[serde(default = "default_agent_interval")]
    pub agent_interval_minutes: u64,

    #[serde(default = "default_post_interval")]
    pub post_interval_minutes: u64,

    #[serde(default = "default_mentions_interval")]
    pub mentions_interval_minutes: u64,

    #[serde(default = "default_tier_refresh")]
    pub tier_refresh_minutes: u64,
}

fn default_agent_interval() -> u64 {
    4
}
fn default_post_interval() -> u64 {
    4
}
fn default_mentions_interval() -> u64 {
    60
}
fn default_tier_refresh() -> u64 {
    60
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            use_unified_agent: true,
            agent_interval_minutes: default_agent_interval(),
            post_interval_minutes: default_post_interval(),
            mentions_interval_minutes: default_mentions_interval(),
            tier_refresh_minutes: default_tier_refresh(),
        }
    }
}

// --- features ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    #[serde(default)]
    pub enable_image_generation: bool,

    #[serde(default = "default_true")]
    pub allow_mentions: bool,

    /// Only answer these handles; empty means everyone
    #[serde(default)]
    pub mentions_whitelist: Vec<String>,
}

impl FeatureConfig {
    /// Whether mentions from `handle` may be answered.
    pub fn is_whitelisted(&self, handle: &str) -> bool {
        let handle = handle.trim_start_matches('@');
        self.mentions_whitelist.is_empty()
            || self
                .mentions_whitelist
                .iter()
                .any(|w| w.trim_start_matches('@').eq_ignore_ascii_case(handle))
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            enable_image_generation: false,
            allow_mentions: true,
            mentions_whitelist: Vec::new(),
        }
    }
}

// --- agent ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Step cap for continuous cycles
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    #[serde(default = "default_max_plan_steps")]
    pub max_plan_steps: usize,

    #[serde(default = "default_recent_actions_limit")]
    pub recent_actions_limit: usize,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Attempts per publish before the fallback text is tried
    #[serde(default = "default_publish_attempts")]
    pub publish_attempts: u32,

    #[serde(default = "default_publish_retry_delay_ms")]
    pub publish_retry_delay_ms: u64,

    /// Replaces the built-in persona prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,

    /// Reference images sent along with image prompts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<PathBuf>,
}

fn default_max_steps() -> usize {
    30
}
/// Upper bound on `agent.max_plan_steps`.
pub const MAX_PLAN_STEPS: usize = 3;

fn default_max_plan_steps() -> usize {
    MAX_PLAN_STEPS
}
fn default_recent_actions_limit() -> usize {
    20
}
fn default_history_limit() -> usize {
    10
}
fn default_publish_attempts() -> u32 {
    3
}
fn default_publish_retry_delay_ms() -> u64 {
    2_000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_plan_steps: default_max_plan_steps(),
            recent_actions_limit: default_recent_actions_limit(),
            history_limit: default_history_limit(),
            publish_attempts: default_publish_attempts(),
            publish_retry_delay_ms: default_publish_retry_delay_ms(),
            persona: None,
            assets_dir: None,
        }
    }
}

// --- gateway ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "0.0.0.0".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.murmur/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides and validate.
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup (highest priority).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let secret = |key: &str, slot: &mut Option<String>| {
            if let Some(v) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = Some(v);
            }
        };
        secret("OPENROUTER_API_KEY", &mut self.openrouter.api_key);
        secret("TWITTER_API_KEY", &mut self.twitter.api_key);
        secret("TWITTER_API_SECRET", &mut self.twitter.api_secret);
        secret("TWITTER_ACCESS_TOKEN", &mut self.twitter.access_token);
        secret("TWITTER_ACCESS_SECRET", &mut self.twitter.access_secret);
        secret("TWITTER_BEARER_TOKEN", &mut self.twitter.bearer_token);

        if let Some(path) = lookup("MURMUR_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(model) = lookup("MURMUR_MODEL") {
            self.openrouter.model = model;
        }
        if let Some(flag) = lookup("ENABLE_IMAGE_GENERATION").and_then(|v| parse_flag(&v)) {
            self.features.enable_image_generation = flag;
        }
        if let Some(flag) = lookup("ALLOW_MENTIONS").and_then(|v| parse_flag(&v)) {
            self.features.allow_mentions = flag;
        }
        if let Some(flag) = lookup("USE_UNIFIED_AGENT").and_then(|v| parse_flag(&v)) {
            self.schedule.use_unified_agent = flag;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".murmur")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.openrouter.temperature) {
            return Err(ConfigError::ValidationError(
                "openrouter.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let s = &self.schedule;
        for (name, value) in [
            ("agent_interval_minutes", s.agent_interval_minutes),
            ("post_interval_minutes", s.post_interval_minutes),
            ("mentions_interval_minutes", s.mentions_interval_minutes),
            ("tier_refresh_minutes", s.tier_refresh_minutes),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "schedule.{name} must be at least 1"
                )));
            }
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError("agent.max_steps must be at least 1".into()));
        }
        if !(1..=MAX_PLAN_STEPS).contains(&self.agent.max_plan_steps) {
            return Err(ConfigError::ValidationError(format!(
                "agent.max_plan_steps must be between 1 and {MAX_PLAN_STEPS}"
            )));
        }
        if self.agent.publish_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "agent.publish_attempts must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Check if a model API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.openrouter.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
