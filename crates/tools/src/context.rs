//! What a tool sees when it runs, and what it hands back.

use crate::image::ImageStudio;
use crate::publish::RetryPolicy;
use murmur_config::{AppConfig, FeatureConfig};
use murmur_core::ledger::{ActionKind, Ledger};
use murmur_core::provider::Provider;
use murmur_core::social::SocialClient;
use murmur_gate::CapabilityGate;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Tool-relevant slice of the configuration.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    /// Model used for web search
    pub model: String,
    pub image_model: String,
    pub features: FeatureConfig,
    pub history_limit: usize,
    pub assets_dir: Option<PathBuf>,
    /// Bound on publish attempts made by the publishing tools
    pub publish_retry: RetryPolicy,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ToolSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.openrouter.model.clone(),
            image_model: config.openrouter.image_model.clone(),
            features: config.features.clone(),
            history_limit: config.agent.history_limit,
            assets_dir: config.agent.assets_dir.clone(),
            publish_retry: RetryPolicy::new(
                config.agent.publish_attempts,
                Duration::from_millis(config.agent.publish_retry_delay_ms),
            ),
        }
    }

    pub fn image_generation(&self) -> bool {
        self.features.enable_image_generation
    }

    pub fn allow_mentions(&self) -> bool {
        self.features.allow_mentions
    }
}

/// Ambient handles passed by reference into every invocation.
///
/// Cheap to clone. `tools_used` is the per-artifact list the loop maintains;
/// publishing tools persist it with what they publish.
#[derive(Clone)]
pub struct ToolContext {
    pub provider: Arc<dyn Provider>,
    pub social: Arc<dyn SocialClient>,
    pub ledger: Arc<dyn Ledger>,
    pub gate: Arc<CapabilityGate>,
    pub studio: Arc<ImageStudio>,
    pub settings: Arc<ToolSettings>,
    pub tools_used: Vec<String>,
}

impl ToolContext {
    pub fn new(
        provider: Arc<dyn Provider>,
        social: Arc<dyn SocialClient>,
        ledger: Arc<dyn Ledger>,
        gate: Arc<CapabilityGate>,
        settings: ToolSettings,
    ) -> Self {
        let studio = Arc::new(ImageStudio::new(
            provider.clone(),
            settings.image_model.clone(),
            settings.assets_dir.clone(),
            settings.image_generation(),
        ));
        Self {
            provider,
            social,
            ledger,
            gate,
            studio,
            settings: Arc::new(settings),
            tools_used: Vec::new(),
        }
    }

    /// Replace the image studio (e.g. to point at a different provider).
    pub fn with_studio(mut self, studio: ImageStudio) -> Self {
        self.studio = Arc::new(studio);
        self
    }

    /// Same handles, different auxiliary-tool list.
    pub fn with_tools_used(&self, tools_used: Vec<String>) -> Self {
        Self {
            tools_used,
            ..self.clone()
        }
    }
}

/// Something a tool put on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub kind: ActionKind,
    pub external_id: String,
    pub has_media: bool,
}

/// The observation a tool produced.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    /// Text fed back to the model
    pub text: String,
    /// Generated image, for tools that make one
    pub image: Option<Vec<u8>>,
    pub published: Option<Published>,
    /// Set by the terminal tool, carrying the model's reasoning
    pub finished: Option<String>,
}

impl ToolOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            success: false,
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::failure(format!("Error: Unknown tool '{name}'"))
    }

    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.image = Some(bytes);
        self
    }

    pub fn with_published(mut self, published: Published) -> Self {
        self.published = Some(published);
        self
    }
}
