//! Getting an artifact onto the platform despite transient failures.
//!
//! Shared by the publishing tools and the agent's batch flows.

use murmur_core::error::SocialError;
use murmur_core::social::SocialClient;
use std::time::Duration;
use tracing::{error, info, warn};

/// Where a publish goes.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Post,
    Reply { to: &'a str },
}

/// Fixed-delay retry for publish calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

async fn send(social: &dyn SocialClient, text: &str, target: Target<'_>, media: Option<&str>) -> Result<String, SocialError> {
    match target {
        Target::Post => social.post(text, media).await,
        Target::Reply { to } => social.reply(text, to, media).await,
    }
}

/// Publish `text`, retrying transient failures up to the policy's bound.
/// Non-transient failures return at once.
pub async fn publish_with_retry(
    social: &dyn SocialClient,
    text: &str,
    target: Target<'_>,
    media: Option<&str>,
    policy: RetryPolicy,
) -> Result<String, SocialError> {
    let mut attempt = 1;
    loop {
        match send(social, text, target, media).await {
            Ok(id) => {
                info!(%id, attempt, "Published");
                return Ok(id);
            }
            Err(e) if e.is_transient() && attempt < policy.attempts => {
                warn!(attempt, of = policy.attempts, error = %e, "Publish failed, retrying");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(attempt, error = %e, "Publish failed");
                return Err(e);
            }
        }
    }
}

/// Upload generated media. A failed upload means publishing without it.
pub async fn upload(social: &dyn SocialClient, image: Option<&[u8]>) -> Option<String> {
    let bytes = image?;
    match social.upload_media(bytes).await {
        Ok(media_id) => {
            info!(%media_id, size = bytes.len(), "Image uploaded");
            Some(media_id)
        }
        Err(e) => {
            error!(error = %e, "Image upload failed, publishing without it");
            None
        }
    }
}
