//! SocialClient trait: the abstraction over the microblogging platform.
//!
//! Every call may fail with a [`SocialError`]. The publish path retries
//! transient failures; reads are never retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::SocialError;

/// An inbound mention as fetched from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMention {
    /// Platform-assigned post ID
    pub id: String,

    /// Handle of the author, without the leading `@`
    pub author: String,

    /// The mention's text
    pub text: String,
}

/// Public profile of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub bio: String,
    pub followers: u64,
    pub following: u64,
    pub post_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// The platform operations the agent relies on.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Platform name for logs (e.g., "twitter").
    fn name(&self) -> &str;

    /// Publish a top-level post. Returns the new post ID.
    async fn post(&self, text: &str, media_id: Option<&str>) -> Result<String, SocialError>;

    /// Publish a reply to `target_id`. Returns the new post ID.
    async fn reply(&self, text: &str, target_id: &str, media_id: Option<&str>) -> Result<String, SocialError>;

    /// Upload raw image bytes. Returns a media ID usable by `post`/`reply`.
    async fn upload_media(&self, bytes: &[u8]) -> Result<String, SocialError>;

    /// Fetch mentions of the authenticated account, newer than `since_id` if given.
    async fn get_mentions(&self, since_id: Option<&str>) -> Result<Vec<InboundMention>, SocialError>;

    /// Look up a public profile. `Ok(None)` when the account does not exist.
    async fn get_profile(&self, username: &str) -> Result<Option<Profile>, SocialError>;
}
