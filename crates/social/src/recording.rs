//! An in-process [`SocialClient`] that publishes nothing.
//!
//! Every post, reply and upload is recorded instead of sent. Mentions and
//! profiles are served from what was seeded. Publishing can be told to fail
//! transiently a number of times to exercise retry paths.

use async_trait::async_trait;
use murmur_core::error::SocialError;
use murmur_core::ledger::ActionKind;
use murmur_core::social::{InboundMention, Profile, SocialClient};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// One publish call the client accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRecord {
    pub kind: ActionKind,
    pub id: String,
    pub text: String,
    pub target_id: Option<String>,
    pub media_id: Option<String>,
}

#[derive(Default)]
struct State {
    published: Vec<PublishedRecord>,
    uploads: usize,
    publish_attempts: usize,
    mentions: Vec<InboundMention>,
    mention_fetches: usize,
    profiles: HashMap<String, Profile>,
    fail_publishes: u32,
    fail_all_publishes: bool,
    next_id: u64,
}

#[derive(Default)]
pub struct RecordingClient {
    state: Mutex<State>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Serve these mentions from `get_mentions`.
    pub fn with_mentions(self, mentions: Vec<InboundMention>) -> Self {
        self.state().mentions = mentions;
        self
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        self.state()
            .profiles
            .insert(profile.username.to_ascii_lowercase(), profile);
        self
    }

    /// Make the next `n` publish calls fail with a transient error.
    pub fn failing_publishes(self, n: u32) -> Self {
        self.state().fail_publishes = n;
        self
    }

    /// Make every publish call fail with a transient error.
    pub fn always_failing(self) -> Self {
        self.state().fail_all_publishes = true;
        self
    }

    /// Everything published so far, in order.
    pub fn published(&self) -> Vec<PublishedRecord> {
        self.state().published.clone()
    }

    pub fn upload_count(&self) -> usize {
        self.state().uploads
    }

    /// Publish calls made, including failed ones.
    pub fn publish_attempts(&self) -> usize {
        self.state().publish_attempts
    }

    pub fn mention_fetches(&self) -> usize {
        self.state().mention_fetches
    }

    fn record(&self, kind: ActionKind, text: &str, target_id: Option<&str>, media_id: Option<&str>) -> Result<String, SocialError> {
        let mut state = self.state();
        state.publish_attempts += 1;
        if state.fail_all_publishes {
            return Err(SocialError::Transient("recording client set to fail".into()));
        }
        if state.fail_publishes > 0 {
            state.fail_publishes -= 1;
            return Err(SocialError::Transient("recording client injected failure".into()));
        }
        state.next_id += 1;
        let id = format!("dry-{}", state.next_id);
        state.published.push(PublishedRecord {
            kind,
            id: id.clone(),
            text: text.to_string(),
            target_id: target_id.map(String::from),
            media_id: media_id.map(String::from),
        });
        info!(kind = %kind, id = %id, text = %text, "Dry run: recorded publish");
        Ok(id)
    }
}

#[async_trait]
impl SocialClient for RecordingClient {
    fn name(&self) -> &str {
        "recording"
    }

    async fn post(&self, text: &str, media_id: Option<&str>) -> Result<String, SocialError> {
        self.record(ActionKind::Post, text, None, media_id)
    }

    async fn reply(&self, text: &str, target_id: &str, media_id: Option<&str>) -> Result<String, SocialError> {
        self.record(ActionKind::Reply, text, Some(target_id), media_id)
    }

    async fn upload_media(&self, bytes: &[u8]) -> Result<String, SocialError> {
        let mut state = self.state();
        state.uploads += 1;
        Ok(format!("media-{}-{}", state.uploads, bytes.len()))
    }

    async fn get_mentions(&self, since_id: Option<&str>) -> Result<Vec<InboundMention>, SocialError> {
        let mut state = self.state();
        state.mention_fetches += 1;
        let since: Option<u64> = since_id.and_then(|s| s.parse().ok());
        Ok(state
            .mentions
            .iter()
            .filter(|m| match (since, m.id.parse::<u64>()) {
                (Some(since), Ok(id)) => id > since,
                _ => true,
            })
            .cloned()
            .collect())
    }

    async fn get_profile(&self, username: &str) -> Result<Option<Profile>, SocialError> {
        let key = username.trim_start_matches('@').to_ascii_lowercase();
        Ok(self.state().profiles.get(&key).cloned())
    }
}
