//! Ledger trait: the durable record of published actions and inbound mentions.
//!
//! The ledger is both the system of record and the model's memory: every
//! cycle reads a bounded window of it to avoid repeating itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::LedgerError;

/// Rendered by `recent_actions_context` when nothing was published yet.
pub const NO_ACTIONS: &str = "No previous actions.";

/// Rendered by `recent_replies_context` when no mention was answered yet.
pub const NO_REPLIES: &str = "No previous mention replies.";

/// Rendered by `conversation_history` when the author was never answered.
pub const NO_CONVERSATIONS: &str = "No previous conversations with this user.";

/// What kind of artifact an action published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Post,
    Reply,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Post => "post",
            ActionKind::Reply => "reply",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "post" => Some(ActionKind::Post),
            "reply" => Some(ActionKind::Reply),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disposition of an inbound mention. Leaves `Pending` at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Pending,
    Ignored,
    Replied,
}

impl Disposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Disposition::Pending => "pending",
            Disposition::Ignored => "ignored",
            Disposition::Replied => "replied",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Disposition::Pending),
            "ignored" => Some(Disposition::Ignored),
            "replied" => Some(Disposition::Replied),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Disposition::Pending)
    }
}

/// An action about to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAction {
    pub kind: ActionKind,
    pub text: String,
    pub external_id: Option<String>,
    pub has_media: bool,
    pub reply_target_id: Option<String>,
    pub reply_target_author: Option<String>,
}

impl NewAction {
    pub fn post(text: impl Into<String>, external_id: impl Into<String>, has_media: bool) -> Self {
        Self {
            kind: ActionKind::Post,
            text: text.into(),
            external_id: Some(external_id.into()),
            has_media,
            reply_target_id: None,
            reply_target_author: None,
        }
    }

    pub fn reply(
        text: impl Into<String>,
        external_id: impl Into<String>,
        has_media: bool,
        target_id: impl Into<String>,
        target_author: impl Into<String>,
    ) -> Self {
        Self {
            kind: ActionKind::Reply,
            text: text.into(),
            external_id: Some(external_id.into()),
            has_media,
            reply_target_id: Some(target_id.into()),
            reply_target_author: Some(target_author.into()),
        }
    }

    /// Check the reply-target invariant: present and non-empty iff `kind = reply`.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let has_target = self
            .reply_target_id
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        match (self.kind, has_target) {
            (ActionKind::Reply, false) => Err(LedgerError::InvalidRecord(
                "reply action requires a reply_target_id".into(),
            )),
            (ActionKind::Post, true) => Err(LedgerError::InvalidRecord(
                "post action cannot carry a reply_target_id".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Terminal state for a mention, as handed to `finalize_mention`.
///
/// Author fields are only used when no row exists yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionOutcome {
    pub external_id: String,
    pub disposition: Disposition,
    pub reply_text: Option<String>,
    pub tools_used: Vec<String>,
    pub author_handle: Option<String>,
    pub author_text: Option<String>,
}

impl MentionOutcome {
    pub fn replied(external_id: impl Into<String>, reply_text: impl Into<String>, tools_used: Vec<String>) -> Self {
        Self {
            external_id: external_id.into(),
            disposition: Disposition::Replied,
            reply_text: Some(reply_text.into()),
            tools_used,
            author_handle: None,
            author_text: None,
        }
    }

    pub fn ignored(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            disposition: Disposition::Ignored,
            reply_text: None,
            tools_used: Vec::new(),
            author_handle: None,
            author_text: None,
        }
    }

    pub fn with_author(mut self, handle: impl Into<String>, text: impl Into<String>) -> Self {
        self.author_handle = Some(handle.into());
        self.author_text = Some(text.into());
        self
    }
}

/// Aggregate counters for introspection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub posts_total: u64,
    pub posts_today: u64,
    pub replies_total: u64,
    pub replies_today: u64,
    pub mentions_total: u64,
    pub mentions_today: u64,
    pub last_action_at: Option<DateTime<Utc>>,
    pub last_mention_at: Option<DateTime<Utc>>,
}

/// The store behind the agent's memory.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Append an action. Never updates an existing row. Returns the row id.
    async fn record_action(&self, action: &NewAction) -> Result<i64, LedgerError>;

    /// The most recent `limit` actions, oldest first, one numbered line each.
    async fn recent_actions_context(&self, limit: usize) -> Result<String, LedgerError>;

    /// The most recent `limit` answered mentions, oldest first, each with the reply.
    async fn recent_replies_context(&self, limit: usize) -> Result<String, LedgerError>;

    /// Whether a mention is known. Pending rows only count with `include_pending`.
    async fn mention_exists(&self, external_id: &str, include_pending: bool) -> Result<bool, LedgerError>;

    /// Insert a pending mention if absent; otherwise leave the row untouched.
    async fn upsert_pending_mention(
        &self,
        external_id: &str,
        author_handle: &str,
        author_text: &str,
    ) -> Result<(), LedgerError>;

    /// Move a mention to its terminal disposition, creating it if absent.
    async fn finalize_mention(&self, outcome: &MentionOutcome) -> Result<(), LedgerError>;

    /// Actions of `kind` recorded since the start of the current UTC day.
    async fn count_today(&self, kind: ActionKind) -> Result<u32, LedgerError>;

    /// Replied exchanges with `author_handle`, oldest first.
    async fn conversation_history(&self, author_handle: &str, limit: usize) -> Result<String, LedgerError>;

    async fn get_state(&self, key: &str) -> Result<Option<String>, LedgerError>;

    async fn set_state(&self, key: &str, value: &str) -> Result<(), LedgerError>;

    async fn stats(&self) -> Result<LedgerStats, LedgerError>;

    /// Cheap liveness probe.
    async fn ping(&self) -> Result<(), LedgerError>;
}
