//! Domain event system: decoupled notifications between bounded contexts.
//!
//! The agent publishes events as it works; the gateway and logs can
//! subscribe without the loop knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use crate::ledger::ActionKind;
use crate::tier::Tier;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A tool was executed within a cycle
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A post or reply went out
    ActionPublished {
        kind: ActionKind,
        external_id: String,
        has_media: bool,
        timestamp: DateTime<Utc>,
    },

    /// A cycle reached a terminal state
    CycleCompleted {
        mode: String,
        success: bool,
        published: u32,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Tier detection changed the known tier
    TierChanged {
        from: Option<Tier>,
        to: Tier,
        timestamp: DateTime<Utc>,
    },

    /// An error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        if let Ok(receivers) = self.sender.send(Arc::new(event)) {
            tracing::trace!(receivers, "Event published");
        }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
