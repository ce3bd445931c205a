//! # Murmur Core
//!
//! Domain types, traits, and error definitions for the murmur posting agent.
//! This crate has **no framework dependencies**: it defines the model that
//! every adapter and loop crate implements against.
//!
//! ## Layout
//!
//! Each external collaborator (model, social platform, store) is a trait here.
//! Implementations live in their own crates, which keeps the agent loop
//! testable with in-process fakes and keeps the dependency graph pointing
//! inward on core.

pub mod error;
pub mod message;
pub mod provider;
pub mod social;
pub mod ledger;
pub mod tier;
pub mod tool;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, LedgerError, ProviderError, Result, SocialError, ToolError};
pub use message::{Conversation, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat, Usage};
pub use social::{InboundMention, Profile, SocialClient};
pub use ledger::{ActionKind, Disposition, Ledger, LedgerStats, MentionOutcome, NewAction};
pub use tier::{Tier, TierLimits};
pub use tool::{Mode, ParamSpec, ToolDescriptor, ToolName};
pub use event::{DomainEvent, EventBus};
