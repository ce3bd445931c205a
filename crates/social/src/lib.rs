//! Social platform adapters for murmur.
//!
//! - [`TwitterClient`]: the production client (API v2, OAuth 1.0a user context)
//! - [`RecordingClient`]: an in-process client that records what would have
//!   been published, used for dry runs and tests
//! - [`crc`]: webhook challenge-response token

pub mod crc;
pub mod oauth;
pub mod recording;
pub mod twitter;

pub use crc::crc_response_token;
pub use oauth::OAuth1Signer;
pub use recording::{PublishedRecord, RecordingClient};
pub use twitter::TwitterClient;
