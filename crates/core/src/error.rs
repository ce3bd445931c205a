//! Error types for the murmur domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all murmur operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Social platform errors ---
    #[error("Social platform error: {0}")]
    Social(#[from] SocialError),

    // --- Ledger errors ---
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum SocialError {
    #[error("Social client not configured: {0}")]
    NotConfigured(String),

    #[error("Transient platform failure: {0}")]
    Transient(String),

    #[error("Rate limited by platform")]
    RateLimited,

    #[error("Platform rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Platform request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Unexpected platform response: {0}")]
    InvalidResponse(String),
}

impl SocialError {
    /// Whether a publish call that failed this way is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RateLimited)
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool not admissible: {tool_name}: {reason}")]
    NotAdmissible { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::NotAdmissible {
            tool_name: "create_reply".into(),
            reason: "mentions_not_available_on_free_tier".into(),
        });
        assert!(err.to_string().contains("create_reply"));
        assert!(err.to_string().contains("free_tier"));
    }

    #[test]
    fn only_transient_social_errors_retry() {
        assert!(SocialError::Transient("503".into()).is_transient());
        assert!(SocialError::RateLimited.is_transient());
        assert!(!SocialError::Unauthorized("bad token".into()).is_transient());
        assert!(!SocialError::NotFound("user".into()).is_transient());
    }
}
