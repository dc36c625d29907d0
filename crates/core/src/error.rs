//! Error types for the WealthDesk domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all WealthDesk operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Record store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Reasoning-call errors ---
    #[error("Reasoning error: {0}")]
    Reasoning(#[from] ReasoningError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

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

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

#[derive(Debug, Clone, Error)]
pub enum ReasoningError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Malformed reasoning output: {0}")]
    Malformed(String),

    #[error("Reasoning backend not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Frame of {size} bytes exceeds the {limit}-byte ceiling")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Session closed: {0}")]
    Closed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Provider {provider} failed: {reason}")]
    Failed { provider: String, reason: String },

    #[error("Provider {provider} aborted before completing")]
    Aborted { provider: String },
}

impl ProviderError {
    /// The provider this error is attributed to.
    pub fn provider(&self) -> &str {
        match self {
            Self::Failed { provider, .. } | Self::Aborted { provider } => provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_displays_correctly() {
        let err = Error::Store(StoreError::NotFound {
            entity: "client",
            id: "c-42".into(),
        });
        assert!(err.to_string().contains("client"));
        assert!(err.to_string().contains("c-42"));
    }

    #[test]
    fn channel_error_displays_limit() {
        let err = Error::Channel(ChannelError::FrameTooLarge {
            size: 100_000,
            limit: 65_536,
        });
        assert!(err.to_string().contains("65536"));
    }

    #[test]
    fn provider_error_attribution() {
        let err = ProviderError::Failed {
            provider: "quant".into(),
            reason: "division by zero".into(),
        };
        assert_eq!(err.provider(), "quant");
    }
}
