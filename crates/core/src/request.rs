//! The per-request envelope.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One inbound advisor request, created per `submit_request` frame and
/// discarded when the response cycle completes. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// The client the request is about.
    pub client_id: String,
    /// The advisor's free-text request.
    pub text: String,
    /// Correlates every event emitted during this cycle.
    pub correlation_id: String,
}

impl RequestEnvelope {
    /// Build an envelope with a fresh correlation id.
    pub fn new(client_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            text: text.into(),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }
}
