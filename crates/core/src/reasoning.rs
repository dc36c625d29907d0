//! Reasoning trait - the abstraction over the external reasoning call.
//!
//! The engine uses one narrow capability in three roles: request
//! classification, deletion matching, and narrative synthesis. Every call
//! site defines its own fallback value, so a failing backend degrades
//! behavior but never surfaces an error to the advisor.

use async_trait::async_trait;

use crate::error::ReasoningError;

/// An external reasoning call: `complete(instructions, payload)` returns
/// raw text (possibly JSON the caller parses).
///
/// Retry/backoff policy is an implementation concern of the backend, never
/// part of the orchestration core's correctness contract.
#[async_trait]
pub trait Reasoning: Send + Sync {
    /// A human-readable name for this backend (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Send system instructions plus a user payload, get text back.
    async fn complete(
        &self,
        instructions: &str,
        payload: &str,
    ) -> std::result::Result<String, ReasoningError>;
}
