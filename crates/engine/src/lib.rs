//! # WealthDesk Engine
//!
//! The query-routing and multi-provider orchestration core:
//!
//! 1. assemble a per-request [`wealthdesk_core::ContextBundle`]
//! 2. classify the request into an action plan (fast paths first, then the
//!    reasoning call, then the conservative dispatch-all fallback)
//! 3. mutate the knowledge base when the plan calls for it
//! 4. fan out concurrently to the chosen providers, streaming lifecycle
//!    events and isolating per-provider failure
//! 5. aggregate the result map into the fixed-shape composite plus a short
//!    advisor-facing narrative
//!
//! Nothing in this crate is fatal: every failure path resolves to a
//! well-formed event sent back over the channel.

pub mod aggregate;
pub mod assembler;
pub mod classifier;
pub mod dispatch;
pub mod knowledge;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregate::Aggregator;
pub use assembler::ContextAssembler;
pub use classifier::IntentClassifier;
pub use dispatch::DispatchScheduler;
pub use knowledge::KnowledgeMutator;
pub use orchestrator::Orchestrator;
