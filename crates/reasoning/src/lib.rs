//! # WealthDesk Reasoning
//!
//! Client for the external reasoning call used by the orchestration engine
//! in three roles: request classification, deletion matching, and narrative
//! synthesis. Every call site in the engine carries its own fallback, so a
//! failing backend degrades behavior but never surfaces to the advisor.

pub mod anthropic;
pub mod json;

pub use anthropic::AnthropicReasoning;
pub use json::parse_json_reply;
