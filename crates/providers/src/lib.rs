//! # WealthDesk Providers
//!
//! The four specialist capability providers behind the
//! [`wealthdesk_core::Provider`] trait:
//!
//! - `context` - relationship-context synthesis and draft messaging
//! - `quant` - Canadian tax and contribution arithmetic
//! - `compliance` - CRA/CIRO rule checks
//! - `research` - risk-profile-driven investment suggestions
//!
//! Each provider is a pure function of the shared context bundle and the
//! request text; the engine treats them as opaque and isolates their
//! failures.

pub mod compliance;
pub mod context;
mod money;
pub mod quant;
pub mod registry;
pub mod research;

pub use compliance::ComplianceProvider;
pub use context::ContextProvider;
pub use quant::QuantProvider;
pub use registry::{ProviderRegistry, default_registry};
pub use research::ResearchProvider;
