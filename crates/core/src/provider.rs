//! Provider trait - the abstraction over specialist capability providers.
//!
//! A provider is a function from (context bundle, request text) to a typed
//! partial result. Providers are opaque to the engine: the dispatch
//! scheduler launches them concurrently, isolates their failures, and never
//! lets one provider see another's output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bundle::ContextBundle;
use crate::client::ClientProfile;
use crate::composite::{ComplianceReport, DraftMessage, QuantReport, ResearchReport};
use crate::error::ProviderError;
use crate::plan::ProviderName;

/// Condensed client facts the context provider surfaces alongside its draft.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientContextSummary {
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub documents: Vec<String>,
}

/// Output of the relationship-context provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextReport {
    pub summary: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub client_context: ClientContextSummary,
    pub draft_message: DraftMessage,
}

/// A typed partial result from one provider.
///
/// Exactly one variant per registry entry - the aggregator maps variants
/// onto composite slots by name, never by completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum ProviderOutput {
    Context(ContextReport),
    Quant(QuantReport),
    Compliance(ComplianceReport),
    Research(ResearchReport),
}

impl ProviderOutput {
    /// Which provider family produced this output.
    pub fn name(&self) -> ProviderName {
        match self {
            Self::Context(_) => ProviderName::Context,
            Self::Quant(_) => ProviderName::Quant,
            Self::Compliance(_) => ProviderName::Compliance,
            Self::Research(_) => ProviderName::Research,
        }
    }

    /// The output's short summary line, if the variant carries one.
    pub fn summary(&self) -> Option<&str> {
        match self {
            Self::Context(r) => Some(&r.summary),
            Self::Quant(r) => Some(&r.summary),
            Self::Research(r) => Some(&r.summary),
            Self::Compliance(_) => None,
        }
    }
}

/// The core Provider trait.
///
/// Implementations live in `wealthdesk-providers`. The dispatch scheduler
/// calls `run()` without knowing which specialist it is talking to.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Which registry slot this provider fills.
    fn name(&self) -> ProviderName;

    /// Human-readable dispatch description for the lifecycle event
    /// announcing this provider (personalized per client).
    fn describe(&self, profile: &ClientProfile) -> String;

    /// Analyze the shared bundle for the given request text.
    ///
    /// Must not mutate shared state; an `Err` is isolated by the scheduler
    /// and recorded as a failed task.
    async fn run(
        &self,
        bundle: &ContextBundle,
        query: &str,
    ) -> std::result::Result<ProviderOutput, ProviderError>;
}
