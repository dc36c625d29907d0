//! Provider registry names and the classifier's action plan.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The fixed registry of specialist providers.
///
/// This is a closed set: the composite result has exactly one slot per
/// family, and the dispatch scheduler announces providers in the order
/// listed by [`ProviderName::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderName {
    /// Relationship-context synthesis and draft messaging.
    Context,
    /// Quantitative calculation (tax, contributions, projections).
    Quant,
    /// Regulatory-compliance checks.
    Compliance,
    /// Investment research and asset allocation.
    Research,
}

impl ProviderName {
    /// Registry order - also the announcement order for dispatch events.
    pub const ALL: [ProviderName; 4] = [
        ProviderName::Context,
        ProviderName::Quant,
        ProviderName::Compliance,
        ProviderName::Research,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Quant => "quant",
            Self::Compliance => "compliance",
            Self::Research => "research",
        }
    }

    /// Parse a provider name; unknown names yield `None` (the classifier
    /// drops them rather than erroring).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "context" => Some(Self::Context),
            "quant" => Some(Self::Quant),
            "compliance" => Some(Self::Compliance),
            // The reasoning call sometimes says "researcher".
            "research" | "researcher" => Some(Self::Research),
            _ => None,
        }
    }

    /// The complete provider set, used as the conservative fallback plan.
    pub fn full_set() -> BTreeSet<ProviderName> {
        Self::ALL.iter().copied().collect()
    }
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the engine should do with one inbound request.
///
/// Produced once per request by the intent classifier; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPlan {
    /// Answer directly from the context bundle - no providers.
    DirectAnswer,
    /// Add the given entries to the client's knowledge base.
    KnowledgeAdd { entries: Vec<String> },
    /// Remove entries matching the given keyword phrases.
    KnowledgeRemove { keywords: Vec<String> },
    /// Fan out to the given provider subset.
    Dispatch { providers: BTreeSet<ProviderName> },
}

impl ActionPlan {
    /// The conservative, maximal-information fallback: dispatch everything.
    pub fn dispatch_all() -> Self {
        Self::Dispatch {
            providers: ProviderName::full_set(),
        }
    }
}
