//! The fixed-shape composite result ("tri-tiered output").
//!
//! One composite is built per dispatch cycle. Its slot count and slot
//! identity never vary - only slot *contents* do. Each slot carries either
//! a provider's result verbatim or that slot's documented default.

use serde::{Deserialize, Serialize};

/// Quantitative analysis slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantReport {
    /// One-paragraph headline finding, advisor-facing.
    pub summary: String,
    /// Step-by-step breakdown.
    #[serde(default)]
    pub details: String,
    /// Display formula for the UI, LaTeX source.
    #[serde(default)]
    pub latex: String,
}

impl QuantReport {
    /// Default slot value when the quant provider did not run.
    pub fn none() -> Self {
        Self {
            summary: "No calculations needed for this query.".into(),
            details: String::new(),
            latex: String::new(),
        }
    }
}

/// Compliance rollup status - worst severity across items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Clear,
    Warning,
    Error,
}

/// Severity of a single compliance item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceSeverity {
    Info,
    Warning,
    Error,
}

/// One compliance finding with its rule citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceItem {
    pub severity: ComplianceSeverity,
    pub message: String,
    pub rule_citation: String,
}

/// Compliance slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub status: ComplianceStatus,
    #[serde(default)]
    pub items: Vec<ComplianceItem>,
}

impl ComplianceReport {
    /// Default slot value: nothing flagged.
    pub fn clear() -> Self {
        Self {
            status: ComplianceStatus::Clear,
            items: Vec::new(),
        }
    }

    /// Roll the status up from the worst item severity.
    pub fn rollup(items: Vec<ComplianceItem>) -> Self {
        let status = if items.iter().any(|i| i.severity == ComplianceSeverity::Error) {
            ComplianceStatus::Error
        } else if items.iter().any(|i| i.severity == ComplianceSeverity::Warning) {
            ComplianceStatus::Warning
        } else {
            ComplianceStatus::Clear
        };
        Self { status, items }
    }
}

/// Draft client message slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub tone: String,
    /// Which knowledge-base facts informed the draft.
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl DraftMessage {
    /// Default slot value: a generic follow-up skeleton.
    pub fn follow_up(client_name: &str) -> Self {
        Self {
            to: client_name.to_string(),
            subject: "Following up".into(),
            body: "I wanted to follow up on our conversation.".into(),
            tone: "Warm + Professional".into(),
            highlights: Vec::new(),
        }
    }
}

/// One suggested investment product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentSuggestion {
    pub ticker: String,
    pub name: String,
    pub asset_class: String,
    pub rationale: String,
}

/// One market data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketIndicator {
    pub label: String,
    pub value: f64,
    pub change_pct: f64,
}

/// Investment research slot. Unlike the other slots this one has no
/// synthetic default - an absent result is represented as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchReport {
    pub summary: String,
    #[serde(default)]
    pub suggestions: Vec<InvestmentSuggestion>,
    #[serde(default)]
    pub market: Vec<MarketIndicator>,
}

/// The fixed-shape aggregate returned for one dispatch cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    pub numbers: QuantReport,
    pub compliance: ComplianceReport,
    pub draft_message: DraftMessage,
    pub research: Option<ResearchReport>,
}

impl CompositeResult {
    /// The all-defaults composite for a client - what a cycle in which no
    /// provider ran (or every provider failed) produces.
    pub fn defaults(client_name: &str) -> Self {
        Self {
            numbers: QuantReport::none(),
            compliance: ComplianceReport::clear(),
            draft_message: DraftMessage::follow_up(client_name),
            research: None,
        }
    }
}
