//! Result aggregation and narrative synthesis.
//!
//! The composite's shape never varies: one slot per provider family, filled
//! verbatim from a successful output or from that slot's documented
//! default. The narrative is built only from slots a real provider
//! populated - defaults are never narrated - with a fixed acknowledgement
//! when nothing ran and a concatenation fallback when the phrasing call
//! fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use wealthdesk_core::bundle::ContextBundle;
use wealthdesk_core::composite::{ComplianceReport, CompositeResult, DraftMessage, QuantReport};
use wealthdesk_core::plan::ProviderName;
use wealthdesk_core::provider::ProviderOutput;
use wealthdesk_core::reasoning::Reasoning;

/// Fixed acknowledgement when no slot is populated.
const GENERIC_ACK: &str =
    "I've looked into this for you. Here's what I found — open the full analysis for details.";

const SYNTHESIS_INSTRUCTIONS: &str = "You are a concise assistant summarizing financial \
analysis for a wealth advisor. Write 2-3 sentences that capture the key insight from the \
provider results below. Be specific with numbers. Speak directly to the advisor. Do NOT \
include greetings. End with a prompt to open the full analysis panel.";

/// Builds composites and narratives from a dispatch cycle's result map.
pub struct Aggregator {
    writer: Arc<dyn Reasoning>,
}

impl Aggregator {
    pub fn new(writer: Arc<dyn Reasoning>) -> Self {
        Self { writer }
    }

    /// Merge the result map into the fixed-shape composite plus narrative.
    pub async fn aggregate(
        &self,
        results: &BTreeMap<ProviderName, ProviderOutput>,
        bundle: &ContextBundle,
        query: &str,
    ) -> (CompositeResult, String) {
        let composite = compose(results, bundle);
        let narrative = self.narrative(results, bundle, query).await;
        (composite, narrative)
    }

    /// Narrate the populated slots. Never narrates over defaults.
    async fn narrative(
        &self,
        results: &BTreeMap<ProviderName, ProviderOutput>,
        bundle: &ContextBundle,
        query: &str,
    ) -> String {
        let mut parts = Vec::new();

        if let Some(ProviderOutput::Quant(report)) = results.get(&ProviderName::Quant) {
            parts.push(format!("QUANT ANALYSIS: {}", report.summary));
        }
        if let Some(ProviderOutput::Context(report)) = results.get(&ProviderName::Context) {
            parts.push(format!("CLIENT CONTEXT: {}", report.summary));
        }
        if let Some(ProviderOutput::Compliance(report)) = results.get(&ProviderName::Compliance) {
            let status = serde_json::to_value(report.status)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_else(|| "clear".into());
            let items: Vec<&str> = report
                .items
                .iter()
                .take(3)
                .map(|i| i.message.as_str())
                .collect();
            parts.push(if items.is_empty() {
                format!("COMPLIANCE: {status}")
            } else {
                format!("COMPLIANCE ({status}): {}", items.join("; "))
            });
        }
        if let Some(ProviderOutput::Research(report)) = results.get(&ProviderName::Research) {
            let tickers: Vec<&str> = report
                .suggestions
                .iter()
                .take(5)
                .map(|s| s.ticker.as_str())
                .collect();
            parts.push(format!(
                "INVESTMENT RESEARCH: {} Suggestions: {}",
                report.summary,
                tickers.join(", ")
            ));
        }

        if parts.is_empty() {
            return GENERIC_ACK.to_string();
        }

        let payload = format!(
            "Advisor asked about client {}: \"{query}\"\n\n{}",
            bundle.profile.name,
            parts.join("\n")
        );

        match self.writer.complete(SYNTHESIS_INSTRUCTIONS, &payload).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Synthesis call failed; concatenating slot summaries");
                let fallback: Vec<&str> = results
                    .values()
                    .filter_map(|output| output.summary())
                    .collect();
                if fallback.is_empty() {
                    GENERIC_ACK.to_string()
                } else {
                    fallback.join(" ")
                }
            }
        }
    }
}

/// Fill each fixed slot from the result map, defaults elsewhere.
pub fn compose(
    results: &BTreeMap<ProviderName, ProviderOutput>,
    bundle: &ContextBundle,
) -> CompositeResult {
    let numbers = match results.get(&ProviderName::Quant) {
        Some(ProviderOutput::Quant(report)) => report.clone(),
        _ => QuantReport::none(),
    };
    let compliance = match results.get(&ProviderName::Compliance) {
        Some(ProviderOutput::Compliance(report)) => report.clone(),
        _ => ComplianceReport::clear(),
    };
    let draft_message = match results.get(&ProviderName::Context) {
        Some(ProviderOutput::Context(report)) => report.draft_message.clone(),
        _ => DraftMessage::follow_up(&bundle.profile.name),
    };
    let research = match results.get(&ProviderName::Research) {
        Some(ProviderOutput::Research(report)) => Some(report.clone()),
        _ => None,
    };

    CompositeResult {
        numbers,
        compliance,
        draft_message,
        research,
    }
}
