//! Investment research provider: suggests suitable products for the
//! client's risk profile and attaches a market snapshot relevant to the
//! query.
//!
//! Market figures are a static snapshot refreshed out of band; suggestion
//! shelves are keyed by risk profile.

use async_trait::async_trait;

use wealthdesk_core::bundle::ContextBundle;
use wealthdesk_core::client::ClientProfile;
use wealthdesk_core::composite::{InvestmentSuggestion, MarketIndicator, ResearchReport};
use wealthdesk_core::error::ProviderError;
use wealthdesk_core::plan::ProviderName;
use wealthdesk_core::provider::{Provider, ProviderOutput};

struct Indicator {
    key: &'static str,
    label: &'static str,
    value: f64,
    change_pct: f64,
}

const MARKET_SNAPSHOT: [Indicator; 6] = [
    Indicator { key: "sp500", label: "S&P 500", value: 5892.34, change_pct: 0.42 },
    Indicator { key: "tsx", label: "S&P/TSX Composite", value: 24156.78, change_pct: -0.18 },
    Indicator { key: "cad_usd", label: "CAD/USD", value: 0.7342, change_pct: -0.05 },
    Indicator { key: "boc_rate", label: "BoC Policy Rate", value: 4.50, change_pct: 0.0 },
    Indicator { key: "cpi_yoy", label: "CPI YoY (Canada)", value: 2.8, change_pct: -0.1 },
    Indicator { key: "oil_wti", label: "WTI Crude", value: 78.45, change_pct: 1.2 },
];

fn indicator(key: &str) -> MarketIndicator {
    let found = MARKET_SNAPSHOT
        .iter()
        .find(|i| i.key == key)
        .unwrap_or(&MARKET_SNAPSHOT[0]);
    MarketIndicator {
        label: found.label.into(),
        value: found.value,
        change_pct: found.change_pct,
    }
}

/// Suggestion shelf per risk profile.
fn shelf(risk_profile: &str) -> Vec<InvestmentSuggestion> {
    let rows: &[(&str, &str, &str, &str)] = match risk_profile {
        "conservative" => &[
            ("ZAG", "BMO Aggregate Bond Index ETF", "fixed income", "Broad Canadian bond exposure with low fees"),
            ("XSB", "iShares Core Canadian Short Term Bond ETF", "fixed income", "Short duration limits rate sensitivity"),
            ("GIC-1Y", "1-year insured GIC ladder", "cash equivalent", "Capital preservation with a known yield"),
        ],
        "growth" => &[
            ("XEQT", "iShares Core Equity ETF Portfolio", "equity", "One-ticket global equity for a long horizon"),
            ("VFV", "Vanguard S&P 500 Index ETF", "us equity", "Low-cost US large-cap core"),
            ("XIC", "iShares Core S&P/TSX Capped Composite", "canadian equity", "Domestic core with dividend support"),
        ],
        "aggressive" => &[
            ("XEQT", "iShares Core Equity ETF Portfolio", "equity", "Full equity allocation, globally diversified"),
            ("ZQQ", "BMO Nasdaq 100 Equity Hedged ETF", "us growth equity", "Concentrated growth exposure, CAD-hedged"),
            ("XEC", "iShares Core MSCI Emerging Markets ETF", "emerging markets", "Higher-risk sleeve for long horizons"),
        ],
        // balanced and anything unrecognized
        _ => &[
            ("VBAL", "Vanguard Balanced ETF Portfolio", "balanced", "60/40 one-ticket core"),
            ("XGRO", "iShares Core Growth ETF Portfolio", "balanced growth", "80/20 tilt when the horizon allows"),
            ("ZAG", "BMO Aggregate Bond Index ETF", "fixed income", "Ballast for the fixed-income sleeve"),
        ],
    };
    rows.iter()
        .map(|(ticker, name, asset_class, rationale)| InvestmentSuggestion {
            ticker: (*ticker).into(),
            name: (*name).into(),
            asset_class: (*asset_class).into(),
            rationale: (*rationale).into(),
        })
        .collect()
}

/// The investment research specialist.
pub struct ResearchProvider;

#[async_trait]
impl Provider for ResearchProvider {
    fn name(&self) -> ProviderName {
        ProviderName::Research
    }

    fn describe(&self, profile: &ClientProfile) -> String {
        format!(
            "Researching suitable investments for {}'s {} profile",
            profile.name, profile.risk_profile
        )
    }

    async fn run(
        &self,
        bundle: &ContextBundle,
        query: &str,
    ) -> Result<ProviderOutput, ProviderError> {
        let q = query.to_lowercase();
        let risk = bundle.profile.risk_profile.as_str();

        let mut market = Vec::new();
        if ["rate", "mortgage", "interest", "bond"].iter().any(|kw| q.contains(kw)) {
            market.push(indicator("boc_rate"));
        }
        if ["stock", "etf", "portfolio", "equity", "market"].iter().any(|kw| q.contains(kw)) {
            market.push(indicator("sp500"));
            market.push(indicator("tsx"));
        }
        if ["oil", "energy"].iter().any(|kw| q.contains(kw)) {
            market.push(indicator("oil_wti"));
        }
        if ["inflation", "cpi", "price"].iter().any(|kw| q.contains(kw)) {
            market.push(indicator("cpi_yoy"));
        }
        if market.is_empty() {
            market.push(indicator("tsx"));
            market.push(indicator("boc_rate"));
        }

        let suggestions = shelf(risk);
        let tickers: Vec<&str> = suggestions.iter().map(|s| s.ticker.as_str()).collect();

        Ok(ProviderOutput::Research(ResearchReport {
            summary: format!(
                "For a {risk} profile, I'd anchor on {} — sized against existing holdings and \
                 contribution room.",
                tickers.join(", ")
            ),
            suggestions,
            market,
        }))
    }
}
