//! Quantitative provider: Canadian tax and contribution arithmetic.
//!
//! Picks an analysis by query keywords (first match wins), computes against
//! the client's accounts and income, and returns a report with a summary,
//! step-by-step details, and a display formula.

use async_trait::async_trait;

use wealthdesk_core::bundle::ContextBundle;
use wealthdesk_core::client::{Account, ClientProfile};
use wealthdesk_core::composite::QuantReport;
use wealthdesk_core::error::ProviderError;
use wealthdesk_core::plan::ProviderName;
use wealthdesk_core::provider::{Provider, ProviderOutput};

use crate::money::{fmt_dollars, fmt_pct};

pub const RRSP_LIMIT_2024: f64 = 31_560.0;
pub const RESP_CESG_MATCH_RATE: f64 = 0.20;
pub const RESP_CESG_ANNUAL_MAX: f64 = 500.0;
pub const RESP_CESG_CONTRIBUTION_FOR_MAX: f64 = 2_500.0;

/// Estimate the combined federal + average provincial marginal rate from
/// employment income, using the 2024 federal brackets.
pub fn estimate_marginal_rate(income: f64) -> f64 {
    let federal: f64 = if income <= 55_867.0 {
        0.15
    } else if income <= 111_733.0 {
        0.205
    } else if income <= 173_675.0 {
        0.26
    } else if income <= 235_699.0 {
        0.29
    } else {
        0.33
    };
    let provincial_avg = federal * 0.55;
    ((federal + provincial_avg) * 100.0).round() / 100.0
}

/// The quant specialist.
pub struct QuantProvider;

#[async_trait]
impl Provider for QuantProvider {
    fn name(&self) -> ProviderName {
        ProviderName::Quant
    }

    fn describe(&self, profile: &ClientProfile) -> String {
        format!(
            "Running financial calculations on {}'s accounts and tax situation",
            profile.name
        )
    }

    async fn run(
        &self,
        bundle: &ContextBundle,
        query: &str,
    ) -> Result<ProviderOutput, ProviderError> {
        let q = query.to_lowercase();
        let first_name = bundle.profile.first_name();

        let report = if contains_any(&q, &["mortgage", "fhsa", "home", "first home"]) {
            mortgage_vs_fhsa(first_name, bundle)
        } else if contains_any(&q, &["rrsp", "contribution room", "contribution"]) {
            rrsp_analysis(first_name, bundle)
        } else if contains_any(&q, &["resp", "cesg", "education", "grant"]) {
            resp_cesg_analysis(first_name, bundle)
        } else if contains_any(&q, &["portfolio", "review", "drift", "rebalance"]) {
            portfolio_review(first_name, bundle)
        } else if contains_any(&q, &["tfsa", "compare", "student loan", "loan"]) {
            tfsa_vs_rrsp(first_name, bundle)
        } else if contains_any(&q, &["tax", "bracket", "salary", "dividend"]) {
            tax_overview(first_name, bundle)
        } else {
            general_overview(first_name, bundle)
        };

        Ok(ProviderOutput::Quant(report))
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn room(bundle: &ContextBundle, kind: &str) -> f64 {
    bundle.account(kind).map(|a| a.contribution_room).unwrap_or(0.0)
}

fn balance(bundle: &ContextBundle, kind: &str) -> f64 {
    bundle.account(kind).map(|a| a.balance).unwrap_or(0.0)
}

fn mortgage_vs_fhsa(first_name: &str, bundle: &ContextBundle) -> QuantReport {
    let fhsa_room = room(bundle, "FHSA");
    let rrsp_room = room(bundle, "RRSP");
    let idle_cash = balance(bundle, "checking");
    let income = bundle.profile.employment_income;
    let rate = estimate_marginal_rate(income);

    let fhsa_tax_savings = fhsa_room * rate;
    let rrsp_tax_savings = if idle_cash > fhsa_room {
        (idle_cash - fhsa_room).min(rrsp_room) * rate
    } else {
        0.0
    };
    let remaining = (idle_cash - fhsa_room - rrsp_room).max(0.0);

    QuantReport {
        summary: format!(
            "For {first_name}, maxing the FHSA first ({}) is the clear winner. It gives a {} \
             tax deduction now, tax-free growth, AND tax-free withdrawal for a home purchase. \
             No other account offers all three.",
            fmt_dollars(fhsa_room),
            fmt_dollars(fhsa_tax_savings)
        ),
        details: format!(
            "Step 1: Contribute {} to FHSA -> {} tax refund at {} marginal rate\n\
             Step 2: Consider RRSP contribution ({} room available) -> additional {} tax savings\n\
             Step 3: Remaining cash ({}) for emergency fund or mortgage down payment\n\n\
             FHSA advantage over RRSP for home buyers: the FHSA is deductible going in and \
             tax-free coming out for a home purchase, while the RRSP Home Buyers' Plan must \
             be repaid over 15 years.",
            fmt_dollars(fhsa_room),
            fmt_dollars(fhsa_tax_savings),
            fmt_pct(rate),
            fmt_dollars(rrsp_room),
            fmt_dollars(rrsp_tax_savings),
            fmt_dollars(remaining),
        ),
        latex: r"FV = PV \times (1 + r)^n \quad \text{Tax savings} = \text{Contribution} \times \text{Marginal Rate}".into(),
    }
}

fn rrsp_analysis(first_name: &str, bundle: &ContextBundle) -> QuantReport {
    let rrsp_room = room(bundle, "RRSP");
    let rrsp_balance = balance(bundle, "RRSP");
    let income = bundle.profile.employment_income;
    let rate = estimate_marginal_rate(income);
    let tax_savings = rrsp_room * rate;

    QuantReport {
        summary: format!(
            "{first_name} has {} in RRSP contribution room. A full contribution would save {} \
             in taxes at the {} marginal rate. RRSP deadline is March 1.",
            fmt_dollars(rrsp_room),
            fmt_dollars(tax_savings),
            fmt_pct(rate)
        ),
        details: format!(
            "Current RRSP balance: {}\nAvailable room: {}\nEmployment income: {}\n\
             Estimated marginal rate: {}\nTax savings from max contribution: {}\n\n\
             Note: the RRSP deduction limit for 2024 is {}. Room is 18% of prior year \
             earned income, less pension adjustment.",
            fmt_dollars(rrsp_balance),
            fmt_dollars(rrsp_room),
            fmt_dollars(income),
            fmt_pct(rate),
            fmt_dollars(tax_savings),
            fmt_dollars(RRSP_LIMIT_2024),
        ),
        latex: r"\text{Tax Savings} = \text{Contribution Room} \times \text{Marginal Tax Rate}".into(),
    }
}

fn resp_cesg_analysis(first_name: &str, bundle: &ContextBundle) -> QuantReport {
    let resp_balance = balance(bundle, "RESP");
    let children = bundle.profile.dependents.max(1) as f64;
    let optimal_contribution = RESP_CESG_CONTRIBUTION_FOR_MAX * children;
    let cesg = RESP_CESG_ANNUAL_MAX * children;

    QuantReport {
        summary: format!(
            "To maximize the CESG, {first_name} should contribute {} per year ({} per child). \
             That unlocks {} in government grants this year.",
            fmt_dollars(optimal_contribution),
            fmt_dollars(RESP_CESG_CONTRIBUTION_FOR_MAX),
            fmt_dollars(cesg)
        ),
        details: format!(
            "RESP balance: {}\nBeneficiaries: {}\nCESG match rate: {} on first {} per child \
             per year\nOptimal contribution: {}\nCESG received: {}\n\nLifetime CESG limit: \
             $7,200 per child; grants are available until the beneficiary turns 17.",
            fmt_dollars(resp_balance),
            children as u32,
            fmt_pct(RESP_CESG_MATCH_RATE),
            fmt_dollars(RESP_CESG_CONTRIBUTION_FOR_MAX),
            fmt_dollars(optimal_contribution),
            fmt_dollars(cesg),
        ),
        latex: r"\text{CESG} = \min(\$500, \text{Contribution} \times 20\%) \text{ per child per year}".into(),
    }
}

fn portfolio_review(first_name: &str, bundle: &ContextBundle) -> QuantReport {
    let total = bundle.total_portfolio();
    let risk = bundle.profile.risk_profile.as_str();
    let target_equity = match risk {
        "conservative" => 30,
        "growth" => 80,
        "aggressive" => 90,
        _ => 60,
    };

    let breakdown: Vec<String> = bundle
        .accounts
        .iter()
        .map(|a: &Account| format!("  {}: {}", a.kind, fmt_dollars(a.balance)))
        .collect();

    QuantReport {
        summary: format!(
            "{first_name}'s total portfolio is {} with a {risk} risk profile. Target equity \
             allocation is {target_equity}%. I'd review the current allocation for drift.",
            fmt_dollars(total)
        ),
        details: format!(
            "Total portfolio value: {}\nRisk profile: {risk}\nTarget equity: {target_equity}%\n\
             Target fixed income: {}%\n\nAccount breakdown:\n{}",
            fmt_dollars(total),
            100 - target_equity,
            breakdown.join("\n"),
        ),
        latex: r"\text{Target Equity} = \text{Total Portfolio} \times \text{Equity \%}".into(),
    }
}

fn tfsa_vs_rrsp(first_name: &str, bundle: &ContextBundle) -> QuantReport {
    let tfsa_room = room(bundle, "TFSA");
    let rrsp_room = room(bundle, "RRSP");
    let income = bundle.profile.employment_income;
    let rate = estimate_marginal_rate(income);

    let (recommendation, reason) = if income < 55_000.0 {
        (
            "TFSA first",
            format!(
                "At {} income, the marginal rate is only {}. TFSA flexibility wins.",
                fmt_dollars(income),
                fmt_pct(rate)
            ),
        )
    } else if income > 100_000.0 {
        (
            "RRSP first",
            format!(
                "At {} income, the {} marginal rate makes the RRSP deduction very valuable.",
                fmt_dollars(income),
                fmt_pct(rate)
            ),
        )
    } else {
        (
            "Split between both",
            format!(
                "At {} income, both accounts have merit. Consider splitting contributions.",
                fmt_dollars(income)
            ),
        )
    };

    QuantReport {
        summary: format!("For {first_name}: {recommendation}. {reason}"),
        details: format!(
            "TFSA room: {}\nRRSP room: {}\nIncome: {}\nMarginal rate: {}\n\n\
             TFSA: no deduction, but all growth and withdrawals are tax-free.\n\
             RRSP: tax deduction now, withdrawals taxed as income.\n\
             Rule of thumb: RRSP wins when the current marginal rate exceeds the expected \
             retirement rate.",
            fmt_dollars(tfsa_room),
            fmt_dollars(rrsp_room),
            fmt_dollars(income),
            fmt_pct(rate),
        ),
        latex: r"\text{RRSP advantage} = \text{Room} \times (r_{\text{now}} - r_{\text{retirement}})".into(),
    }
}

fn tax_overview(first_name: &str, bundle: &ContextBundle) -> QuantReport {
    let income = bundle.profile.employment_income;
    let rate = estimate_marginal_rate(income);

    QuantReport {
        summary: format!(
            "{first_name}'s employment income of {} puts them at an estimated {} combined \
             marginal rate. Key optimization opportunities depend on their specific situation.",
            fmt_dollars(income),
            fmt_pct(rate)
        ),
        details: format!(
            "Employment income: {}\nEstimated marginal rate: {}\n\n2024 federal brackets:\n  \
             $0 - $55,867: 15%\n  $55,867 - $111,733: 20.5%\n  $111,733 - $173,675: 26%\n  \
             $173,675 - $235,699: 29%\n  $235,699+: 33%",
            fmt_dollars(income),
            fmt_pct(rate),
        ),
        latex: r"T = \sum_{i=1}^{n} r_i \times \min(I - B_{i-1}, B_i - B_{i-1})".into(),
    }
}

fn general_overview(first_name: &str, bundle: &ContextBundle) -> QuantReport {
    let total = bundle.total_portfolio();
    let income = bundle.profile.employment_income;

    let breakdown: Vec<String> = bundle
        .accounts
        .iter()
        .map(|a| format!("  {}: {}", a.kind, fmt_dollars(a.balance)))
        .collect();

    QuantReport {
        summary: format!(
            "Here's an overview for {first_name}: total portfolio {}, income {}. Let me know \
             what specific area you'd like me to dig into.",
            fmt_dollars(total),
            fmt_dollars(income)
        ),
        details: format!(
            "Portfolio: {}\nIncome: {}\nAccounts:\n{}",
            fmt_dollars(total),
            fmt_dollars(income),
            breakdown.join("\n"),
        ),
        latex: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wealthdesk_core::client::ClientProfile;

    fn bundle(income: f64, accounts: &[(&str, f64, f64)]) -> ContextBundle {
        ContextBundle {
            profile: ClientProfile {
                id: "c1".into(),
                name: "Sarah Chen".into(),
                email: None,
                phone: None,
                province: "ON".into(),
                date_of_birth: "1994-06-15".into(),
                risk_profile: "growth".into(),
                goals: vec![],
                marital_status: None,
                dependents: 2,
                employment_income: income,
                employer: None,
                advisor_notes: String::new(),
                onboarded_at: Utc::now(),
            },
            accounts: accounts
                .iter()
                .map(|(kind, balance, room)| Account {
                    id: format!("a-{kind}"),
                    client_id: "c1".into(),
                    kind: (*kind).into(),
                    label: (*kind).into(),
                    balance: *balance,
                    contribution_room: *room,
                    last_updated: Utc::now(),
                })
                .collect(),
            documents: vec![],
            recent_chat: vec![],
            knowledge: vec![],
        }
    }

    #[test]
    fn marginal_rate_brackets() {
        assert_eq!(estimate_marginal_rate(40_000.0), 0.23);
        assert_eq!(estimate_marginal_rate(90_000.0), 0.32);
        assert_eq!(estimate_marginal_rate(150_000.0), 0.40);
        assert_eq!(estimate_marginal_rate(500_000.0), 0.51);
    }

    #[tokio::test]
    async fn fhsa_query_routes_to_mortgage_analysis() {
        let b = bundle(
            145_000.0,
            &[("FHSA", 16_000.0, 8_000.0), ("RRSP", 28_000.0, 18_500.0), ("checking", 23_500.0, 0.0)],
        );
        let out = QuantProvider.run(&b, "Should she max the FHSA before buying a home?").await.unwrap();
        let ProviderOutput::Quant(report) = out else { panic!("wrong variant") };
        assert!(report.summary.contains("FHSA"));
        assert!(report.summary.contains("$8,000"));
    }

    #[tokio::test]
    async fn rrsp_query_reports_room_and_savings() {
        let b = bundle(145_000.0, &[("RRSP", 28_000.0, 18_500.0)]);
        let out = QuantProvider.run(&b, "How much RRSP contribution room is left?").await.unwrap();
        let ProviderOutput::Quant(report) = out else { panic!("wrong variant") };
        assert!(report.summary.contains("$18,500"));
        // 18,500 * 0.40
        assert!(report.summary.contains("$7,400"));
    }

    #[tokio::test]
    async fn resp_query_scales_with_dependents() {
        let b = bundle(90_000.0, &[("RESP", 10_000.0, 0.0)]);
        let out = QuantProvider.run(&b, "What about RESP grants this year?").await.unwrap();
        let ProviderOutput::Quant(report) = out else { panic!("wrong variant") };
        // 2 dependents: 2 x $2,500 contribution, 2 x $500 CESG
        assert!(report.summary.contains("$5,000"));
        assert!(report.summary.contains("$1,000"));
    }

    #[tokio::test]
    async fn unmatched_query_falls_back_to_overview() {
        let b = bundle(90_000.0, &[("TFSA", 5_000.0, 0.0)]);
        let out = QuantProvider.run(&b, "thoughts?").await.unwrap();
        let ProviderOutput::Quant(report) = out else { panic!("wrong variant") };
        assert!(report.summary.contains("overview"));
        assert!(report.latex.is_empty());
    }
}
