//! Compliance provider: audits the request context against CRA rules and
//! CIRO suitability requirements.
//!
//! Flags contribution-room anomalies, OAS clawback exposure, RRIF minimum
//! withdrawals, Quebec provincial differences, and prohibited guarantee
//! language. The rollup status is the worst item severity.

use async_trait::async_trait;
use chrono::Utc;

use wealthdesk_core::bundle::ContextBundle;
use wealthdesk_core::client::ClientProfile;
use wealthdesk_core::composite::{ComplianceItem, ComplianceReport, ComplianceSeverity};
use wealthdesk_core::error::ProviderError;
use wealthdesk_core::plan::ProviderName;
use wealthdesk_core::provider::{Provider, ProviderOutput};

use crate::money::fmt_dollars;

pub const RRSP_LIMIT_2024: f64 = 31_560.0;
pub const FHSA_ANNUAL_LIMIT: f64 = 8_000.0;
pub const FHSA_LIFETIME_LIMIT: f64 = 40_000.0;
pub const RESP_CESG_ANNUAL_MAX_PER_CHILD: f64 = 500.0;
pub const OAS_CLAWBACK_THRESHOLD_2024: f64 = 90_997.0;

/// Phrases that must never appear in advice per CIRO suitability rules.
const PROHIBITED_TERMS: [&str; 5] = [
    "guaranteed returns",
    "guaranteed profit",
    "risk-free",
    "no risk",
    "can't lose",
];

/// RRIF minimum withdrawal percentage by age (ascending thresholds).
const RRIF_MIN_PCT: [(u32, f64); 10] = [
    (65, 0.04),
    (66, 0.0417),
    (67, 0.0435),
    (70, 0.05),
    (75, 0.0582),
    (80, 0.0682),
    (85, 0.0851),
    (90, 0.1111),
    (94, 0.1667),
    (95, 0.20),
];

/// RRIF minimum withdrawal percentage for a given age.
pub fn rrif_min_pct(age: u32) -> f64 {
    let mut pct = 0.04;
    for (threshold, value) in RRIF_MIN_PCT {
        if age >= threshold {
            pct = value;
        }
    }
    pct
}

/// The compliance specialist.
pub struct ComplianceProvider;

#[async_trait]
impl Provider for ComplianceProvider {
    fn name(&self) -> ProviderName {
        ProviderName::Compliance
    }

    fn describe(&self, profile: &ClientProfile) -> String {
        format!(
            "Checking CRA rules, CIRO suitability, and regulatory limits for {}",
            profile.name
        )
    }

    async fn run(
        &self,
        bundle: &ContextBundle,
        query: &str,
    ) -> Result<ProviderOutput, ProviderError> {
        let q = query.to_lowercase();
        let mut items = Vec::new();

        let age = bundle.profile.age(Utc::now().date_naive());

        // Contribution room constraints per account
        for account in &bundle.accounts {
            match account.kind.as_str() {
                "RRSP" if account.contribution_room > RRSP_LIMIT_2024 => {
                    items.push(ComplianceItem {
                        severity: ComplianceSeverity::Info,
                        message: format!(
                            "RRSP contribution room ({}) exceeds the 2024 annual limit ({}). \
                             Room carries forward from prior years.",
                            fmt_dollars(account.contribution_room),
                            fmt_dollars(RRSP_LIMIT_2024)
                        ),
                        rule_citation: "ITA 146(1) - RRSP deduction limit".into(),
                    });
                }
                "FHSA"
                    if account.contribution_room > 0.0
                        && (q.contains("fhsa") || q.contains("home")) =>
                {
                    items.push(ComplianceItem {
                        severity: ComplianceSeverity::Info,
                        message: format!(
                            "FHSA annual contribution limit is {}. Available room: {}. \
                             Lifetime limit: {}.",
                            fmt_dollars(FHSA_ANNUAL_LIMIT),
                            fmt_dollars(account.contribution_room),
                            fmt_dollars(FHSA_LIFETIME_LIMIT)
                        ),
                        rule_citation: "ITA 146.6 - Tax-Free First Home Savings Account".into(),
                    });
                }
                "RESP"
                    if q.contains("resp") || q.contains("cesg") || q.contains("education") =>
                {
                    let children = bundle.profile.dependents.max(1);
                    items.push(ComplianceItem {
                        severity: ComplianceSeverity::Info,
                        message: format!(
                            "CESG matches 20% on the first $2,500 per child per year (max {} \
                             per child). With {} beneficiar{}, max annual CESG is {}.",
                            fmt_dollars(RESP_CESG_ANNUAL_MAX_PER_CHILD),
                            children,
                            if children == 1 { "y" } else { "ies" },
                            fmt_dollars(RESP_CESG_ANNUAL_MAX_PER_CHILD * children as f64)
                        ),
                        rule_citation: "Canada Education Savings Act s.5".into(),
                    });
                }
                _ => {}
            }
        }

        // OAS clawback and RRIF minimums for seniors
        if let Some(age) = age.filter(|a| *a >= 65) {
            let mut total_income = bundle.profile.employment_income;
            for account in &bundle.accounts {
                if account.kind == "RRIF" {
                    let pct = rrif_min_pct(age);
                    total_income += account.balance * pct;
                    items.push(ComplianceItem {
                        severity: ComplianceSeverity::Info,
                        message: format!(
                            "RRIF minimum withdrawal for age {age}: {:.2}% of {} = {}.",
                            pct * 100.0,
                            fmt_dollars(account.balance),
                            fmt_dollars(account.balance * pct)
                        ),
                        rule_citation: "ITA 146.3(1) - Minimum RRIF Withdrawal".into(),
                    });
                }
            }
            if total_income > OAS_CLAWBACK_THRESHOLD_2024 {
                items.push(ComplianceItem {
                    severity: ComplianceSeverity::Warning,
                    message: format!(
                        "Estimated total income ({}) exceeds the OAS clawback threshold ({}). \
                         OAS benefits may be reduced.",
                        fmt_dollars(total_income),
                        fmt_dollars(OAS_CLAWBACK_THRESHOLD_2024)
                    ),
                    rule_citation: "ITA 180.2 - OAS Recovery Tax".into(),
                });
            }
        }

        // Quebec provincial note
        if bundle.profile.province == "QC" {
            items.push(ComplianceItem {
                severity: ComplianceSeverity::Info,
                message: "Quebec tax rules apply (Revenu Quebec). Provincial rates differ \
                          from federal and other provinces."
                    .into(),
                rule_citation: "Taxation Act (Quebec) - Provincial income tax".into(),
            });
        }

        // Prohibited guarantee language in the request itself
        for term in PROHIBITED_TERMS {
            if q.contains(term) {
                items.push(ComplianceItem {
                    severity: ComplianceSeverity::Error,
                    message: format!(
                        "Flagged term: \"{term}\". Advice must not imply guaranteed outcomes \
                         per CIRO suitability requirements."
                    ),
                    rule_citation: "CIRO Rule 3400 - Suitability".into(),
                });
            }
        }

        Ok(ProviderOutput::Compliance(ComplianceReport::rollup(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wealthdesk_core::client::Account;
    use wealthdesk_core::composite::ComplianceStatus;

    fn bundle(dob: &str, province: &str, income: f64, accounts: &[(&str, f64, f64)]) -> ContextBundle {
        ContextBundle {
            profile: ClientProfile {
                id: "c1".into(),
                name: "Eleanor Whitfield".into(),
                email: None,
                phone: None,
                province: province.into(),
                date_of_birth: dob.into(),
                risk_profile: "conservative".into(),
                goals: vec![],
                marital_status: None,
                dependents: 1,
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
    fn rrif_table_lookup() {
        assert_eq!(rrif_min_pct(60), 0.04);
        assert_eq!(rrif_min_pct(65), 0.04);
        assert_eq!(rrif_min_pct(72), 0.05);
        assert_eq!(rrif_min_pct(97), 0.20);
    }

    #[tokio::test]
    async fn clean_context_is_clear() {
        let b = bundle("1994-06-15", "ON", 90_000.0, &[("TFSA", 10_000.0, 7_000.0)]);
        let out = ComplianceProvider.run(&b, "general question").await.unwrap();
        let ProviderOutput::Compliance(report) = out else { panic!("wrong variant") };
        assert_eq!(report.status, ComplianceStatus::Clear);
        assert!(report.items.is_empty());
    }

    #[tokio::test]
    async fn senior_with_rrif_gets_oas_warning() {
        // 800K RRIF at 5.82% (age 75+) pushes 48K income over the threshold
        let b = bundle("1948-01-01", "ON", 48_000.0, &[("RRIF", 800_000.0, 0.0)]);
        let out = ComplianceProvider.run(&b, "how are withdrawals looking").await.unwrap();
        let ProviderOutput::Compliance(report) = out else { panic!("wrong variant") };
        assert_eq!(report.status, ComplianceStatus::Warning);
        assert!(report.items.iter().any(|i| i.rule_citation.contains("180.2")));
        assert!(report.items.iter().any(|i| i.rule_citation.contains("146.3")));
    }

    #[tokio::test]
    async fn prohibited_language_is_an_error() {
        let b = bundle("1994-06-15", "ON", 90_000.0, &[]);
        let out = ComplianceProvider
            .run(&b, "Draft something promising guaranteed returns")
            .await
            .unwrap();
        let ProviderOutput::Compliance(report) = out else { panic!("wrong variant") };
        assert_eq!(report.status, ComplianceStatus::Error);
    }

    #[tokio::test]
    async fn quebec_client_gets_provincial_note() {
        let b = bundle("1994-06-15", "QC", 90_000.0, &[]);
        let out = ComplianceProvider.run(&b, "anything to know?").await.unwrap();
        let ProviderOutput::Compliance(report) = out else { panic!("wrong variant") };
        assert!(report.items.iter().any(|i| i.message.contains("Quebec")));
        assert_eq!(report.status, ComplianceStatus::Clear);
    }

    #[tokio::test]
    async fn fhsa_note_only_when_query_mentions_it() {
        let b = bundle("1994-06-15", "ON", 145_000.0, &[("FHSA", 16_000.0, 8_000.0)]);

        let out = ComplianceProvider.run(&b, "tell me about her FHSA").await.unwrap();
        let ProviderOutput::Compliance(with) = out else { panic!("wrong variant") };
        assert!(with.items.iter().any(|i| i.rule_citation.contains("146.6")));

        let out = ComplianceProvider.run(&b, "portfolio thoughts").await.unwrap();
        let ProviderOutput::Compliance(without) = out else { panic!("wrong variant") };
        assert!(without.items.is_empty());
    }
}
