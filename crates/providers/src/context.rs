//! Relationship-context provider: pulls goals, constraints, and history
//! from the bundle and drafts a personalized client message.
//!
//! Subject line and tone follow the query's topic; the body weaves in the
//! client's first goal when one is on file.

use async_trait::async_trait;

use wealthdesk_core::bundle::ContextBundle;
use wealthdesk_core::client::ClientProfile;
use wealthdesk_core::composite::DraftMessage;
use wealthdesk_core::error::ProviderError;
use wealthdesk_core::plan::ProviderName;
use wealthdesk_core::provider::{ClientContextSummary, ContextReport, Provider, ProviderOutput};

/// The relationship-context specialist.
pub struct ContextProvider {
    advisor_name: String,
}

impl ContextProvider {
    pub fn new(advisor_name: impl Into<String>) -> Self {
        Self {
            advisor_name: advisor_name.into(),
        }
    }
}

#[async_trait]
impl Provider for ContextProvider {
    fn name(&self) -> ProviderName {
        ProviderName::Context
    }

    fn describe(&self, profile: &ClientProfile) -> String {
        format!(
            "Reading {}'s profile, knowledge base, documents, and conversation history",
            profile.name
        )
    }

    async fn run(
        &self,
        bundle: &ContextBundle,
        query: &str,
    ) -> Result<ProviderOutput, ProviderError> {
        let profile = &bundle.profile;
        let first_name = profile.first_name();
        let goals = &profile.goals;

        let mut highlights = Vec::new();
        if !goals.is_empty() {
            highlights.push(format!("goals: {}", goals.iter().take(2).cloned().collect::<Vec<_>>().join(", ")));
        }
        if !profile.advisor_notes.is_empty() {
            highlights.push("advisor notes".into());
        }
        if !bundle.knowledge.is_empty() {
            highlights.push(format!("{} knowledge base entries", bundle.knowledge.len()));
        }
        if !bundle.recent_chat.is_empty() {
            highlights.push("recent conversations".into());
        }

        let account_summary: Vec<String> = bundle
            .accounts
            .iter()
            .map(|a| {
                let mut parts = format!("{}: ${:.0}", a.kind, a.balance);
                if a.contribution_room > 0.0 {
                    parts.push_str(&format!(" | room: ${:.0}", a.contribution_room));
                }
                parts
            })
            .collect();

        let doc_summaries: Vec<String> = bundle
            .documents
            .iter()
            .map(|d| {
                let year = d.tax_year.map_or_else(|| "N/A".into(), |y| y.to_string());
                let preview: String = d.content_text.chars().take(200).collect();
                format!("{} ({year}): {preview}", d.kind)
            })
            .collect();

        let goal_text = match goals.first() {
            Some(first) => {
                let mut text = format!(" I know {first_name}'s goals include {}", first.to_lowercase());
                if let Some(second) = goals.get(1) {
                    text.push_str(&format!(" and {}", second.to_lowercase()));
                }
                text.push('.');
                text
            }
            None => String::new(),
        };

        let summary = format!(
            "Based on {first_name}'s profile and our past conversations, here's the context \
             that's relevant.{goal_text}"
        );

        let (subject, tone) = subject_and_tone(query);

        let mut body = format!(
            "Hi {first_name},\n\nI've been looking into your question about {}.\n",
            simplify_query(query)
        );
        if let Some(first_goal) = goals.first() {
            body.push_str(&format!(
                "\nKeeping in mind your goal of {}, here's what I'd recommend:\n",
                first_goal.to_lowercase()
            ));
        }
        body.push_str(
            "\n[Analysis details will be filled in from the numbers section]\n\n\
             I'd love to walk you through this in more detail. Would you have 15 minutes \
             this week to chat?\n\nBest,\n",
        );
        body.push_str(&self.advisor_name);

        Ok(ProviderOutput::Context(ContextReport {
            summary,
            highlights: highlights.clone(),
            client_context: ClientContextSummary {
                goals: goals.clone(),
                accounts: account_summary,
                documents: doc_summaries,
            },
            draft_message: DraftMessage {
                to: profile.name.clone(),
                subject: subject.into(),
                body,
                tone: tone.into(),
                highlights,
            },
        }))
    }
}

/// Pick the draft subject and tone from the query's topic.
fn subject_and_tone(query: &str) -> (&'static str, &'static str) {
    let q = query.to_lowercase();
    if q.contains("rrsp") || q.contains("contribution") {
        ("Quick thought on your RRSP", "Warm + Informative")
    } else if q.contains("mortgage") || q.contains("home") || q.contains("fhsa") {
        ("Thinking about your home purchase", "Warm + Encouraging")
    } else if q.contains("portfolio") || q.contains("review") {
        ("Your portfolio review", "Professional + Reassuring")
    } else if q.contains("resp") || q.contains("education") {
        ("Education savings update", "Warm + Encouraging")
    } else if q.contains("tax") {
        ("Tax planning thoughts", "Professional + Informative")
    } else {
        ("Following up on our conversation", "Warm + Professional")
    }
}

/// Turn the advisor's query into a client-friendly phrase.
fn simplify_query(query: &str) -> String {
    let mut q = query.trim().trim_end_matches('.').to_lowercase();
    if q.chars().count() > 80 {
        q = format!("{}...", q.chars().take(80).collect::<String>());
    }
    for prefix in ["what's the best move for", "check", "run a", "compare", "draft a"] {
        if let Some(rest) = q.strip_prefix(prefix) {
            q = rest.trim().to_string();
            break;
        }
    }
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bundle(goals: Vec<&str>) -> ContextBundle {
        ContextBundle {
            profile: ClientProfile {
                id: "c1".into(),
                name: "Sarah Chen".into(),
                email: None,
                phone: None,
                province: "ON".into(),
                date_of_birth: "1994-06-15".into(),
                risk_profile: "growth".into(),
                goals: goals.into_iter().map(String::from).collect(),
                marital_status: None,
                dependents: 0,
                employment_income: 145_000.0,
                employer: None,
                advisor_notes: "Prefers email.".into(),
                onboarded_at: Utc::now(),
            },
            accounts: vec![],
            documents: vec![],
            recent_chat: vec![],
            knowledge: vec![],
        }
    }

    #[tokio::test]
    async fn draft_weaves_in_first_goal() {
        let b = bundle(vec!["Buy a first home in the GTA"]);
        let provider = ContextProvider::new("Alex");
        let out = provider.run(&b, "What's the plan for her FHSA?").await.unwrap();
        let ProviderOutput::Context(report) = out else { panic!("wrong variant") };

        assert_eq!(report.draft_message.subject, "Thinking about your home purchase");
        assert!(report.draft_message.body.contains("Hi Sarah,"));
        assert!(report.draft_message.body.contains("buy a first home in the gta"));
        assert!(report.draft_message.body.ends_with("Alex"));
        assert!(report.summary.contains("goals include"));
    }

    #[tokio::test]
    async fn no_goals_keeps_generic_body() {
        let b = bundle(vec![]);
        let provider = ContextProvider::new("Alex");
        let out = provider.run(&b, "anything I should know?").await.unwrap();
        let ProviderOutput::Context(report) = out else { panic!("wrong variant") };

        assert_eq!(report.draft_message.subject, "Following up on our conversation");
        assert!(!report.draft_message.body.contains("your goal of"));
    }

    #[test]
    fn simplify_strips_prefix_and_caps_length() {
        assert_eq!(simplify_query("Compare TFSA and RRSP."), "tfsa and rrsp");
        let long = "a".repeat(120);
        assert!(simplify_query(&long).ends_with("..."));
    }

    #[test]
    fn subject_selection() {
        assert_eq!(subject_and_tone("rrsp room?").0, "Quick thought on your RRSP");
        assert_eq!(subject_and_tone("tax bracket").0, "Tax planning thoughts");
        assert_eq!(subject_and_tone("hello").0, "Following up on our conversation");
    }
}
