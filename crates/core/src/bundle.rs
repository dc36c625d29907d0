//! The per-request context bundle.
//!
//! A `ContextBundle` is assembled exactly once per inbound request and is
//! the *only* client data the classifier and every dispatched provider see.
//! It is read-only for its whole lifetime - the same bundle serves
//! classification and dispatch, so both phases observe identical state.

use serde::{Deserialize, Serialize};

use crate::client::{Account, ChatMessage, ClientProfile, Document, KnowledgeEntry};

/// How many recent conversation turns the bundle carries.
pub const RECENT_CHAT_WINDOW: usize = 10;

/// Read-only snapshot of everything known about one client, assembled once
/// per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBundle {
    pub profile: ClientProfile,
    pub accounts: Vec<Account>,
    pub documents: Vec<Document>,
    /// Most-recent-first, bounded by [`RECENT_CHAT_WINDOW`].
    pub recent_chat: Vec<ChatMessage>,
    /// Insertion order (oldest first) - recency signal for providers.
    pub knowledge: Vec<KnowledgeEntry>,
}

impl ContextBundle {
    /// Sum of all account balances.
    pub fn total_portfolio(&self) -> f64 {
        self.accounts.iter().map(|a| a.balance).sum()
    }

    /// Find an account by kind (first match).
    pub fn account(&self, kind: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bundle() -> ContextBundle {
        let profile = ClientProfile {
            id: "c1".into(),
            name: "Sarah Chen".into(),
            email: None,
            phone: None,
            province: "ON".into(),
            date_of_birth: "1994-06-15".into(),
            risk_profile: "growth".into(),
            goals: vec![],
            marital_status: None,
            dependents: 0,
            employment_income: 145_000.0,
            employer: None,
            advisor_notes: String::new(),
            onboarded_at: Utc::now(),
        };
        let account = |kind: &str, balance: f64| Account {
            id: format!("a-{kind}"),
            client_id: "c1".into(),
            kind: kind.into(),
            label: kind.into(),
            balance,
            contribution_room: 0.0,
            last_updated: Utc::now(),
        };
        ContextBundle {
            profile,
            accounts: vec![account("TFSA", 42_000.0), account("FHSA", 16_000.0)],
            documents: vec![],
            recent_chat: vec![],
            knowledge: vec![],
        }
    }

    #[test]
    fn total_portfolio_sums_balances() {
        assert_eq!(bundle().total_portfolio(), 58_000.0);
    }

    #[test]
    fn account_lookup_by_kind() {
        let b = bundle();
        assert!(b.account("TFSA").is_some());
        assert!(b.account("RRIF").is_none());
    }
}
