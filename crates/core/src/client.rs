//! Client-domain records: profile, accounts, documents, conversation
//! history, knowledge entries, and scanner alerts.
//!
//! These mirror the record store's schema one-to-one. All timestamps are
//! UTC and persisted as RFC 3339 text.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a knowledge entry's content, in characters.
/// Longer candidates are silently skipped by the mutator, never truncated.
pub const KNOWLEDGE_MAX_CHARS: usize = 500;

/// A client's profile as the advisor sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Two-letter province code (e.g. "ON", "BC", "QC").
    pub province: String,
    /// Date of birth, `YYYY-MM-DD`.
    pub date_of_birth: String,
    /// Risk tolerance: "conservative", "balanced", "growth", "aggressive".
    pub risk_profile: String,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<String>,
    #[serde(default)]
    pub dependents: u32,
    #[serde(default)]
    pub employment_income: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer: Option<String>,
    #[serde(default)]
    pub advisor_notes: String,
    pub onboarded_at: DateTime<Utc>,
}

impl ClientProfile {
    /// The client's given name, used when addressing them in drafts.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    /// Estimate the client's current age from their date of birth.
    /// Returns `None` when the date string does not parse.
    pub fn age(&self, today: chrono::NaiveDate) -> Option<u32> {
        let birth = chrono::NaiveDate::parse_from_str(&self.date_of_birth, "%Y-%m-%d").ok()?;
        let mut age = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }
}

/// A registered financial account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub client_id: String,
    /// Account kind: "TFSA", "FHSA", "RRSP", "RESP", "RRIF", "corporate",
    /// "checking", "savings".
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub contribution_room: f64,
    pub last_updated: DateTime<Utc>,
}

/// An uploaded tax or account document with extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub client_id: String,
    /// Document kind: "T4", "NOA", "T4A", "statement", ...
    pub kind: String,
    #[serde(default)]
    pub content_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_year: Option<i32>,
    pub uploaded_at: DateTime<Utc>,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    Advisor,
    Client,
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advisor => "advisor",
            Self::Client => "client",
            Self::System => "system",
        }
    }
}

impl std::str::FromStr for ChatRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "advisor" => Ok(Self::Advisor),
            "client" => Ok(Self::Client),
            "system" => Ok(Self::System),
            other => Err(format!("unknown chat role: {other}")),
        }
    }
}

/// One turn in the advisor-side conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub client_id: String,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new message with a fresh id, stamped now.
    pub fn new(client_id: impl Into<String>, role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// One advisor-curated fact in a client's knowledge base.
///
/// Entries are created and deleted, never updated in place. Insertion order
/// is semantically meaningful - providers treat it as a recency signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub client_id: String,
    pub content: String,
    /// Where the entry came from (e.g. "advisor").
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeEntry {
    /// Create a new entry with a fresh id, stamped now.
    pub fn new(
        client_id: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.into(),
            content: content.into(),
            source: source.into(),
            created_at: Utc::now(),
        }
    }
}

/// A proactive alert produced by the external account scanner.
///
/// The engine reads and acknowledges alerts; it never creates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub client_id: String,
    pub alert_type: String,
    pub severity: String,
    pub title: String,
    pub body: String,
    /// Pre-drafted outreach action, as opaque JSON from the scanner.
    #[serde(default)]
    pub drafted_action: serde_json::Value,
    /// "pending", "approved", "rejected", "dismissed".
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(dob: &str) -> ClientProfile {
        ClientProfile {
            id: "c1".into(),
            name: "Sarah Chen".into(),
            email: None,
            phone: None,
            province: "ON".into(),
            date_of_birth: dob.into(),
            risk_profile: "growth".into(),
            goals: vec![],
            marital_status: None,
            dependents: 0,
            employment_income: 145_000.0,
            employer: None,
            advisor_notes: String::new(),
            onboarded_at: Utc::now(),
        }
    }

    #[test]
    fn first_name_splits_on_whitespace() {
        assert_eq!(profile("1994-06-15").first_name(), "Sarah");
    }

    #[test]
    fn age_before_and_after_birthday() {
        let p = profile("1990-06-15");
        let before = chrono::NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        let after = chrono::NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(p.age(before), Some(33));
        assert_eq!(p.age(after), Some(34));
    }

    #[test]
    fn age_invalid_dob() {
        let p = profile("not-a-date");
        let today = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(p.age(today), None);
    }

    #[test]
    fn chat_role_round_trip() {
        for role in [ChatRole::Advisor, ChatRole::Client, ChatRole::System] {
            let parsed: ChatRole = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("robot".parse::<ChatRole>().is_err());
    }

    #[test]
    fn knowledge_entry_gets_unique_ids() {
        let a = KnowledgeEntry::new("c1", "prefers email", "advisor");
        let b = KnowledgeEntry::new("c1", "prefers email", "advisor");
        assert_ne!(a.id, b.id);
    }
}
