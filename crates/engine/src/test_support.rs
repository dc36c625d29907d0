//! Shared test doubles for the engine crate.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use wealthdesk_core::bundle::ContextBundle;
use wealthdesk_core::client::{Account, ChatMessage, ChatRole, ClientProfile};
use wealthdesk_core::error::{ProviderError, ReasoningError};
use wealthdesk_core::event::{EventSink, OutboundEvent};
use wealthdesk_core::plan::ProviderName;
use wealthdesk_core::provider::{Provider, ProviderOutput};
use wealthdesk_core::reasoning::Reasoning;
use wealthdesk_store::SqliteStore;

/// A reasoning backend that replays a fixed sequence of replies.
pub struct ScriptedReasoning {
    replies: Mutex<VecDeque<Result<String, ReasoningError>>>,
}

impl ScriptedReasoning {
    pub fn with_replies(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
        }
    }

    /// A backend whose every call fails.
    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
        }
    }
}

#[async_trait]
impl Reasoning for ScriptedReasoning {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _instructions: &str, _payload: &str) -> Result<String, ReasoningError> {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(ReasoningError::Network("script exhausted".into())))
    }
}

/// An event sink that records everything emitted.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<OutboundEvent>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<OutboundEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.kind()).collect()
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn emit(&self, event: OutboundEvent) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
    }
}

/// A provider that always fails - for failure-isolation tests.
pub struct FailingProvider(pub ProviderName);

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> ProviderName {
        self.0
    }

    fn describe(&self, _profile: &ClientProfile) -> String {
        "A provider that is about to fail".into()
    }

    async fn run(
        &self,
        _bundle: &ContextBundle,
        _query: &str,
    ) -> Result<ProviderOutput, ProviderError> {
        Err(ProviderError::Failed {
            provider: self.0.as_str().into(),
            reason: "synthetic failure".into(),
        })
    }
}

/// In-memory store seeded with one client; returns (store, client_id).
pub async fn seeded_store() -> (Arc<SqliteStore>, String) {
    let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());
    let client = sample_profile("c-sarah");
    store.upsert_client(&client).await.unwrap();

    for (kind, balance, room) in [
        ("TFSA", 42_000.0, 7_000.0),
        ("FHSA", 16_000.0, 8_000.0),
        ("RRSP", 28_000.0, 18_500.0),
        ("checking", 23_500.0, 0.0),
    ] {
        store
            .upsert_account(&Account {
                id: format!("a-{kind}"),
                client_id: client.id.clone(),
                kind: kind.into(),
                label: kind.into(),
                balance,
                contribution_room: room,
                last_updated: Utc::now(),
            })
            .await
            .unwrap();
    }

    store
        .add_knowledge(&client.id, "Prefers email over phone calls", "advisor")
        .await
        .unwrap();
    store
        .add_knowledge(&client.id, "House hunting in the east end", "advisor")
        .await
        .unwrap();

    store
        .append_chat(&ChatMessage::new(
            &client.id,
            ChatRole::Client,
            "Thinking about my first home purchase.",
        ))
        .await
        .unwrap();

    (store, client.id)
}

pub fn sample_profile(id: &str) -> ClientProfile {
    ClientProfile {
        id: id.into(),
        name: "Sarah Chen".into(),
        email: Some("sarah.chen@email.com".into()),
        phone: None,
        province: "ON".into(),
        date_of_birth: "1994-06-15".into(),
        risk_profile: "growth".into(),
        goals: vec!["Buy a first home in the GTA".into()],
        marital_status: Some("single".into()),
        dependents: 0,
        employment_income: 145_000.0,
        employer: Some("Shopify".into()),
        advisor_notes: "Prefers email communication.".into(),
        onboarded_at: Utc::now(),
    }
}

/// A bundle straight off the seeded store.
pub async fn sample_bundle() -> (Arc<SqliteStore>, String, ContextBundle) {
    let (store, client_id) = seeded_store().await;
    let bundle = crate::assembler::ContextAssembler::new(store.clone())
        .assemble(&client_id)
        .await
        .unwrap()
        .unwrap();
    (store, client_id, bundle)
}
