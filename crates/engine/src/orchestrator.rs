//! The request pipeline.
//!
//! One inbound envelope flows: persist the advisor's message → assemble the
//! bundle → classify → branch into the knowledge-remove, knowledge-add,
//! direct-answer, or dispatch path. Each branch ends with a `response`
//! event; the dispatch branch additionally persists an orchestrator summary
//! task carrying the composite and closes with `composite_ready`.
//!
//! Every failure inside the pipeline resolves to a well-formed event on the
//! sink - nothing here returns an error to the caller.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{error, info, warn};

use wealthdesk_core::bundle::ContextBundle;
use wealthdesk_core::client::{ChatMessage, ChatRole, KnowledgeEntry};
use wealthdesk_core::event::{
    EventSink, KnowledgeAddedPayload, KnowledgeRemovedPayload, OutboundEvent, ResponsePayload,
};
use wealthdesk_core::plan::{ActionPlan, ProviderName};
use wealthdesk_core::reasoning::Reasoning;
use wealthdesk_core::request::RequestEnvelope;
use wealthdesk_core::task::{ORCHESTRATOR_TASK, ProviderTask};
use wealthdesk_providers::ProviderRegistry;
use wealthdesk_store::SqliteStore;

use crate::aggregate::Aggregator;
use crate::assembler::ContextAssembler;
use crate::classifier::IntentClassifier;
use crate::dispatch::DispatchScheduler;
use crate::knowledge::KnowledgeMutator;

const DIRECT_INSTRUCTIONS: &str = "You are a concise assistant for a wealth advisor. Answer \
the advisor's question using ONLY the client data provided below. Be specific and reference \
actual data. If information is not in the data, say so. Do not make up information. Keep \
your response clear and concise (2-5 sentences).";

const APOLOGY: &str = "I couldn't process that request. Please try rephrasing your question.";

/// The orchestration engine for one WealthDesk instance.
pub struct Orchestrator {
    store: Arc<SqliteStore>,
    assembler: ContextAssembler,
    classifier: IntentClassifier,
    mutator: KnowledgeMutator,
    scheduler: DispatchScheduler,
    aggregator: Aggregator,
    writer: Arc<dyn Reasoning>,
}

impl Orchestrator {
    /// Wire the engine. `router` serves classification and deletion
    /// matching; `writer` serves direct answers and narrative synthesis.
    pub fn new(
        store: Arc<SqliteStore>,
        registry: Arc<ProviderRegistry>,
        router: Arc<dyn Reasoning>,
        writer: Arc<dyn Reasoning>,
    ) -> Self {
        Self {
            assembler: ContextAssembler::new(store.clone()),
            classifier: IntentClassifier::new(router.clone()),
            mutator: KnowledgeMutator::new(store.clone(), router),
            scheduler: DispatchScheduler::new(store.clone(), registry),
            aggregator: Aggregator::new(writer.clone()),
            store,
            writer,
        }
    }

    /// Process one request cycle, emitting every event on `sink`.
    pub async fn handle_request(&self, envelope: RequestEnvelope, sink: Arc<dyn EventSink>) {
        let client_id = envelope.client_id.clone();

        match self.store.get_client(&client_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                sink.emit(OutboundEvent::error("Client not found")).await;
                return;
            }
            Err(e) => {
                error!(error = %e, "Client lookup failed");
                sink.emit(OutboundEvent::error("Record store unavailable")).await;
                return;
            }
        }

        // Log the advisor's turn before assembling, so the bundle sees it.
        let advisor_turn = ChatMessage::new(&client_id, ChatRole::Advisor, &envelope.text);
        if let Err(e) = self.store.append_chat(&advisor_turn).await {
            warn!(error = %e, "Failed to persist advisor message");
        }

        let bundle = match self.assembler.assemble(&client_id).await {
            Ok(Some(bundle)) => Arc::new(bundle),
            Ok(None) => {
                sink.emit(OutboundEvent::error("Client not found")).await;
                return;
            }
            Err(e) => {
                error!(error = %e, "Context assembly failed");
                sink.emit(OutboundEvent::error("Record store unavailable")).await;
                return;
            }
        };

        sink.emit(OutboundEvent::thinking("Analyzing your question...")).await;

        let plan = self.classifier.classify(&envelope.text, &bundle).await;
        info!(client = %client_id, plan = ?plan, "Request classified");

        match plan {
            ActionPlan::KnowledgeRemove { keywords } => {
                self.handle_remove(&envelope, &bundle, &keywords, &sink).await;
            }
            ActionPlan::KnowledgeAdd { entries } => {
                self.handle_add(&envelope, &bundle, &entries, &sink).await;
            }
            ActionPlan::DirectAnswer => {
                self.handle_direct(&envelope, &bundle, &sink).await;
            }
            ActionPlan::Dispatch { providers } => {
                self.handle_dispatch(&envelope, &bundle, &providers, &sink).await;
            }
        }
    }

    async fn handle_remove(
        &self,
        envelope: &RequestEnvelope,
        bundle: &Arc<ContextBundle>,
        keywords: &[String],
        sink: &Arc<dyn EventSink>,
    ) {
        let name = &bundle.profile.name;
        sink.emit(OutboundEvent::thinking(format!(
            "Finding entries to remove from {name}'s knowledge base..."
        )))
        .await;

        let removed = match self.mutator.apply_remove(&envelope.client_id, keywords).await {
            Ok(removed) => removed,
            Err(e) => {
                error!(error = %e, "Knowledge removal failed");
                sink.emit(OutboundEvent::error("Knowledge base update failed")).await;
                return;
            }
        };

        let summary = if removed.is_empty() {
            format!("I couldn't find any matching entries in {name}'s knowledge base to remove.")
        } else {
            format!(
                "Done - removed {} {} from {name}'s knowledge base:\n\n{}",
                removed.len(),
                plural(removed.len(), "entry", "entries"),
                bullet_list(&removed)
            )
        };

        self.log_system_turn(&envelope.client_id, &summary).await;
        self.respond(envelope, sink, summary, None).await;

        if !removed.is_empty() {
            sink.emit(OutboundEvent::KnowledgeRemoved {
                client_id: envelope.client_id.clone(),
                payload: KnowledgeRemovedPayload {
                    entry_ids: removed.iter().map(|e| e.id.clone()).collect(),
                },
            })
            .await;
        }
    }

    async fn handle_add(
        &self,
        envelope: &RequestEnvelope,
        bundle: &Arc<ContextBundle>,
        entries: &[String],
        sink: &Arc<dyn EventSink>,
    ) {
        let name = &bundle.profile.name;
        sink.emit(OutboundEvent::thinking(format!(
            "Updating {name}'s knowledge base..."
        )))
        .await;

        let added = match self.mutator.apply_add(&envelope.client_id, entries).await {
            Ok(added) => added,
            Err(e) => {
                error!(error = %e, "Knowledge addition failed");
                sink.emit(OutboundEvent::error("Knowledge base update failed")).await;
                return;
            }
        };

        let summary = format!(
            "Done - added {} {} to {name}'s knowledge base:\n\n{}",
            added.len(),
            plural(added.len(), "entry", "entries"),
            bullet_list(&added)
        );

        self.log_system_turn(&envelope.client_id, &summary).await;
        self.respond(envelope, sink, summary, None).await;

        sink.emit(OutboundEvent::KnowledgeAdded {
            client_id: envelope.client_id.clone(),
            payload: KnowledgeAddedPayload { entries: added },
        })
        .await;
    }

    async fn handle_direct(
        &self,
        envelope: &RequestEnvelope,
        bundle: &Arc<ContextBundle>,
        sink: &Arc<dyn EventSink>,
    ) {
        sink.emit(OutboundEvent::thinking(format!(
            "Answering from {}'s data...",
            bundle.profile.name
        )))
        .await;

        let summary = match self.direct_answer(bundle, &envelope.text).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Direct answer call failed");
                APOLOGY.to_string()
            }
        };

        self.log_system_turn(&envelope.client_id, &summary).await;
        self.respond(envelope, sink, summary, None).await;
    }

    async fn handle_dispatch(
        &self,
        envelope: &RequestEnvelope,
        bundle: &Arc<ContextBundle>,
        providers: &BTreeSet<ProviderName>,
        sink: &Arc<dyn EventSink>,
    ) {
        sink.emit(OutboundEvent::thinking(format!(
            "Dispatching {} provider{}...",
            providers.len(),
            if providers.len() == 1 { "" } else { "s" }
        )))
        .await;

        let results = self.scheduler.dispatch(providers, bundle, envelope, sink).await;

        sink.emit(OutboundEvent::thinking("Synthesizing results...")).await;

        let (composite, narrative) = self
            .aggregator
            .aggregate(&results, bundle, &envelope.text)
            .await;

        self.log_system_turn(&envelope.client_id, &narrative).await;

        // Audit row for the whole cycle, keyed by the correlation id.
        let mut summary_task =
            ProviderTask::started(&envelope.client_id, ORCHESTRATOR_TASK, &envelope.text);
        summary_task.id = envelope.correlation_id.clone();
        summary_task.complete(serde_json::to_value(&composite).unwrap_or_default());
        if let Err(e) = self.store.upsert_task(&summary_task).await {
            error!(error = %e, "Failed to persist orchestrator summary task");
        }

        self.respond(envelope, sink, narrative, Some(composite.clone())).await;

        sink.emit(OutboundEvent::CompositeReady {
            client_id: envelope.client_id.clone(),
            task_id: envelope.correlation_id.clone(),
            payload: composite,
        })
        .await;
    }

    /// The single synthesis call for lookup-style requests.
    async fn direct_answer(
        &self,
        bundle: &ContextBundle,
        query: &str,
    ) -> Result<String, wealthdesk_core::error::ReasoningError> {
        let profile = &bundle.profile;

        let knowledge_lines = if bundle.knowledge.is_empty() {
            "  (empty)".to_string()
        } else {
            bundle
                .knowledge
                .iter()
                .map(|e| format!("  - {}", e.content))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let account_lines = if bundle.accounts.is_empty() {
            "  None on file.".to_string()
        } else {
            bundle
                .accounts
                .iter()
                .map(|a| {
                    let mut line = format!("  {} ({}): ${:.0}", a.kind, a.label, a.balance);
                    if a.contribution_room > 0.0 {
                        line.push_str(&format!(", room ${:.0}", a.contribution_room));
                    }
                    line
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let document_lines = if bundle.documents.is_empty() {
            "  None on file.".to_string()
        } else {
            bundle
                .documents
                .iter()
                .map(|d| {
                    let year = d.tax_year.map_or_else(|| "N/A".into(), |y| y.to_string());
                    let preview: String = d.content_text.chars().take(200).collect();
                    format!("  {} ({year}): {preview}", d.kind)
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let chat_lines = if bundle.recent_chat.is_empty() {
            "  No prior conversations.".to_string()
        } else {
            bundle
                .recent_chat
                .iter()
                .take(5)
                .rev()
                .map(|m| {
                    let preview: String = m.content.chars().take(150).collect();
                    format!("  [{}]: {preview}", m.role.as_str())
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let payload = format!(
            "Advisor's question about {name}: \"{query}\"\n\n\
             CLIENT: {name}\n  Province: {province}\n  Income: ${income:.0}\n  \
             Risk: {risk}\n  Marital: {marital}\n  Dependents: {dependents}\n\n\
             KNOWLEDGE BASE:\n{knowledge_lines}\n\n\
             ACCOUNTS:\n{account_lines}\n\n\
             DOCUMENTS:\n{document_lines}\n\n\
             RECENT CONVERSATION:\n{chat_lines}",
            name = profile.name,
            province = profile.province,
            income = profile.employment_income,
            risk = profile.risk_profile,
            marital = profile.marital_status.as_deref().unwrap_or(""),
            dependents = profile.dependents,
        );

        self.writer.complete(DIRECT_INSTRUCTIONS, &payload).await
    }

    async fn log_system_turn(&self, client_id: &str, content: &str) {
        let turn = ChatMessage::new(client_id, ChatRole::System, content);
        if let Err(e) = self.store.append_chat(&turn).await {
            warn!(error = %e, "Failed to persist system message");
        }
    }

    async fn respond(
        &self,
        envelope: &RequestEnvelope,
        sink: &Arc<dyn EventSink>,
        content: String,
        composite: Option<wealthdesk_core::composite::CompositeResult>,
    ) {
        sink.emit(OutboundEvent::Response {
            client_id: envelope.client_id.clone(),
            task_id: envelope.correlation_id.clone(),
            payload: ResponsePayload { content, composite },
        })
        .await;
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

fn bullet_list(entries: &[KnowledgeEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("- {}", e.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CollectingSink, FailingProvider, ScriptedReasoning, seeded_store};
    use wealthdesk_core::composite::ComplianceStatus;
    use wealthdesk_providers::default_registry;

    async fn orchestrator_with(
        store: Arc<SqliteStore>,
        registry: ProviderRegistry,
        router: ScriptedReasoning,
        writer: ScriptedReasoning,
    ) -> Orchestrator {
        Orchestrator::new(
            store,
            Arc::new(registry),
            Arc::new(router),
            Arc::new(writer),
        )
    }

    async fn run(
        orchestrator: &Orchestrator,
        client_id: &str,
        text: &str,
    ) -> (Arc<CollectingSink>, RequestEnvelope) {
        let sink = Arc::new(CollectingSink::default());
        let envelope = RequestEnvelope::new(client_id, text);
        orchestrator
            .handle_request(envelope.clone(), sink.clone() as Arc<dyn EventSink>)
            .await;
        (sink, envelope)
    }

    fn response_payload(sink: &CollectingSink) -> ResponsePayload {
        sink.events()
            .into_iter()
            .find_map(|e| match e {
                OutboundEvent::Response { payload, .. } => Some(payload),
                _ => None,
            })
            .expect("a response event")
    }

    #[tokio::test]
    async fn unknown_client_yields_error_and_no_mutation() {
        let (store, _) = seeded_store().await;
        let orchestrator = orchestrator_with(
            store.clone(),
            default_registry("Alex"),
            ScriptedReasoning::failing(),
            ScriptedReasoning::failing(),
        )
        .await;

        let (sink, _) = run(&orchestrator, "ghost-client", "hello").await;
        assert_eq!(sink.kinds(), vec!["error"]);
        assert!(store.list_tasks(None, None, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remember_scenario_adds_one_entry() {
        let (store, client_id) = seeded_store().await;
        let before = store.knowledge_for(&client_id).await.unwrap().len();
        let orchestrator = orchestrator_with(
            store.clone(),
            default_registry("Alex"),
            ScriptedReasoning::failing(),
            ScriptedReasoning::failing(),
        )
        .await;

        let (sink, _) = run(
            &orchestrator,
            &client_id,
            "Remember she prefers email over phone",
        )
        .await;

        // One new entry persisted
        let entries = store.knowledge_for(&client_id).await.unwrap();
        assert_eq!(entries.len(), before + 1);
        assert!(entries.iter().any(|e| e.content == "she prefers email over phone"));

        // thinking -> thinking -> response -> knowledge_added
        let kinds = sink.kinds();
        assert!(kinds.contains(&"knowledge_added"));
        let added = sink
            .events()
            .into_iter()
            .find_map(|e| match e {
                OutboundEvent::KnowledgeAdded { payload, .. } => Some(payload.entries),
                _ => None,
            })
            .unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].content, "she prefers email over phone");
    }

    #[tokio::test]
    async fn removal_cycle_reports_removed_ids() {
        let (store, client_id) = seeded_store().await;
        let orchestrator = orchestrator_with(
            store.clone(),
            default_registry("Alex"),
            ScriptedReasoning::failing(), // matcher falls back to substring tier
            ScriptedReasoning::failing(),
        )
        .await;

        let (sink, _) = run(
            &orchestrator,
            &client_id,
            "Remove the note about email preferences from the knowledge base",
        )
        .await;

        let kinds = sink.kinds();
        assert!(kinds.contains(&"knowledge_removed"));
        assert!(
            store
                .knowledge_for(&client_id)
                .await
                .unwrap()
                .iter()
                .all(|e| !e.content.contains("email"))
        );
    }

    #[tokio::test]
    async fn zero_match_removal_still_responds() {
        let (store, client_id) = seeded_store().await;
        let orchestrator = orchestrator_with(
            store.clone(),
            default_registry("Alex"),
            ScriptedReasoning::failing(),
            ScriptedReasoning::failing(),
        )
        .await;

        let (sink, _) = run(
            &orchestrator,
            &client_id,
            "Remove the note about alpaca farming from the knowledge base",
        )
        .await;

        let kinds = sink.kinds();
        assert!(kinds.contains(&"response"));
        assert!(!kinds.contains(&"knowledge_removed"));
        let payload = response_payload(&sink);
        assert!(payload.content.contains("couldn't find any matching entries"));
    }

    #[tokio::test]
    async fn direct_answer_uses_writer() {
        let (store, client_id) = seeded_store().await;
        let orchestrator = orchestrator_with(
            store.clone(),
            default_registry("Alex"),
            ScriptedReasoning::with_replies(vec![r#"{"agents": [], "direct_answer": true}"#]),
            ScriptedReasoning::with_replies(vec!["Sarah holds four accounts totalling $109,500."]),
        )
        .await;

        let (sink, _) = run(&orchestrator, &client_id, "What accounts does she have?").await;
        let payload = response_payload(&sink);
        assert_eq!(payload.content, "Sarah holds four accounts totalling $109,500.");
        assert!(payload.composite.is_none());
    }

    #[tokio::test]
    async fn direct_answer_failure_is_an_apology_not_an_error() {
        let (store, client_id) = seeded_store().await;
        let orchestrator = orchestrator_with(
            store.clone(),
            default_registry("Alex"),
            ScriptedReasoning::with_replies(vec![r#"{"agents": [], "direct_answer": true}"#]),
            ScriptedReasoning::failing(),
        )
        .await;

        let (sink, _) = run(&orchestrator, &client_id, "What accounts does she have?").await;
        let payload = response_payload(&sink);
        assert_eq!(payload.content, APOLOGY);
    }

    #[tokio::test]
    async fn research_only_dispatch_populates_one_slot() {
        let (store, client_id) = seeded_store().await;
        let orchestrator = orchestrator_with(
            store.clone(),
            default_registry("Alex"),
            ScriptedReasoning::with_replies(vec![
                r#"{"agents": ["research"], "direct_answer": false}"#,
            ]),
            ScriptedReasoning::with_replies(vec!["Research narrative."]),
        )
        .await;

        let (sink, envelope) =
            run(&orchestrator, &client_id, "What ETFs fit a growth investor?").await;

        let payload = response_payload(&sink);
        let composite = payload.composite.expect("composite on dispatch");
        assert!(composite.research.is_some());
        // The other three slots hold defaults
        assert_eq!(composite.numbers.summary, "No calculations needed for this query.");
        assert_eq!(composite.compliance.status, ComplianceStatus::Clear);
        assert_eq!(composite.draft_message.subject, "Following up");

        // composite_ready closes the cycle
        assert_eq!(sink.kinds().last(), Some(&"composite_ready"));

        // The orchestrator audit row carries the composite
        let summary_task = store.get_task(&envelope.correlation_id).await.unwrap().unwrap();
        assert_eq!(summary_task.provider, ORCHESTRATOR_TASK);
        assert!(summary_task.output_snapshot.unwrap()["research"].is_object());
    }

    #[tokio::test]
    async fn provider_failure_still_yields_full_composite() {
        let (store, client_id) = seeded_store().await;
        let mut registry = default_registry("Alex");
        registry.register(Arc::new(FailingProvider(ProviderName::Quant)));

        let orchestrator = orchestrator_with(
            store.clone(),
            registry,
            ScriptedReasoning::with_replies(vec![
                r#"{"agents": ["quant", "research"], "direct_answer": false}"#,
            ]),
            ScriptedReasoning::failing(), // synthesis falls back to concatenation
        )
        .await;

        let (sink, _) = run(&orchestrator, &client_id, "Run the numbers on her plan").await;

        let payload = response_payload(&sink);
        let composite = payload.composite.unwrap();
        // Failed quant slot carries its default; research is real
        assert_eq!(composite.numbers.summary, "No calculations needed for this query.");
        assert!(composite.research.is_some());

        let failed = store.list_tasks(Some("failed"), None, 20).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].provider, "quant");
    }

    #[tokio::test]
    async fn classifier_fallback_dispatches_all_four() {
        let (store, client_id) = seeded_store().await;
        let orchestrator = orchestrator_with(
            store.clone(),
            default_registry("Alex"),
            ScriptedReasoning::failing(),
            ScriptedReasoning::with_replies(vec!["Full-fanout narrative."]),
        )
        .await;

        let (sink, _) = run(&orchestrator, &client_id, "Something completely novel").await;

        let dispatched = sink
            .kinds()
            .iter()
            .filter(|k| **k == "provider_dispatched")
            .count();
        assert_eq!(dispatched, 4);
    }

    #[tokio::test]
    async fn chat_trail_records_both_turns() {
        let (store, client_id) = seeded_store().await;
        let before = store.chat_for(&client_id).await.unwrap().len();
        let orchestrator = orchestrator_with(
            store.clone(),
            default_registry("Alex"),
            ScriptedReasoning::with_replies(vec![r#"{"agents": [], "direct_answer": true}"#]),
            ScriptedReasoning::with_replies(vec!["An answer."]),
        )
        .await;

        run(&orchestrator, &client_id, "What's her risk profile?").await;

        let after = store.chat_for(&client_id).await.unwrap();
        // advisor turn + system turn
        assert_eq!(after.len(), before + 2);
        assert!(after.iter().any(|m| m.role == ChatRole::Advisor
            && m.content == "What's her risk profile?"));
        assert!(after.iter().any(|m| m.role == ChatRole::System && m.content == "An answer."));
    }
}
