//! Dispatch scheduling - concurrent provider fan-out.
//!
//! For each provider in the requested set (announced in registry order):
//! persist a running task row, emit `provider_dispatched`, then launch the
//! invocation as an independent concurrent unit. Each unit emits
//! `provider_running`, invokes the provider against the shared read-only
//! bundle, persists the terminal task status, and emits
//! `provider_completed` with either the output or an error payload.
//!
//! One provider's failure never cancels or delays its siblings. The
//! scheduler joins every unit (barrier) before returning, and keys the
//! result map by each unit's own name tag, never completion order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use wealthdesk_core::bundle::ContextBundle;
use wealthdesk_core::event::{DescriptionPayload, EventSink, OutboundEvent};
use wealthdesk_core::plan::ProviderName;
use wealthdesk_core::provider::{Provider, ProviderOutput};
use wealthdesk_core::request::RequestEnvelope;
use wealthdesk_core::task::ProviderTask;
use wealthdesk_providers::ProviderRegistry;
use wealthdesk_store::SqliteStore;

/// Launches providers concurrently and collects their results.
pub struct DispatchScheduler {
    store: Arc<SqliteStore>,
    registry: Arc<ProviderRegistry>,
}

impl DispatchScheduler {
    pub fn new(store: Arc<SqliteStore>, registry: Arc<ProviderRegistry>) -> Self {
        Self { store, registry }
    }

    /// Fan out to `providers`, wait for every unit to reach a terminal
    /// state, and return the map of successful outputs. Failures are
    /// persisted and reported over the sink; they never propagate.
    pub async fn dispatch(
        &self,
        providers: &BTreeSet<ProviderName>,
        bundle: &Arc<ContextBundle>,
        envelope: &RequestEnvelope,
        sink: &Arc<dyn EventSink>,
    ) -> BTreeMap<ProviderName, ProviderOutput> {
        let mut units: Vec<(ProviderName, String, JoinHandle<Option<ProviderOutput>>)> =
            Vec::new();

        // Announcement pass, in registry order. Requested names with no
        // registered provider are skipped.
        for provider in self.registry.iter() {
            let name = provider.name();
            if !providers.contains(&name) {
                continue;
            }

            let task = ProviderTask::started(&envelope.client_id, name.as_str(), &envelope.text);
            if let Err(e) = self.store.upsert_task(&task).await {
                error!(provider = %name, error = %e, "Failed to persist task row");
            }

            sink.emit(OutboundEvent::ProviderDispatched {
                provider: name,
                client_id: envelope.client_id.clone(),
                task_id: task.id.clone(),
                payload: DescriptionPayload {
                    description: provider.describe(&bundle.profile),
                },
            })
            .await;

            let handle = tokio::spawn(run_unit(
                self.store.clone(),
                provider.clone(),
                bundle.clone(),
                envelope.clone(),
                task.clone(),
                sink.clone(),
            ));
            units.push((name, task.id, handle));
        }

        info!(
            client = %envelope.client_id,
            launched = units.len(),
            "Dispatched providers"
        );

        // Barrier: every launched unit reaches a terminal state before the
        // aggregator runs. Results are keyed by the unit's own name tag.
        let mut results = BTreeMap::new();
        for (name, task_id, handle) in units {
            match handle.await {
                Ok(Some(output)) => {
                    results.insert(name, output);
                }
                Ok(None) => {} // failure already persisted + reported by the unit
                Err(join_error) => {
                    // A panicked unit still gets a terminal task status.
                    warn!(provider = %name, error = %join_error, "Provider unit aborted");
                    let mut task =
                        ProviderTask::started(&envelope.client_id, name.as_str(), &envelope.text);
                    task.id = task_id.clone();
                    task.fail("provider aborted before completing");
                    if let Err(e) = self.store.upsert_task(&task).await {
                        error!(provider = %name, error = %e, "Failed to persist aborted task");
                    }
                    sink.emit(OutboundEvent::ProviderCompleted {
                        provider: name,
                        client_id: envelope.client_id.clone(),
                        task_id,
                        payload: serde_json::json!({
                            "error": "provider aborted before completing"
                        }),
                    })
                    .await;
                }
            }
        }

        results
    }
}

/// One concurrent unit: run the provider, persist the terminal status, and
/// report completion. Returns the output only on success.
async fn run_unit(
    store: Arc<SqliteStore>,
    provider: Arc<dyn Provider>,
    bundle: Arc<ContextBundle>,
    envelope: RequestEnvelope,
    mut task: ProviderTask,
    sink: Arc<dyn EventSink>,
) -> Option<ProviderOutput> {
    let name = provider.name();

    sink.emit(OutboundEvent::ProviderRunning {
        provider: name,
        client_id: envelope.client_id.clone(),
        task_id: task.id.clone(),
    })
    .await;

    match provider.run(&bundle, &envelope.text).await {
        Ok(output) => {
            let payload = serde_json::to_value(&output).unwrap_or_default();
            task.complete(payload.clone());
            if let Err(e) = store.upsert_task(&task).await {
                error!(provider = %name, error = %e, "Failed to persist completed task");
            }
            sink.emit(OutboundEvent::ProviderCompleted {
                provider: name,
                client_id: envelope.client_id,
                task_id: task.id,
                payload,
            })
            .await;
            Some(output)
        }
        Err(provider_error) => {
            warn!(provider = %name, error = %provider_error, "Provider failed");
            task.fail(&provider_error);
            if let Err(e) = store.upsert_task(&task).await {
                error!(provider = %name, error = %e, "Failed to persist failed task");
            }
            sink.emit(OutboundEvent::ProviderCompleted {
                provider: name,
                client_id: envelope.client_id,
                task_id: task.id,
                payload: serde_json::json!({ "error": provider_error.to_string() }),
            })
            .await;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CollectingSink, FailingProvider, sample_bundle};
    use wealthdesk_core::task::TaskStatus;
    use wealthdesk_providers::default_registry;

    async fn run_dispatch(
        providers: BTreeSet<ProviderName>,
        registry: ProviderRegistry,
    ) -> (
        Arc<SqliteStore>,
        Arc<CollectingSink>,
        BTreeMap<ProviderName, ProviderOutput>,
    ) {
        let (store, client_id, bundle) = sample_bundle().await;
        let scheduler = DispatchScheduler::new(store.clone(), Arc::new(registry));
        let sink = Arc::new(CollectingSink::default());
        let envelope = RequestEnvelope::new(client_id, "How should we plan her FHSA?");
        let results = scheduler
            .dispatch(
                &providers,
                &Arc::new(bundle),
                &envelope,
                &(sink.clone() as Arc<dyn EventSink>),
            )
            .await;
        (store, sink, results)
    }

    #[tokio::test]
    async fn full_set_produces_all_results() {
        let (store, sink, results) =
            run_dispatch(ProviderName::full_set(), default_registry("Alex")).await;

        assert_eq!(results.len(), 4);
        assert!(results.contains_key(&ProviderName::Quant));

        // Four dispatched + four running + four completed events
        let kinds = sink.kinds();
        assert_eq!(kinds.iter().filter(|k| **k == "provider_dispatched").count(), 4);
        assert_eq!(kinds.iter().filter(|k| **k == "provider_completed").count(), 4);

        // All four tasks persisted terminal
        let tasks = store.list_tasks(Some("completed"), None, 20).await.unwrap();
        assert_eq!(tasks.len(), 4);
    }

    #[tokio::test]
    async fn announcements_follow_registry_order() {
        let (_, sink, _) = run_dispatch(ProviderName::full_set(), default_registry("Alex")).await;

        let announced: Vec<ProviderName> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                OutboundEvent::ProviderDispatched { provider, .. } => Some(provider),
                _ => None,
            })
            .collect();
        assert_eq!(announced, ProviderName::ALL);
    }

    #[tokio::test]
    async fn failure_is_isolated_from_siblings() {
        let mut registry = default_registry("Alex");
        registry.register(Arc::new(FailingProvider(ProviderName::Research)));

        let (store, sink, results) =
            run_dispatch(ProviderName::full_set(), registry).await;

        // Three succeeded, the failed one is absent from the map
        assert_eq!(results.len(), 3);
        assert!(!results.contains_key(&ProviderName::Research));

        // The failed provider has a failed task persisted
        let failed = store.list_tasks(Some("failed"), None, 20).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].provider, "research");
        assert_eq!(failed[0].status, TaskStatus::Failed);

        // Its completion event carries an error payload
        let error_completions = sink
            .events()
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    OutboundEvent::ProviderCompleted { provider: ProviderName::Research, payload, .. }
                        if payload.get("error").is_some()
                )
            })
            .count();
        assert_eq!(error_completions, 1);
    }

    #[tokio::test]
    async fn per_provider_lifecycle_order_is_strict() {
        let (_, sink, _) =
            run_dispatch([ProviderName::Quant].into_iter().collect(), default_registry("Alex"))
                .await;

        let kinds = sink.kinds();
        let dispatched = kinds.iter().position(|k| *k == "provider_dispatched").unwrap();
        let running = kinds.iter().position(|k| *k == "provider_running").unwrap();
        let completed = kinds.iter().position(|k| *k == "provider_completed").unwrap();
        assert!(dispatched < running && running < completed);
    }

    #[tokio::test]
    async fn subset_dispatch_only_launches_requested() {
        let (store, _, results) = run_dispatch(
            [ProviderName::Research].into_iter().collect(),
            default_registry("Alex"),
        )
        .await;

        assert_eq!(results.len(), 1);
        assert_eq!(store.list_tasks(None, None, 20).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_registry_yields_empty_map() {
        let (_, sink, results) =
            run_dispatch(ProviderName::full_set(), ProviderRegistry::new()).await;
        assert!(results.is_empty());
        assert!(sink.events().is_empty());
    }
}
