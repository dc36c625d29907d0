//! REST read surface: clients, alerts, and provider-task audit rows.
//!
//! Alerts are produced by the external scanner; this surface only lists
//! and acknowledges them. Task rows get advisor review verdicts here.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use wealthdesk_core::client::{Account, Alert, ChatMessage, ClientProfile, Document, KnowledgeEntry};
use wealthdesk_core::error::StoreError;
use wealthdesk_core::task::ProviderTask;

use crate::SharedState;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn not_found(what: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": format!("{what} not found") })),
    )
}

fn internal(e: StoreError) -> ApiError {
    tracing::error!(error = %e, "Store error serving API request");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "record store unavailable" })),
    )
}

/// Build the `/api` router.
pub fn api_router() -> axum::Router<SharedState> {
    axum::Router::new()
        .route("/clients", get(list_clients))
        .route("/clients/{id}", get(client_detail))
        .route("/clients/{id}/accounts", get(client_accounts))
        .route("/clients/{id}/chat", get(client_chat))
        .route("/clients/{id}/knowledge", get(client_knowledge))
        .route("/alerts", get(list_alerts))
        .route("/alerts/{id}/action", post(act_on_alert))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{id}/action", post(act_on_task))
}

// ── Clients ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ClientSummary {
    #[serde(flatten)]
    profile: ClientProfile,
    total_portfolio: f64,
    pending_alerts: usize,
}

async fn list_clients(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ClientSummary>>, ApiError> {
    let clients = state.store.list_clients().await.map_err(internal)?;
    let mut summaries = Vec::with_capacity(clients.len());
    for profile in clients {
        let total_portfolio = state.store.total_portfolio(&profile.id).await.map_err(internal)?;
        let pending_alerts = state
            .store
            .pending_alert_count(&profile.id)
            .await
            .map_err(internal)?;
        summaries.push(ClientSummary {
            profile,
            total_portfolio,
            pending_alerts,
        });
    }
    Ok(Json(summaries))
}

#[derive(Serialize)]
struct ClientDetail {
    client: ClientProfile,
    accounts: Vec<Account>,
    documents: Vec<Document>,
    chat_history: Vec<ChatMessage>,
    total_portfolio: f64,
}

async fn client_detail(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ClientDetail>, ApiError> {
    let client = state
        .store
        .get_client(&id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("Client"))?;

    let accounts = state.store.accounts_for(&id).await.map_err(internal)?;
    let documents = state.store.documents_for(&id).await.map_err(internal)?;
    let chat_history = state.store.chat_for(&id).await.map_err(internal)?;
    let total_portfolio = accounts.iter().map(|a| a.balance).sum();

    Ok(Json(ClientDetail {
        client,
        accounts,
        documents,
        chat_history,
        total_portfolio,
    }))
}

async fn client_accounts(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(state.store.accounts_for(&id).await.map_err(internal)?))
}

async fn client_chat(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.store.chat_for(&id).await.map_err(internal)?))
}

async fn client_knowledge(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<KnowledgeEntry>>, ApiError> {
    Ok(Json(state.store.knowledge_for(&id).await.map_err(internal)?))
}

// ── Alerts ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AlertListParams {
    #[serde(default = "default_alert_status")]
    status: String,
}

fn default_alert_status() -> String {
    "pending".into()
}

#[derive(Serialize)]
struct AlertWithClient {
    #[serde(flatten)]
    alert: Alert,
    client_name: String,
}

async fn list_alerts(
    State(state): State<SharedState>,
    Query(params): Query<AlertListParams>,
) -> Result<Json<Vec<AlertWithClient>>, ApiError> {
    let alerts = state.store.list_alerts(&params.status).await.map_err(internal)?;
    let mut enriched = Vec::with_capacity(alerts.len());
    for alert in alerts {
        let client_name = state
            .store
            .get_client(&alert.client_id)
            .await
            .map_err(internal)?
            .map(|c| c.name)
            .unwrap_or_default();
        enriched.push(AlertWithClient { alert, client_name });
    }
    Ok(Json(enriched))
}

#[derive(Deserialize)]
struct AlertActionRequest {
    /// "approved", "rejected", "dismissed"
    action: String,
    #[serde(default)]
    #[allow(dead_code)]
    note: String,
}

async fn act_on_alert(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<AlertActionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = state
        .store
        .update_alert_status(&id, &req.action)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(not_found("Alert"));
    }
    Ok(Json(serde_json::json!({
        "status": "ok",
        "alert_id": id,
        "action": req.action,
    })))
}

// ── Provider tasks ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TaskListParams {
    status: Option<String>,
    client_id: Option<String>,
    #[serde(default = "default_task_limit")]
    limit: usize,
}

fn default_task_limit() -> usize {
    20
}

async fn list_tasks(
    State(state): State<SharedState>,
    Query(params): Query<TaskListParams>,
) -> Result<Json<Vec<ProviderTask>>, ApiError> {
    let tasks = state
        .store
        .list_tasks(
            params.status.as_deref(),
            params.client_id.as_deref(),
            params.limit,
        )
        .await
        .map_err(internal)?;
    Ok(Json(tasks))
}

#[derive(Deserialize)]
struct TaskActionRequest {
    /// "approved", "edited", "rejected"
    action: String,
    #[serde(default)]
    note: String,
}

async fn act_on_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<TaskActionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let updated = state
        .store
        .annotate_task(&id, &req.action, &req.note)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(not_found("Task"));
    }
    Ok(Json(serde_json::json!({
        "status": "ok",
        "task_id": id,
        "action": req.action,
    })))
}
