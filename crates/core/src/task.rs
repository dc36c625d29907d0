//! Provider task audit records.
//!
//! One `ProviderTask` row is created when a provider is launched and moves
//! exactly once from `Running` to a terminal state. Rows are persisted for
//! audit regardless of outcome; the advisor can later annotate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task name used for the orchestrator's own summary row, which carries the
/// composite result for a dispatch cycle.
pub const ORCHESTRATOR_TASK: &str = "orchestrator";

/// Lifecycle status of a provider task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// Audit record for one provider invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTask {
    pub id: String,
    pub client_id: String,
    /// Provider name, or [`ORCHESTRATOR_TASK`] for the cycle summary row.
    pub provider: String,
    pub status: TaskStatus,
    /// The request the provider was launched with.
    pub input_snapshot: serde_json::Value,
    /// The serialized output (or error descriptor) once terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_snapshot: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Advisor review verdict: "approved", "edited", "rejected".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisor_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisor_note: Option<String>,
}

impl ProviderTask {
    /// Create a task in the `Running` state for the given provider and query.
    pub fn started(
        client_id: impl Into<String>,
        provider: impl Into<String>,
        query: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.into(),
            provider: provider.into(),
            status: TaskStatus::Running,
            input_snapshot: serde_json::json!({ "query": query }),
            output_snapshot: None,
            created_at: Utc::now(),
            completed_at: None,
            advisor_action: None,
            advisor_note: None,
        }
    }

    /// Transition to `Completed` with the given output.
    pub fn complete(&mut self, output: serde_json::Value) {
        self.status = TaskStatus::Completed;
        self.output_snapshot = Some(output);
        self.completed_at = Some(Utc::now());
    }

    /// Transition to `Failed` with an error descriptor.
    pub fn fail(&mut self, error: impl std::fmt::Display) {
        self.status = TaskStatus::Failed;
        self.output_snapshot = Some(serde_json::json!({ "error": error.to_string() }));
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running_without_completion_time() {
        let task = ProviderTask::started("c1", "quant", "run the numbers");
        assert_eq!(task.status, TaskStatus::Running);
        assert!(task.completed_at.is_none());
        assert_eq!(task.input_snapshot["query"], "run the numbers");
    }

    #[test]
    fn complete_is_terminal() {
        let mut task = ProviderTask::started("c1", "quant", "q");
        task.complete(serde_json::json!({"summary": "done"}));
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.status.is_terminal());
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn fail_records_error_descriptor() {
        let mut task = ProviderTask::started("c1", "research", "q");
        task.fail("market feed unavailable");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(
            task.output_snapshot.unwrap()["error"],
            "market feed unavailable"
        );
    }

    #[test]
    fn status_round_trip() {
        for s in [TaskStatus::Running, TaskStatus::Completed, TaskStatus::Failed] {
            let parsed: TaskStatus = s.as_str().parse().unwrap();
            assert_eq!(parsed, s);
        }
    }
}
