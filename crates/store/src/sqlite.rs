//! SQLite record store.
//!
//! Uses one database file with WAL journaling and foreign keys on. Pass
//! `"sqlite::memory:"` for an in-process ephemeral store (useful for tests).

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use wealthdesk_core::client::{
    Account, Alert, ChatMessage, ChatRole, ClientProfile, Document, KnowledgeEntry,
};
use wealthdesk_core::error::StoreError;
use wealthdesk_core::task::{ProviderTask, TaskStatus};

/// The production SQLite record store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the store at the given path and run migrations.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite record store initialized at {path}");
        Ok(store)
    }

    /// Run schema migrations - creates all tables and indexes.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS clients (
                id                TEXT PRIMARY KEY,
                name              TEXT NOT NULL,
                email             TEXT,
                phone             TEXT,
                province          TEXT NOT NULL,
                date_of_birth     TEXT NOT NULL,
                risk_profile      TEXT NOT NULL,
                goals             TEXT NOT NULL DEFAULT '[]',
                marital_status    TEXT,
                dependents        INTEGER NOT NULL DEFAULT 0,
                employment_income REAL NOT NULL DEFAULT 0,
                employer          TEXT,
                advisor_notes     TEXT NOT NULL DEFAULT '',
                onboarded_at      TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id                TEXT PRIMARY KEY,
                client_id         TEXT NOT NULL REFERENCES clients(id),
                kind              TEXT NOT NULL,
                label             TEXT NOT NULL DEFAULT '',
                balance           REAL NOT NULL DEFAULT 0,
                contribution_room REAL NOT NULL DEFAULT 0,
                last_updated      TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id           TEXT PRIMARY KEY,
                client_id    TEXT NOT NULL REFERENCES clients(id),
                kind         TEXT NOT NULL,
                content_text TEXT NOT NULL DEFAULT '',
                tax_year     INTEGER,
                uploaded_at  TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS chat_history (
                id         TEXT PRIMARY KEY,
                client_id  TEXT NOT NULL REFERENCES clients(id),
                role       TEXT NOT NULL,
                content    TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS knowledge_entries (
                id         TEXT PRIMARY KEY,
                client_id  TEXT NOT NULL REFERENCES clients(id),
                content    TEXT NOT NULL,
                source     TEXT NOT NULL DEFAULT 'advisor',
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS provider_tasks (
                id              TEXT PRIMARY KEY,
                client_id       TEXT NOT NULL,
                provider        TEXT NOT NULL,
                status          TEXT NOT NULL,
                input_snapshot  TEXT NOT NULL DEFAULT '{}',
                output_snapshot TEXT,
                created_at      TEXT NOT NULL,
                completed_at    TEXT,
                advisor_action  TEXT,
                advisor_note    TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id             TEXT PRIMARY KEY,
                client_id      TEXT NOT NULL REFERENCES clients(id),
                alert_type     TEXT NOT NULL,
                severity       TEXT NOT NULL DEFAULT 'info',
                title          TEXT NOT NULL,
                body           TEXT NOT NULL DEFAULT '',
                drafted_action TEXT NOT NULL DEFAULT '{}',
                status         TEXT NOT NULL DEFAULT 'pending',
                created_at     TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_accounts_client ON accounts(client_id)",
            "CREATE INDEX IF NOT EXISTS idx_chat_client_time ON chat_history(client_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_knowledge_client ON knowledge_entries(client_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_client_time ON provider_tasks(client_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_alerts_status ON alerts(status)",
        ];

        for sql in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn parse_time(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn get_text(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<String, StoreError> {
        row.try_get(column)
            .map_err(|e| StoreError::QueryFailed(format!("{column} column: {e}")))
    }

    // ── Clients ───────────────────────────────────────────────────────────

    fn row_to_client(row: &sqlx::sqlite::SqliteRow) -> Result<ClientProfile, StoreError> {
        let goals_json = Self::get_text(row, "goals")?;
        Ok(ClientProfile {
            id: Self::get_text(row, "id")?,
            name: Self::get_text(row, "name")?,
            email: row.try_get("email").ok().flatten(),
            phone: row.try_get("phone").ok().flatten(),
            province: Self::get_text(row, "province")?,
            date_of_birth: Self::get_text(row, "date_of_birth")?,
            risk_profile: Self::get_text(row, "risk_profile")?,
            goals: serde_json::from_str(&goals_json).unwrap_or_default(),
            marital_status: row.try_get("marital_status").ok().flatten(),
            dependents: row.try_get::<i64, _>("dependents").unwrap_or(0) as u32,
            employment_income: row.try_get("employment_income").unwrap_or(0.0),
            employer: row.try_get("employer").ok().flatten(),
            advisor_notes: Self::get_text(row, "advisor_notes")?,
            onboarded_at: Self::parse_time(&Self::get_text(row, "onboarded_at")?),
        })
    }

    pub async fn upsert_client(&self, client: &ClientProfile) -> Result<(), StoreError> {
        let goals = serde_json::to_string(&client.goals)
            .map_err(|e| StoreError::Storage(format!("Goals serialization: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO clients (id, name, email, phone, province, date_of_birth, risk_profile,
                                 goals, marital_status, dependents, employment_income, employer,
                                 advisor_notes, onboarded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                phone = excluded.phone,
                province = excluded.province,
                date_of_birth = excluded.date_of_birth,
                risk_profile = excluded.risk_profile,
                goals = excluded.goals,
                marital_status = excluded.marital_status,
                dependents = excluded.dependents,
                employment_income = excluded.employment_income,
                employer = excluded.employer,
                advisor_notes = excluded.advisor_notes
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.province)
        .bind(&client.date_of_birth)
        .bind(&client.risk_profile)
        .bind(&goals)
        .bind(&client.marital_status)
        .bind(client.dependents as i64)
        .bind(client.employment_income)
        .bind(&client.employer)
        .bind(&client.advisor_notes)
        .bind(client.onboarded_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Client upsert failed: {e}")))?;
        Ok(())
    }

    pub async fn get_client(&self, id: &str) -> Result<Option<ClientProfile>, StoreError> {
        let row = sqlx::query("SELECT * FROM clients WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Client lookup: {e}")))?;
        match row {
            Some(ref r) => Ok(Some(Self::row_to_client(r)?)),
            None => Ok(None),
        }
    }

    pub async fn list_clients(&self) -> Result<Vec<ClientProfile>, StoreError> {
        let rows = sqlx::query("SELECT * FROM clients ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Client list: {e}")))?;
        rows.iter().map(Self::row_to_client).collect()
    }

    /// Sum of the client's account balances.
    pub async fn total_portfolio(&self, client_id: &str) -> Result<f64, StoreError> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(balance), 0.0) AS total FROM accounts WHERE client_id = ?1",
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Portfolio sum: {e}")))?;
        row.try_get("total")
            .map_err(|e| StoreError::QueryFailed(format!("total column: {e}")))
    }

    /// Number of pending alerts for the client.
    pub async fn pending_alert_count(&self, client_id: &str) -> Result<usize, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM alerts WHERE client_id = ?1 AND status = 'pending'",
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Alert count: {e}")))?;
        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;
        Ok(cnt as usize)
    }

    // ── Accounts ──────────────────────────────────────────────────────────

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account, StoreError> {
        Ok(Account {
            id: Self::get_text(row, "id")?,
            client_id: Self::get_text(row, "client_id")?,
            kind: Self::get_text(row, "kind")?,
            label: Self::get_text(row, "label")?,
            balance: row.try_get("balance").unwrap_or(0.0),
            contribution_room: row.try_get("contribution_room").unwrap_or(0.0),
            last_updated: Self::parse_time(&Self::get_text(row, "last_updated")?),
        })
    }

    pub async fn upsert_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, client_id, kind, label, balance, contribution_room, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                balance = excluded.balance,
                contribution_room = excluded.contribution_room,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&account.id)
        .bind(&account.client_id)
        .bind(&account.kind)
        .bind(&account.label)
        .bind(account.balance)
        .bind(account.contribution_room)
        .bind(account.last_updated.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Account upsert failed: {e}")))?;
        Ok(())
    }

    pub async fn accounts_for(&self, client_id: &str) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query("SELECT * FROM accounts WHERE client_id = ?1 ORDER BY kind")
            .bind(client_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Account list: {e}")))?;
        rows.iter().map(Self::row_to_account).collect()
    }

    // ── Documents ─────────────────────────────────────────────────────────

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document, StoreError> {
        Ok(Document {
            id: Self::get_text(row, "id")?,
            client_id: Self::get_text(row, "client_id")?,
            kind: Self::get_text(row, "kind")?,
            content_text: Self::get_text(row, "content_text")?,
            tax_year: row.try_get::<Option<i64>, _>("tax_year").ok().flatten().map(|y| y as i32),
            uploaded_at: Self::parse_time(&Self::get_text(row, "uploaded_at")?),
        })
    }

    pub async fn upsert_document(&self, document: &Document) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, client_id, kind, content_text, tax_year, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET content_text = excluded.content_text
            "#,
        )
        .bind(&document.id)
        .bind(&document.client_id)
        .bind(&document.kind)
        .bind(&document.content_text)
        .bind(document.tax_year.map(|y| y as i64))
        .bind(document.uploaded_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Document upsert failed: {e}")))?;
        Ok(())
    }

    pub async fn documents_for(&self, client_id: &str) -> Result<Vec<Document>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM documents WHERE client_id = ?1 ORDER BY tax_year DESC")
                .bind(client_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("Document list: {e}")))?;
        rows.iter().map(Self::row_to_document).collect()
    }

    // ── Chat history ──────────────────────────────────────────────────────

    fn row_to_chat(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage, StoreError> {
        let role: ChatRole = Self::get_text(row, "role")?
            .parse()
            .map_err(StoreError::QueryFailed)?;
        Ok(ChatMessage {
            id: Self::get_text(row, "id")?,
            client_id: Self::get_text(row, "client_id")?,
            role,
            content: Self::get_text(row, "content")?,
            created_at: Self::parse_time(&Self::get_text(row, "created_at")?),
        })
    }

    pub async fn append_chat(&self, message: &ChatMessage) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO chat_history (id, client_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&message.id)
        .bind(&message.client_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Chat insert failed: {e}")))?;
        Ok(())
    }

    /// Full history, oldest first.
    pub async fn chat_for(&self, client_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM chat_history WHERE client_id = ?1 ORDER BY created_at ASC")
                .bind(client_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("Chat list: {e}")))?;
        rows.iter().map(Self::row_to_chat).collect()
    }

    /// The most recent `limit` turns, most-recent-first.
    pub async fn recent_chat(
        &self,
        client_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_history WHERE client_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )
        .bind(client_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Recent chat: {e}")))?;
        rows.iter().map(Self::row_to_chat).collect()
    }

    // ── Knowledge entries ─────────────────────────────────────────────────

    fn row_to_knowledge(row: &sqlx::sqlite::SqliteRow) -> Result<KnowledgeEntry, StoreError> {
        Ok(KnowledgeEntry {
            id: Self::get_text(row, "id")?,
            client_id: Self::get_text(row, "client_id")?,
            content: Self::get_text(row, "content")?,
            source: Self::get_text(row, "source")?,
            created_at: Self::parse_time(&Self::get_text(row, "created_at")?),
        })
    }

    /// Persist one knowledge entry and return it.
    pub async fn add_knowledge(
        &self,
        client_id: &str,
        content: &str,
        source: &str,
    ) -> Result<KnowledgeEntry, StoreError> {
        let entry = KnowledgeEntry {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            content: content.to_string(),
            source: source.to_string(),
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO knowledge_entries (id, client_id, content, source, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&entry.id)
        .bind(&entry.client_id)
        .bind(&entry.content)
        .bind(&entry.source)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Knowledge insert failed: {e}")))?;
        debug!(client = %client_id, "Stored knowledge entry {}", entry.id);
        Ok(entry)
    }

    /// All entries for a client, insertion order (oldest first).
    pub async fn knowledge_for(&self, client_id: &str) -> Result<Vec<KnowledgeEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM knowledge_entries WHERE client_id = ?1 ORDER BY created_at ASC, id ASC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Knowledge list: {e}")))?;
        rows.iter().map(Self::row_to_knowledge).collect()
    }

    /// Delete one entry by id. Returns whether a row was removed.
    pub async fn delete_knowledge(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM knowledge_entries WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("Knowledge delete failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    // ── Provider tasks ────────────────────────────────────────────────────

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<ProviderTask, StoreError> {
        let status: TaskStatus = Self::get_text(row, "status")?
            .parse()
            .map_err(StoreError::QueryFailed)?;
        let input: String = Self::get_text(row, "input_snapshot")?;
        let output: Option<String> = row.try_get("output_snapshot").ok().flatten();
        Ok(ProviderTask {
            id: Self::get_text(row, "id")?,
            client_id: Self::get_text(row, "client_id")?,
            provider: Self::get_text(row, "provider")?,
            status,
            input_snapshot: serde_json::from_str(&input).unwrap_or_default(),
            output_snapshot: output.and_then(|o| serde_json::from_str(&o).ok()),
            created_at: Self::parse_time(&Self::get_text(row, "created_at")?),
            completed_at: row
                .try_get::<Option<String>, _>("completed_at")
                .ok()
                .flatten()
                .map(|t| Self::parse_time(&t)),
            advisor_action: row.try_get("advisor_action").ok().flatten(),
            advisor_note: row.try_get("advisor_note").ok().flatten(),
        })
    }

    /// Insert or update one task row. Each task id is owned by exactly one
    /// concurrent unit, so this single upsert is the only write discipline
    /// the scheduler needs.
    pub async fn upsert_task(&self, task: &ProviderTask) -> Result<(), StoreError> {
        let input = serde_json::to_string(&task.input_snapshot)
            .map_err(|e| StoreError::Storage(format!("Input serialization: {e}")))?;
        let output = task
            .output_snapshot
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Storage(format!("Output serialization: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO provider_tasks
                (id, client_id, provider, status, input_snapshot, output_snapshot,
                 created_at, completed_at, advisor_action, advisor_note)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                output_snapshot = excluded.output_snapshot,
                completed_at = excluded.completed_at
            "#,
        )
        .bind(&task.id)
        .bind(&task.client_id)
        .bind(&task.provider)
        .bind(task.status.as_str())
        .bind(&input)
        .bind(&output)
        .bind(task.created_at.to_rfc3339())
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(&task.advisor_action)
        .bind(&task.advisor_note)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Task upsert failed: {e}")))?;
        Ok(())
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<ProviderTask>, StoreError> {
        let row = sqlx::query("SELECT * FROM provider_tasks WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Task lookup: {e}")))?;
        match row {
            Some(ref r) => Ok(Some(Self::row_to_task(r)?)),
            None => Ok(None),
        }
    }

    /// Recent tasks, optionally filtered by status and/or client.
    pub async fn list_tasks(
        &self,
        status: Option<&str>,
        client_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ProviderTask>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM provider_tasks
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR client_id = ?2)
            ORDER BY created_at DESC
            LIMIT ?3
            "#,
        )
        .bind(status)
        .bind(client_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Task list: {e}")))?;
        rows.iter().map(Self::row_to_task).collect()
    }

    /// Record the advisor's review of a task. Returns whether the task exists.
    pub async fn annotate_task(
        &self,
        id: &str,
        action: &str,
        note: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE provider_tasks SET advisor_action = ?1, advisor_note = ?2 WHERE id = ?3",
        )
        .bind(action)
        .bind(note)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Task annotation failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    // ── Alerts (written by the external scanner; read + acknowledged here) ─

    fn row_to_alert(row: &sqlx::sqlite::SqliteRow) -> Result<Alert, StoreError> {
        let drafted: String = Self::get_text(row, "drafted_action")?;
        Ok(Alert {
            id: Self::get_text(row, "id")?,
            client_id: Self::get_text(row, "client_id")?,
            alert_type: Self::get_text(row, "alert_type")?,
            severity: Self::get_text(row, "severity")?,
            title: Self::get_text(row, "title")?,
            body: Self::get_text(row, "body")?,
            drafted_action: serde_json::from_str(&drafted).unwrap_or_default(),
            status: Self::get_text(row, "status")?,
            created_at: Self::parse_time(&Self::get_text(row, "created_at")?),
        })
    }

    pub async fn list_alerts(&self, status: &str) -> Result<Vec<Alert>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM alerts WHERE status = ?1 ORDER BY created_at DESC")
                .bind(status)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("Alert list: {e}")))?;
        rows.iter().map(Self::row_to_alert).collect()
    }

    /// Advisor verdict on an alert. Returns whether the alert exists.
    pub async fn update_alert_status(&self, id: &str, status: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE alerts SET status = ?1 WHERE id = ?2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("Alert update failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Used by the demo seed, standing in for the external scanner.
    pub async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let drafted = serde_json::to_string(&alert.drafted_action)
            .map_err(|e| StoreError::Storage(format!("Drafted action serialization: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO alerts (id, client_id, alert_type, severity, title, body,
                                drafted_action, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&alert.id)
        .bind(&alert.client_id)
        .bind(&alert.alert_type)
        .bind(&alert.severity)
        .bind(&alert.title)
        .bind(&alert.body)
        .bind(&drafted)
        .bind(&alert.status)
        .bind(alert.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("Alert insert failed: {e}")))?;
        Ok(())
    }

    /// Whether the store has any clients (seed guard).
    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM clients")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Client count: {e}")))?;
        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;
        Ok(cnt == 0)
    }
}
