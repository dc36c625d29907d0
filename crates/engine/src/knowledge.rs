//! Knowledge store mutation - the add and remove paths.
//!
//! Additions skip blank and over-length candidates silently. Removals
//! resolve keyword phrases to entry ids through a two-tier matcher: a
//! reasoning call instructed to match generously, then a deterministic
//! substring fallback when that call fails. Both tiers only ever return ids
//! present in the client's entry list.

use std::sync::Arc;

use tracing::{info, warn};

use wealthdesk_core::client::{KNOWLEDGE_MAX_CHARS, KnowledgeEntry};
use wealthdesk_core::error::{ReasoningError, StoreError};
use wealthdesk_core::reasoning::Reasoning;
use wealthdesk_reasoning::parse_json_reply;
use wealthdesk_store::SqliteStore;

const MATCH_INSTRUCTIONS: &str = "You are a helper that matches knowledge base entries to a \
deletion request. Given a list of entries (with IDs) and the advisor's description of what to \
remove, return the IDs of entries that should be deleted. Match generously — if an entry is \
related to the topic the advisor wants removed, include it.\n\n\
Respond in JSON only: {\"delete_ids\": [\"id1\", \"id2\"]}";

/// Applies knowledge-base mutations for one client at a time.
pub struct KnowledgeMutator {
    store: Arc<SqliteStore>,
    matcher: Arc<dyn Reasoning>,
}

impl KnowledgeMutator {
    pub fn new(store: Arc<SqliteStore>, matcher: Arc<dyn Reasoning>) -> Self {
        Self { store, matcher }
    }

    /// Persist each non-empty, length-bounded candidate as one entry.
    /// Blank and over-length candidates are skipped, not errors.
    pub async fn apply_add(
        &self,
        client_id: &str,
        entries: &[String],
    ) -> Result<Vec<KnowledgeEntry>, StoreError> {
        let mut created = Vec::new();
        for candidate in entries {
            let content = candidate.trim();
            if content.is_empty() || content.chars().count() > KNOWLEDGE_MAX_CHARS {
                continue;
            }
            created.push(self.store.add_knowledge(client_id, content, "advisor").await?);
        }
        info!(client = %client_id, added = created.len(), "Knowledge entries added");
        Ok(created)
    }

    /// Resolve keywords against the client's entries, delete the matches,
    /// and return the deleted entries. Zero matches is not an error.
    pub async fn apply_remove(
        &self,
        client_id: &str,
        keywords: &[String],
    ) -> Result<Vec<KnowledgeEntry>, StoreError> {
        let entries = self.store.knowledge_for(client_id).await?;
        if entries.is_empty() || keywords.is_empty() {
            return Ok(Vec::new());
        }

        let matched_ids = match self.match_remote(&entries, keywords).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Deletion matcher failed; using substring fallback");
                fuzzy_match(&entries, keywords)
            }
        };

        let mut removed = Vec::new();
        for id in matched_ids {
            // Only ids present in the supplied entry list are honored.
            let Some(entry) = entries.iter().find(|e| e.id == id) else {
                continue;
            };
            if self.store.delete_knowledge(&id).await? {
                removed.push(entry.clone());
            }
        }

        info!(client = %client_id, removed = removed.len(), "Knowledge entries removed");
        Ok(removed)
    }

    /// Primary tier: ask the reasoning backend which entries match.
    async fn match_remote(
        &self,
        entries: &[KnowledgeEntry],
        keywords: &[String],
    ) -> Result<Vec<String>, ReasoningError> {
        let entry_lines: Vec<String> = entries
            .iter()
            .map(|e| format!("  [{}]: {}", e.id, e.content))
            .collect();
        let payload = format!(
            "Advisor wants to remove: {}\n\nExisting entries:\n{}",
            keywords.join(", "),
            entry_lines.join("\n")
        );

        let raw = self.matcher.complete(MATCH_INSTRUCTIONS, &payload).await?;
        let value = parse_json_reply(&raw)?;
        Ok(value["delete_ids"]
            .as_array()
            .map(|ids| {
                ids.iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Fallback tier: an entry matches if any keyword token longer than two
/// characters appears, case-insensitively, in the entry's content. First
/// match wins per entry; no duplicates.
fn fuzzy_match(entries: &[KnowledgeEntry], keywords: &[String]) -> Vec<String> {
    let mut matched = Vec::new();
    for entry in entries {
        let content = entry.content.to_lowercase();
        for keyword in keywords {
            let hit = keyword
                .to_lowercase()
                .split_whitespace()
                .any(|word| word.len() > 2 && content.contains(word));
            if hit {
                matched.push(entry.id.clone());
                break;
            }
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedReasoning, seeded_store};

    fn mutator(store: Arc<SqliteStore>, replies: Vec<&str>) -> KnowledgeMutator {
        KnowledgeMutator::new(store, Arc::new(ScriptedReasoning::with_replies(replies)))
    }

    fn failing_mutator(store: Arc<SqliteStore>) -> KnowledgeMutator {
        KnowledgeMutator::new(store, Arc::new(ScriptedReasoning::failing()))
    }

    #[tokio::test]
    async fn add_skips_blank_and_overlength() {
        let (store, client_id) = seeded_store().await;
        let mutator = failing_mutator(store.clone());

        let entries = vec![
            "Prefers morning meetings".to_string(),
            "   ".to_string(),
            "x".repeat(KNOWLEDGE_MAX_CHARS + 1),
        ];
        let created = mutator.apply_add(&client_id, &entries).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].content, "Prefers morning meetings");
    }

    #[tokio::test]
    async fn add_then_remove_round_trip() {
        let (store, client_id) = seeded_store().await;
        let mutator = failing_mutator(store.clone());

        let before = store.knowledge_for(&client_id).await.unwrap().len();
        mutator
            .apply_add(&client_id, &["Considering a cottage near Muskoka".to_string()])
            .await
            .unwrap();

        // Matcher fails -> substring fallback; "cottage" (>2 chars) matches
        let removed = mutator
            .apply_remove(&client_id, &["cottage plans".to_string()])
            .await
            .unwrap();

        assert_eq!(removed.len(), 1);
        assert!(removed[0].content.contains("cottage"));
        assert_eq!(store.knowledge_for(&client_id).await.unwrap().len(), before);
    }

    #[tokio::test]
    async fn remote_matcher_ids_are_honored() {
        let (store, client_id) = seeded_store().await;
        let entries = store.knowledge_for(&client_id).await.unwrap();
        let target = entries[0].id.clone();

        let reply = format!(r#"{{"delete_ids": ["{target}"]}}"#);
        let mutator = mutator(store.clone(), vec![&reply]);

        let removed = mutator
            .apply_remove(&client_id, &["email preference".to_string()])
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, target);
    }

    #[tokio::test]
    async fn fabricated_ids_are_dropped() {
        let (store, client_id) = seeded_store().await;
        let mutator = mutator(
            store.clone(),
            vec![r#"{"delete_ids": ["made-up-id-1", "made-up-id-2"]}"#],
        );

        let removed = mutator
            .apply_remove(&client_id, &["anything".to_string()])
            .await
            .unwrap();
        assert!(removed.is_empty());
        // Nothing deleted
        assert_eq!(store.knowledge_for(&client_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn zero_match_remove_is_success() {
        let (store, client_id) = seeded_store().await;
        let mutator = failing_mutator(store.clone());

        let removed = mutator
            .apply_remove(&client_id, &["quantum blockchain".to_string()])
            .await
            .unwrap();
        assert!(removed.is_empty());
    }

    #[tokio::test]
    async fn short_tokens_do_not_match() {
        let (store, client_id) = seeded_store().await;
        let mutator = failing_mutator(store.clone());

        // Every token has length <= 2; the fallback must not match "on"
        // appearing inside "phone" etc.
        let removed = mutator
            .apply_remove(&client_id, &["on it of".to_string()])
            .await
            .unwrap();
        assert!(removed.is_empty());
    }

    #[test]
    fn fuzzy_first_match_wins_no_duplicates() {
        let entry = |id: &str, content: &str| KnowledgeEntry {
            id: id.into(),
            client_id: "c1".into(),
            content: content.into(),
            source: "advisor".into(),
            created_at: chrono::Utc::now(),
        };
        let entries = vec![
            entry("e1", "Loves sailing and sailing trips"),
            entry("e2", "Allergic to shellfish"),
        ];
        let keywords = vec!["sailing".to_string(), "trips".to_string()];
        // e1 matches on the first keyword and is listed once
        assert_eq!(fuzzy_match(&entries, &keywords), vec!["e1".to_string()]);
    }
}
