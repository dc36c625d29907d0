//! Context assembly - one bundle per request.
//!
//! Loads the client's profile, accounts, documents, recent conversation
//! window, and knowledge entries into a single immutable snapshot. The
//! bundle used for classification and the one used for dispatch within one
//! request cycle are the same object - no re-fetch between phases.

use std::sync::Arc;

use tracing::debug;

use wealthdesk_core::bundle::{ContextBundle, RECENT_CHAT_WINDOW};
use wealthdesk_core::error::StoreError;
use wealthdesk_store::SqliteStore;

/// Assembles one [`ContextBundle`] per request.
pub struct ContextAssembler {
    store: Arc<SqliteStore>,
}

impl ContextAssembler {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    /// Load the full bundle for a client. `None` when the client is unknown.
    pub async fn assemble(&self, client_id: &str) -> Result<Option<ContextBundle>, StoreError> {
        let Some(profile) = self.store.get_client(client_id).await? else {
            return Ok(None);
        };

        let accounts = self.store.accounts_for(client_id).await?;
        let documents = self.store.documents_for(client_id).await?;
        let recent_chat = self.store.recent_chat(client_id, RECENT_CHAT_WINDOW).await?;
        let knowledge = self.store.knowledge_for(client_id).await?;

        debug!(
            client = %client_id,
            accounts = accounts.len(),
            documents = documents.len(),
            chat = recent_chat.len(),
            knowledge = knowledge.len(),
            "Assembled context bundle"
        );

        Ok(Some(ContextBundle {
            profile,
            accounts,
            documents,
            recent_chat,
            knowledge,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::seeded_store;

    #[tokio::test]
    async fn unknown_client_is_none() {
        let (store, _) = seeded_store().await;
        let assembler = ContextAssembler::new(store);
        assert!(assembler.assemble("no-such-client").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bundle_carries_every_section() {
        let (store, client_id) = seeded_store().await;
        let assembler = ContextAssembler::new(store);
        let bundle = assembler.assemble(&client_id).await.unwrap().unwrap();

        assert_eq!(bundle.profile.id, client_id);
        assert!(!bundle.accounts.is_empty());
        assert!(!bundle.knowledge.is_empty());
        // Most-recent-first chat window
        assert!(bundle.recent_chat.len() <= RECENT_CHAT_WINDOW);
    }
}
