//! In-memory session — useful for testing and ephemeral conversations.

use async_trait::async_trait;
use tokio::sync::Mutex;
use windlass_core::error::SessionError;
use windlass_core::item::ConversationItem;
use windlass_core::session::Session;

/// A session that stores items in a Vec behind a mutex.
///
/// History does not survive the process; use the SQLite session for
/// cross-run memory.
#[derive(Default)]
pub struct InMemorySession {
    items: Mutex<Vec<ConversationItem>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Session for InMemorySession {
    async fn get_items(
        &self,
        limit: Option<usize>,
    ) -> std::result::Result<Vec<ConversationItem>, SessionError> {
        let items = self.items.lock().await;
        match limit {
            None => Ok(items.clone()),
            Some(n) => {
                let start = items.len().saturating_sub(n);
                Ok(items[start..].to_vec())
            }
        }
    }

    async fn add_items(
        &self,
        new_items: Vec<ConversationItem>,
    ) -> std::result::Result<(), SessionError> {
        if new_items.is_empty() {
            return Ok(());
        }
        self.items.lock().await.extend(new_items);
        Ok(())
    }

    async fn pop_item(&self) -> std::result::Result<Option<ConversationItem>, SessionError> {
        Ok(self.items.lock().await.pop())
    }

    async fn clear(&self) -> std::result::Result<(), SessionError> {
        self.items.lock().await.clear();
        Ok(())
    }
}
