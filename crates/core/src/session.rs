//! Session contract — durable or ephemeral ordered conversation history.
//!
//! A session is an append-only log of conversation items keyed by a session
//! identifier, owned by the caller. The runner only reads and appends; the
//! destructive operations (`pop_item`, `clear`) exist for callers. A session
//! instance is a shared mutable resource: implementations serialize their
//! internal state so a concurrent read never observes a partial append.

use crate::error::SessionError;
use crate::item::ConversationItem;
use async_trait::async_trait;

#[async_trait]
pub trait Session: Send + Sync {
    /// Retrieve the conversation history for this session.
    ///
    /// With `limit = None` all items are returned. With `Some(n)`, the most
    /// recent `n` items are returned, still in chronological order.
    async fn get_items(
        &self,
        limit: Option<usize>,
    ) -> std::result::Result<Vec<ConversationItem>, SessionError>;

    /// Append a batch of items. The batch is all-or-nothing.
    async fn add_items(
        &self,
        items: Vec<ConversationItem>,
    ) -> std::result::Result<(), SessionError>;

    /// Remove and return the most recent item, or `None` when empty.
    async fn pop_item(&self) -> std::result::Result<Option<ConversationItem>, SessionError>;

    /// Remove all items for this session.
    async fn clear(&self) -> std::result::Result<(), SessionError>;
}
