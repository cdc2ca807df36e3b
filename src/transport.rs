//! # Transport Boundaries
//!
//! The two async seams between the core and the outside world: the REST
//! history/read-state API and the live socket's send primitive. The
//! browser host implements these over `fetch` and the websocket; tests
//! implement them with in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::messaging::MessageRecord;

/// The REST side of the chat backend
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Fetch one page of message history with the given peer
    ///
    /// Pages are zero-indexed; an empty page means the history is
    /// exhausted.
    async fn fetch_message_history(
        &self,
        peer: &str,
        page_index: usize,
        page_size: usize,
    ) -> Result<Vec<MessageRecord>>;

    /// Report messages as read
    async fn mark_messages_read(&self, message_ids: &[String]) -> Result<()>;
}

/// The live socket's outbound half
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Send an already-serialized payload over the socket
    async fn send(&self, payload: String) -> Result<()>;
}
