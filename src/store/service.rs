//! # Chat Service
//!
//! The async orchestration layer: drives the [`MessageStore`] with fetches
//! from the REST API, feeds it socket traffic, and fans decoded events out
//! on the [`EventBus`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           SERVICE WIRING                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   socket frame ──► handle_frame ──► ServerEvent                         │
//! │                                       │                                 │
//! │                      Direct ──► MessageStore (active conversation)      │
//! │                              └─► unread counter (other conversations)   │
//! │                      all    ──► EventBus                                │
//! │                                                                         │
//! │   open_conversation / load_older ──► ChatApi fetch ──► apply_history    │
//! │   send_message ──► compose_direct ──► MessageTransport                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Locking rule: session before store, and no lock is ever held across an
//! await. Fetches are performed lock-free and reconciled by the store's
//! staleness token.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::crypto::{keys, Cipher};
use crate::error::{Error, Result};
use crate::events::EventBus;
use crate::messaging::{
    compose_direct, DirectMessage, DisplayMessage, Notification, NotificationStatus, Peer,
    ServerEvent,
};
use crate::session::SessionContext;
use crate::store::{Arrival, HistoryRequest, MessageStore, StorePhase};
use crate::transport::{ChatApi, MessageTransport};

/// Orchestrates the store, the transports, and the event bus for one
/// logged-in session
pub struct ChatService {
    api: Arc<dyn ChatApi>,
    transport: Arc<dyn MessageTransport>,
    bus: Arc<EventBus>,
    session: Mutex<SessionContext>,
    store: Mutex<MessageStore>,
    unread: Mutex<HashMap<String, u32>>,
}

impl ChatService {
    /// Wire up a service for an authenticated session
    pub fn new(
        api: Arc<dyn ChatApi>,
        transport: Arc<dyn MessageTransport>,
        bus: Arc<EventBus>,
        session: SessionContext,
    ) -> Self {
        Self {
            api,
            transport,
            bus,
            session: Mutex::new(session),
            store: Mutex::new(MessageStore::new()),
            unread: Mutex::new(HashMap::new()),
        }
    }

    /// The shared event bus
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Snapshot of the active conversation's processed messages
    pub fn messages(&self) -> Vec<DisplayMessage> {
        self.store.lock().messages().to_vec()
    }

    /// Current store phase
    pub fn phase(&self) -> StorePhase {
        self.store.lock().phase()
    }

    /// Unread count for one peer
    pub fn unread_count(&self, peer: &str) -> u32 {
        self.unread.lock().get(peer).copied().unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Conversation lifecycle
    // ------------------------------------------------------------------

    /// Switch to a conversation and load its first history page
    ///
    /// Clears the peer's unread counter. A failed fetch degrades to an
    /// empty conversation and a notification on the bus rather than an
    /// error.
    pub async fn open_conversation(&self, peer: Peer) -> Result<()> {
        self.unread.lock().remove(&peer.username);
        let request = self.store.lock().select_conversation(peer);
        self.fetch_and_apply(request).await
    }

    /// Deselect the active conversation
    pub fn close_conversation(&self) {
        self.store.lock().clear_conversation();
    }

    /// Load the next (older) history page, if the store is ready for one
    pub async fn load_older_messages(&self) -> Result<()> {
        let Some(request) = self.store.lock().load_older() else {
            return Ok(());
        };
        self.fetch_and_apply(request).await
    }

    async fn fetch_and_apply(&self, request: HistoryRequest) -> Result<()> {
        let page = match self
            .api
            .fetch_message_history(&request.peer, request.page, request.size)
            .await
        {
            Ok(records) => records.into_iter().map(DirectMessage::from).collect(),
            Err(err) => {
                tracing::warn!(peer = %request.peer, page = request.page, %err, "history fetch failed");
                self.bus.publish(&ServerEvent::Notification(Notification {
                    title: "Message history".into(),
                    message: err.to_string(),
                    status: NotificationStatus::Error,
                }));
                Vec::new()
            }
        };

        let receipts = {
            let session = self.session.lock();
            self.store.lock().apply_history(&request, page, &session)?
        };
        self.push_read_receipts(receipts).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Encrypt, sign, and send a plaintext to the active conversation peer
    ///
    /// ## Errors
    ///
    /// - `NoActiveConversation` if no peer is selected
    /// - `NoPrivateKey` if the private key is not loaded (the UI prompts
    ///   for it on this)
    pub async fn send_message(&self, plaintext: &str) -> Result<()> {
        let payload = {
            let session = self.session.lock();
            let store = self.store.lock();

            let peer = store.active_peer().ok_or(Error::NoActiveConversation)?;
            if !session.has_private_key() {
                return Err(Error::NoPrivateKey);
            }

            let self_cipher =
                Cipher::new(Some(session.public_key_pem()), session.private_key_pem())?;
            let peer_cipher = Cipher::from_public(&keys::decode_key_b64(&peer.public_key)?)?;

            compose_direct(plaintext, &peer.username, &self_cipher, &peer_cipher)?.to_json()?
        };

        self.transport.send(payload).await
    }

    // ------------------------------------------------------------------
    // Inbound socket traffic
    // ------------------------------------------------------------------

    /// Decode and handle one raw socket frame
    pub async fn handle_frame(&self, raw: &str) -> Result<()> {
        let event = ServerEvent::from_json(raw)?;
        self.handle_event(event).await
    }

    /// Handle a decoded socket event
    ///
    /// Direct messages are routed into the store (active conversation) or
    /// the unread counters (any other). Every event is then republished on
    /// the bus.
    pub async fn handle_event(&self, event: ServerEvent) -> Result<()> {
        if let ServerEvent::Direct(message) = &event {
            let arrival = {
                let session = self.session.lock();
                self.store.lock().message_arrived(message.clone(), &session)?
            };
            match arrival {
                Arrival::Applied { read_receipts } => {
                    self.push_read_receipts(read_receipts).await;
                }
                Arrival::OtherConversation { sender } => {
                    let is_own = sender == self.session.lock().username();
                    if !is_own {
                        *self.unread.lock().entry(sender).or_insert(0) += 1;
                    }
                }
            }
        }

        if let ServerEvent::ServerError(error) = &event {
            tracing::warn!(message = %error.message, "server reported an error");
        }

        self.bus.publish(&event);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Key management
    // ------------------------------------------------------------------

    /// Install the user's private key and reprocess retained messages
    pub async fn install_private_key(&self, pem: &str) -> Result<()> {
        self.session.lock().install_private_key(pem)?;
        self.refresh_messages().await
    }

    /// Remove the private key and reprocess (plaintext disappears)
    pub async fn remove_private_key(&self) -> Result<()> {
        self.session.lock().remove_private_key();
        self.refresh_messages().await
    }

    /// Change the private-key persistence opt-in
    pub fn set_key_persistence(&self, opt_in: bool) -> Result<()> {
        self.session.lock().set_key_persistence(opt_in)
    }

    /// Whether the session currently holds a private key
    pub fn has_private_key(&self) -> bool {
        self.session.lock().has_private_key()
    }

    /// Re-derive ciphers and rerun the pipeline over retained messages
    async fn refresh_messages(&self) -> Result<()> {
        let receipts = {
            let session = self.session.lock();
            self.store.lock().reprocess(&session)?
        };
        self.push_read_receipts(receipts).await;
        Ok(())
    }

    /// Tell the server which messages were read; best-effort, the local
    /// flip already happened
    async fn push_read_receipts(&self, ids: Vec<String>) {
        if ids.is_empty() {
            return;
        }
        if let Err(err) = self.api.mark_messages_read(&ids).await {
            tracing::warn!(count = ids.len(), %err, "read-state update failed");
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
