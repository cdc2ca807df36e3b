//! # Reactive Message Store
//!
//! Holds the message list for the active conversation and re-runs the
//! crypto pipeline whenever any dependency changes (conversation switch,
//! key swap, streamed message, pagination merge).
//!
//! ## State Machine
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      STORE STATE MACHINE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │            select_conversation            apply_history                 │
//! │   Empty ───────────────────────► Loading ──────────────► Ready         │
//! │     ▲                                                      │  ▲         │
//! │     │ clear_conversation                        load_older │  │ apply   │
//! │     └──────────────────────────────────────┐               ▼  │         │
//! │                                            └────────── LoadingMore      │
//! │                                                                         │
//! │  Live arrivals are accepted in every state except Empty.                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Staleness
//!
//! Every conversation selection bumps a token that is stamped onto the
//! [`HistoryRequest`] handed to the fetching caller. A page that resolves
//! after the conversation changed carries a stale token and is dropped,
//! never merged — cancellation by staleness, not true cancellation.
//!
//! Raw wire messages are retained across reprocessing runs, so a key swap
//! re-derives plaintext and trust state without a re-fetch.

pub mod service;

use crate::error::Result;
use crate::messaging::pipeline;
use crate::messaging::{DirectMessage, DisplayMessage, Peer};
use crate::session::resolver::CipherResolver;
use crate::session::SessionContext;

/// Messages fetched per history page (the REST layer's page size)
pub const DEFAULT_PAGE_SIZE: usize = 15;

/// Lifecycle of the active conversation view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePhase {
    /// No conversation selected
    Empty,
    /// Initial page fetch in flight
    Loading,
    /// Messages present, pipeline applied
    Ready,
    /// Pagination fetch in flight, existing messages retained
    LoadingMore,
}

/// A history fetch the caller must perform on the store's behalf
///
/// The token ties the eventual result back to the conversation that
/// requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    /// Conversation token at request time
    pub token: u64,
    /// Peer whose history to fetch
    pub peer: String,
    /// Zero-based page index
    pub page: usize,
    /// Page size
    pub size: usize,
}

/// Outcome of a live message arrival
#[derive(Debug, PartialEq, Eq)]
pub enum Arrival {
    /// The message belonged to the active conversation and was merged
    Applied {
        /// Ids to push to the read-state endpoint
        read_receipts: Vec<String>,
    },
    /// The message belongs to another conversation; only the unread
    /// counter cares
    OtherConversation {
        /// Who sent it
        sender: String,
    },
}

/// The message list for the active conversation plus the machinery to keep
/// its derived state current
pub struct MessageStore {
    phase: StorePhase,
    peer: Option<Peer>,
    messages: Vec<DisplayMessage>,
    next_page: usize,
    page_size: usize,
    token: u64,
    resolver: CipherResolver,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    /// Create an empty store with the default page size
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create an empty store with a custom page size
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            phase: StorePhase::Empty,
            peer: None,
            messages: Vec::new(),
            next_page: 0,
            page_size,
            token: 0,
            resolver: CipherResolver::new(),
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> StorePhase {
        self.phase
    }

    /// The active conversation peer, if any
    pub fn active_peer(&self) -> Option<&Peer> {
        self.peer.as_ref()
    }

    /// The processed message list for the active conversation
    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    /// Select a conversation
    ///
    /// Clears previously held messages, invalidates in-flight fetches and
    /// returns the page-0 request the caller must perform.
    pub fn select_conversation(&mut self, peer: Peer) -> HistoryRequest {
        self.token += 1;
        self.phase = StorePhase::Loading;
        self.messages.clear();
        self.next_page = 0;

        let request = HistoryRequest {
            token: self.token,
            peer: peer.username.clone(),
            page: 0,
            size: self.page_size,
        };

        tracing::debug!(peer = %peer.username, token = self.token, "conversation selected");
        self.peer = Some(peer);
        request
    }

    /// Deselect the conversation and drop its messages
    pub fn clear_conversation(&mut self) {
        self.token += 1;
        self.phase = StorePhase::Empty;
        self.peer = None;
        self.messages.clear();
        self.next_page = 0;
    }

    /// Request the next (older) history page
    ///
    /// Only valid in `Ready`; returns `None` otherwise.
    pub fn load_older(&mut self) -> Option<HistoryRequest> {
        if self.phase != StorePhase::Ready {
            return None;
        }
        let peer = self.peer.as_ref()?;

        self.phase = StorePhase::LoadingMore;
        Some(HistoryRequest {
            token: self.token,
            peer: peer.username.clone(),
            page: self.next_page,
            size: self.page_size,
        })
    }

    /// Merge a resolved history page
    ///
    /// A page carrying a stale token is dropped without touching the
    /// store. Older messages are prepended to the retained list and the
    /// whole merged list is re-run through the pipeline. Returns the ids
    /// to push to the read-state endpoint.
    pub fn apply_history(
        &mut self,
        request: &HistoryRequest,
        page: Vec<DirectMessage>,
        session: &SessionContext,
    ) -> Result<Vec<String>> {
        if request.token != self.token {
            tracing::debug!(
                stale = request.token,
                current = self.token,
                "dropping stale history page"
            );
            return Ok(Vec::new());
        }

        if !page.is_empty() {
            self.next_page = request.page + 1;
        }

        // Older messages land before everything already held
        let mut merged: Vec<DisplayMessage> =
            page.into_iter().map(DisplayMessage::new).collect();
        merged.append(&mut self.messages);
        self.messages = merged;

        self.phase = StorePhase::Ready;
        self.reprocess(session)
    }

    /// Handle a live direct message from the transport
    ///
    /// Messages for the active conversation are appended and the full list
    /// reprocessed; anything else is reported for the unread counter only.
    pub fn message_arrived(
        &mut self,
        message: DirectMessage,
        session: &SessionContext,
    ) -> Result<Arrival> {
        let belongs = match &self.peer {
            None => false,
            Some(peer) => {
                message.sender == peer.username
                    || (message.sender == session.username() && message.recipient == peer.username)
            }
        };

        if !belongs {
            return Ok(Arrival::OtherConversation {
                sender: message.sender,
            });
        }

        self.messages.push(DisplayMessage::new(message));
        let read_receipts = self.reprocess(session)?;
        Ok(Arrival::Applied { read_receipts })
    }

    /// Re-derive ciphers and re-run the pipeline over the retained list
    ///
    /// This is the single explicit recomputation point: callable after any
    /// dependency change (key swap, conversation switch, merge). When the
    /// cipher pair changed, derived state is reset first so reprocessing
    /// starts from the original wire copies. With no active conversation
    /// the pipeline does not run.
    ///
    /// Returns the ids of messages that became readable and unread —
    /// addressed to the local user, in the active conversation, with the
    /// private key loaded — after optimistically flipping their local
    /// read flag.
    pub fn reprocess(&mut self, session: &SessionContext) -> Result<Vec<String>> {
        let resolution = self.resolver.resolve(self.peer.as_ref(), session)?;
        let Some(pair) = resolution.ciphers else {
            return Ok(Vec::new());
        };

        if resolution.changed {
            for message in &mut self.messages {
                message.reset_derived();
            }
        }

        self.messages = pipeline::process(
            std::mem::take(&mut self.messages),
            session.username(),
            &pair.self_cipher,
            &pair.peer_cipher,
        );

        Ok(self.collect_read_receipts(session))
    }

    /// Ids of unread messages addressed to the local user, flipped to read
    /// optimistically (the server is told asynchronously; failure is
    /// reconciled by the next page load)
    fn collect_read_receipts(&mut self, session: &SessionContext) -> Vec<String> {
        if !session.has_private_key() {
            return Vec::new();
        }
        let Some(peer) = self.peer.as_ref() else {
            return Vec::new();
        };

        let mut ids = Vec::new();
        for message in &mut self.messages {
            let wire = &mut message.wire;
            if !wire.is_read
                && wire.recipient == session.username()
                && wire.sender == peer.username
            {
                if let Some(id) = wire.id.clone() {
                    ids.push(id);
                    wire.is_read = true;
                }
            }
        }
        ids
    }
}

// ============================================================================
// TESTS
// ============================================================================
