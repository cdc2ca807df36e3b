//! # Messaging Module
//!
//! Wire types and message composition for the Veil chat protocol.
//!
//! ## Wire Protocol
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    OUTGOING DIRECT MESSAGE (JSON)                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  {                                                                      │
//! │    "recipient": "bob",                                                  │
//! │    "message": "...",                  // ciphertext to bob's public key │
//! │    "message_self_encrypted": "...",   // ciphertext to own public key   │
//! │    "message_signature": "...",        // sign(message)                  │
//! │    "message_self_encrypted_signature": "..."                            │
//! │  }                                                                      │
//! │                                                                         │
//! │  Both ciphertexts are signed independently with the sender's private    │
//! │  key. The self-encrypted copy is what lets the sender re-read their     │
//! │  own sent messages later.                                               │
//! │                                                                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                      SOCKET FRAMES (JSON, tag "TYPE")                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SOCKET_MESSAGE_DIRECT         - encrypted direct message               │
//! │  SOCKET_MESSAGE_NOTIFICATION   - server-pushed toast                    │
//! │  SOCKET_MESSAGE_FRIEND_REQUEST - incoming friend request                │
//! │  SOCKET_MESSAGE_STATUS_CHANGE  - a friend went ONLINE/OFFLINE           │
//! │  SOCKET_MESSAGE_ONLINE_USERS   - initial online-friends snapshot        │
//! │  SOCKET_MESSAGE_ERROR          - server-side error report               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The REST history endpoint speaks the same direct-message shape but with
//! `content*` field names; [`MessageRecord`] performs the renaming.

pub mod pipeline;

use serde::{Deserialize, Serialize};

use crate::crypto::Cipher;
use crate::error::Result;

/// A direct message in its transmitted, opaque-ciphertext form
///
/// This is the shape delivered by the live socket. `message` is encrypted
/// under the recipient's public key; `message_self_encrypted` is the same
/// plaintext encrypted under the sender's own public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    /// Server-assigned message id (absent on locally echoed messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Sender username
    pub sender: String,
    /// Recipient username
    pub recipient: String,
    /// Ciphertext encrypted to the recipient's public key (base64)
    pub message: String,
    /// Signature over `message`, made with the sender's private key (hex)
    pub message_signature: String,
    /// Ciphertext encrypted to the sender's own public key (base64)
    pub message_self_encrypted: String,
    /// Signature over `message_self_encrypted` (hex)
    pub message_self_encrypted_signature: String,
    /// Whether the recipient has read the message
    #[serde(default)]
    pub is_read: bool,
}

/// A direct message as returned by the REST history endpoint
///
/// Same payload as [`DirectMessage`], different field names (`content*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Server-assigned message id
    #[serde(default)]
    pub id: Option<String>,
    /// Sender username
    pub sender: String,
    /// Recipient username
    pub recipient: String,
    /// Ciphertext encrypted to the recipient's public key (base64)
    pub content: String,
    /// Signature over `content` (hex)
    pub content_signature: String,
    /// Ciphertext encrypted to the sender's own public key (base64)
    pub content_self_encrypted: String,
    /// Signature over `content_self_encrypted` (hex)
    pub content_self_encrypted_signature: String,
    /// Whether the recipient has read the message
    #[serde(default)]
    pub is_read: bool,
}

impl From<MessageRecord> for DirectMessage {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            sender: record.sender,
            recipient: record.recipient,
            message: record.content,
            message_signature: record.content_signature,
            message_self_encrypted: record.content_self_encrypted,
            message_self_encrypted_signature: record.content_self_encrypted_signature,
            is_read: record.is_read,
        }
    }
}

/// A direct message plus its derived, ephemeral display state
///
/// Never persisted; recomputed from the retained [`DirectMessage`] and the
/// current key material on every relevant state change.
///
/// Invariant: `verified` is computed before `decrypted` is trusted. An
/// unverified message may still carry attempted plaintext but must be
/// rendered as untrusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    /// The retained wire form (reprocessing always starts from this)
    pub wire: DirectMessage,
    /// Decrypted plaintext, present only if decryption succeeded
    pub decrypted: Option<String>,
    /// Signature check result, present only if verification ran
    pub verified: Option<bool>,
}

impl DisplayMessage {
    /// Wrap a wire message with no derived state yet
    pub fn new(wire: DirectMessage) -> Self {
        Self {
            wire,
            decrypted: None,
            verified: None,
        }
    }

    /// Whether the signature check ran and passed
    pub fn is_trusted(&self) -> bool {
        self.verified == Some(true)
    }

    /// The plaintext body, if decryption succeeded
    ///
    /// `None` renders as "Encrypted" in the UI.
    pub fn body(&self) -> Option<&str> {
        self.decrypted.as_deref()
    }

    /// Drop all derived state, back to the raw wire form
    ///
    /// Called when the cipher pair changes so reprocessing starts from the
    /// original ciphertexts, never from stale plaintext.
    pub fn reset_derived(&mut self) {
        self.decrypted = None;
        self.verified = None;
    }
}

/// A chat peer as served by the friend-list REST layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Peer username
    pub username: String,
    /// Peer's public key, base64-encoded PEM
    pub public_key: String,
}

// ============================================================================
// SOCKET EVENT UNION
// ============================================================================

/// Everything the live socket can deliver, as a closed tagged union
///
/// The server tags frames with a `TYPE` field; unknown tags fail
/// deserialization rather than being silently dropped as a half-parsed
/// frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "TYPE")]
pub enum ServerEvent {
    /// An encrypted direct message
    #[serde(rename = "SOCKET_MESSAGE_DIRECT")]
    Direct(DirectMessage),
    /// A server-pushed notification toast
    #[serde(rename = "SOCKET_MESSAGE_NOTIFICATION")]
    Notification(Notification),
    /// An incoming friend request
    #[serde(rename = "SOCKET_MESSAGE_FRIEND_REQUEST")]
    FriendRequest(FriendRequest),
    /// A friend's presence changed
    #[serde(rename = "SOCKET_MESSAGE_STATUS_CHANGE")]
    StatusChange(StatusChange),
    /// Snapshot of currently online friends, sent once after connect
    #[serde(rename = "SOCKET_MESSAGE_ONLINE_USERS")]
    OnlineUsers(OnlineUsersSnapshot),
    /// A server-side error report
    #[serde(rename = "SOCKET_MESSAGE_ERROR")]
    ServerError(ServerError),
}

impl ServerEvent {
    /// Parse a raw socket frame
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| crate::error::Error::Deserialization(e.to_string()))
    }
}

/// A dismissible, non-blocking notification for the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Short headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Severity for rendering
    pub status: NotificationStatus,
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    /// Something went wrong
    Error,
    /// Something succeeded
    Success,
    /// Neutral information
    Info,
}

/// An incoming friend request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    /// Username of the requester
    pub sender_username: String,
    /// Server-side id used to accept/decline
    pub friend_request_id: String,
}

/// A friend's presence changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// The friend whose presence changed
    pub user_id: String,
    /// New presence
    pub status: Presence,
}

/// Online/offline presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Presence {
    /// Friend is connected
    Online,
    /// Friend is disconnected
    Offline,
}

/// Snapshot of online friends delivered right after connecting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUsersSnapshot {
    /// Usernames currently online
    pub online_users: Vec<String>,
}

/// A server-side error report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Human-readable description
    pub message: String,
}

// ============================================================================
// OUTGOING MESSAGE COMPOSITION
// ============================================================================

/// A fully-formed outgoing direct message, ready for the transport's send
/// primitive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Recipient username
    pub recipient: String,
    /// Ciphertext to the recipient's public key (base64)
    pub message: String,
    /// Ciphertext to the sender's own public key (base64)
    pub message_self_encrypted: String,
    /// Signature over `message` (hex)
    pub message_signature: String,
    /// Signature over `message_self_encrypted` (hex)
    pub message_self_encrypted_signature: String,
}

impl OutgoingMessage {
    /// Serialize to the JSON the transport sends
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }
}

/// Compose a fully-formed outgoing direct message
///
/// Encrypts the plaintext twice (to the peer and to self), then signs each
/// ciphertext independently with the sender's private key.
///
/// ## Errors
///
/// - `NoPublicKey` if either cipher is missing its public half
/// - `NoPrivateKey` if the sender's cipher has no private key loaded
///   (the UI prompts "insert private key" on this)
/// - `EncryptionFailed` if the plaintext exceeds a key's capacity
pub fn compose_direct(
    plaintext: &str,
    recipient: &str,
    self_cipher: &Cipher,
    peer_cipher: &Cipher,
) -> Result<OutgoingMessage> {
    let message = peer_cipher.encrypt(plaintext)?;
    let message_self_encrypted = self_cipher.encrypt(plaintext)?;

    let message_signature = self_cipher.sign(&message)?;
    let message_self_encrypted_signature = self_cipher.sign(&message_self_encrypted)?;

    Ok(OutgoingMessage {
        recipient: recipient.to_owned(),
        message,
        message_self_encrypted,
        message_signature,
        message_self_encrypted_signature,
    })
}

// ============================================================================
// TESTS
// ============================================================================
