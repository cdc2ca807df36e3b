//! # Error Handling
//!
//! Error types for Veil Core.
//!
//! ## Propagation Policy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       ERROR PROPAGATION                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Per-message crypto failures (verify/decrypt)                           │
//! │  ─────────────────────────────────────────────                          │
//! │  Absorbed inside the pipeline. Surfaced as per-message state:           │
//! │  `verified = Some(false)` or `decrypted = None`. Never abort a batch.   │
//! │                                                                         │
//! │  Key validation / transport failures                                    │
//! │  ───────────────────────────────────                                    │
//! │  Returned to the caller or converted to a dismissible notification.     │
//! │  History fetch errors degrade to an empty page.                         │
//! │                                                                         │
//! │  Nothing in this crate is fatal to the process. Worst case is a         │
//! │  conversation rendered entirely as "Encrypted"/untrusted.               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for Veil Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Veil Core
///
/// Errors are categorized by domain to make handling clearer and to
/// provide meaningful messages to users.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Key Material Errors
    // ========================================================================
    /// A crypto operation needed a public key and none is loaded
    #[error("No public key loaded for this cipher.")]
    NoPublicKey,

    /// A crypto operation needed a private key and none is loaded
    #[error("No private key loaded. Insert your RSA private key first.")]
    NoPrivateKey,

    /// Key material could not be parsed
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// A candidate private key failed the round-trip challenge
    #[error("The provided private key does not match the public key on record.")]
    KeyMismatch,

    // ========================================================================
    // Crypto Errors
    // ========================================================================
    /// Encryption failed (e.g. plaintext exceeds the key's capacity)
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed: malformed ciphertext or non-matching key.
    /// Callers treat this as "could not decrypt", never as fatal.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Signature generation failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Signature verification failed
    #[error("Signature verification failed")]
    VerificationFailed,

    // ========================================================================
    // Conversation / Store Errors
    // ========================================================================
    /// An operation required an active conversation
    #[error("No active conversation selected.")]
    NoActiveConversation,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// A REST or socket collaborator failed
    #[error("Transport error: {0}")]
    Transport(String),

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors can potentially be resolved by retrying
    /// or reconnecting; they are surfaced as non-blocking notifications.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Check if this error requires user action
    ///
    /// These drive the "insert private key" / "wrong key file" prompts.
    pub fn requires_user_action(&self) -> bool {
        matches!(self, Error::NoPrivateKey | Error::KeyMismatch)
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
