//! # Message Crypto Pipeline
//!
//! Turns a batch of wire messages into verified + decrypted display
//! messages. The pipeline never fails a batch: every crypto failure is
//! absorbed into per-message state.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         PER-MESSAGE FLOW                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Step 1: Verify signature (always recomputed)                           │
//! │  ────────────────────────────────────────────                           │
//! │  self-sent:  verify(message_self_encrypted, its signature)              │
//! │              with the local user's public key                           │
//! │  peer-sent:  verify(message, its signature)                             │
//! │              with the peer's public key                                 │
//! │  failure ──► verified = Some(false), keep going                         │
//! │                                                                         │
//! │  Step 2: Decrypt (only if a private key is loaded)                      │
//! │  ─────────────────────────────────────────────────                      │
//! │  already decrypted ──► keep as-is (idempotent)                          │
//! │  self-sent:  decrypt(message_self_encrypted)                            │
//! │  peer-sent:  decrypt(message)                                           │
//! │  failure ──► decrypted = None, renders as "Encrypted"                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! When the cipher pair changes the caller resets the derived state first
//! ([`DisplayMessage::reset_derived`]) so reprocessing starts from the
//! retained wire copies, never from already-decrypted state.

use crate::crypto::Cipher;
use crate::messaging::{DirectMessage, DisplayMessage};

/// Run the verify-then-decrypt pipeline over a batch of display messages
///
/// `self_cipher` belongs to the local user (`self_username`); `peer_cipher`
/// to the conversation partner. Verification runs on every call; decryption
/// is skipped for the whole batch when `self_cipher` has no private key,
/// and per message when `decrypted` is already set.
pub fn process(
    messages: Vec<DisplayMessage>,
    self_username: &str,
    self_cipher: &Cipher,
    peer_cipher: &Cipher,
) -> Vec<DisplayMessage> {
    let decrypt_enabled = self_cipher.has_private_key();

    messages
        .into_iter()
        .map(|mut display| {
            let self_sent = display.wire.sender == self_username;

            display.verified = Some(verify_one(&display.wire, self_sent, self_cipher, peer_cipher));

            if decrypt_enabled && display.decrypted.is_none() {
                display.decrypted = decrypt_one(&display.wire, self_sent, self_cipher);
            }

            display
        })
        .collect()
}

/// Wrap raw wire messages and run the pipeline over them
pub fn process_wire(
    messages: Vec<DirectMessage>,
    self_username: &str,
    self_cipher: &Cipher,
    peer_cipher: &Cipher,
) -> Vec<DisplayMessage> {
    process(
        messages.into_iter().map(DisplayMessage::new).collect(),
        self_username,
        self_cipher,
        peer_cipher,
    )
}

/// Signature check for one message; any failure means "unverified"
///
/// Self-sent messages verify the self-encrypted copy against the local
/// user's key (proves the stored copy was not tampered with); peer-sent
/// messages verify the primary ciphertext against the peer's key (proves
/// the peer, not an impostor, produced it).
fn verify_one(
    wire: &DirectMessage,
    self_sent: bool,
    self_cipher: &Cipher,
    peer_cipher: &Cipher,
) -> bool {
    let result = if self_sent {
        self_cipher.verify(
            &wire.message_self_encrypted,
            &wire.message_self_encrypted_signature,
        )
    } else {
        peer_cipher.verify(&wire.message, &wire.message_signature)
    };

    match result {
        Ok(verified) => verified,
        Err(err) => {
            tracing::debug!(sender = %wire.sender, %err, "signature check unavailable");
            false
        }
    }
}

/// Decryption attempt for one message; failure leaves the message encrypted
fn decrypt_one(wire: &DirectMessage, self_sent: bool, self_cipher: &Cipher) -> Option<String> {
    let ciphertext = if self_sent {
        &wire.message_self_encrypted
    } else {
        &wire.message
    };

    match self_cipher.decrypt(ciphertext) {
        Ok(plaintext) => Some(plaintext),
        Err(err) => {
            tracing::debug!(sender = %wire.sender, %err, "message left encrypted");
            None
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
