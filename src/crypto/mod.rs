//! # Cryptography Module
//!
//! Cryptographic primitives for the Veil message core.
//!
//! ## Scheme Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Key material                                                           │
//! │  ────────────                                                           │
//! │  RSA keypairs, PEM-encoded, server-issued at registration. The          │
//! │  public half travels base64-encoded through the session token and       │
//! │  the friend-list REST layer; the private half is user-supplied          │
//! │  (file upload or opt-in browser persistence) and never leaves the       │
//! │  client.                                                                │
//! │                                                                         │
//! │  Message encryption (RSA PKCS#1 v1.5)                                   │
//! │  ────────────────────────────────────                                   │
//! │  Each outgoing plaintext is encrypted twice: once under the             │
//! │  recipient's public key, once under the sender's own public key         │
//! │  (the self-encrypted copy that lets the sender re-read sent             │
//! │  messages). Ciphertexts are base64 strings.                             │
//! │                                                                         │
//! │  Signatures (RSA PKCS#1 v1.5 over SHA-256)                              │
//! │  ─────────────────────────────────────────                              │
//! │  Each ciphertext is independently signed with the sender's private      │
//! │  key. Signatures are hex strings. The same digest is used for           │
//! │  signing and verification, so signatures are deterministic.             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices & Rationale
//!
//! | Algorithm | Purpose | Why |
//! |-----------|---------|-----|
//! | RSA PKCS#1 v1.5 | Encryption + signatures | The wire scheme the deployed server and existing clients speak |
//! | SHA-256 | Signature digest | Fixed digest shared by sign and verify |
//! | OsRng | Padding randomness | Cryptographically secure system RNG |
//!
//! ## Security Considerations
//!
//! 1. Private key PEM is wrapped in `Zeroizing` and wiped on drop
//! 2. `Debug` output never contains key material
//! 3. Decryption failures are indistinguishable to callers (malformed
//!    input and wrong key both map to `DecryptionFailed`)

mod cipher;
pub mod keys;
mod validate;

pub use cipher::Cipher;
pub use validate::{is_matching_key_pair, validate_key_pair};
