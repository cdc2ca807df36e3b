//! # Veil Core
//!
//! The end-to-end encryption and messaging core for the Veil chat client.
//! The host (a browser UI or a native shell) supplies the transports; this
//! crate owns the key material, the crypto pipeline, and the conversation
//! state.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          VEIL CORE MODULES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │   Crypto    │  │   Session   │  │  Messaging  │  │    Store     │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - Cipher    │  │ - Identity  │  │ - Wire types│  │ - Phases     │   │
//! │  │ - Keys      │  │ - Key slot  │  │ - Pipeline  │  │ - Staleness  │   │
//! │  │ - Validate  │  │ - Resolver  │  │ - Compose   │  │ - Service    │   │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘  └──────┬───────┘   │
//! │         │                │                │                │           │
//! │         └────────────────┴────────────────┴────────────────┘           │
//! │                                   │                                     │
//! │                ┌──────────────────┴─────────────────┐                  │
//! │                │                                    │                  │
//! │         ┌─────────────┐                      ┌─────────────┐           │
//! │         │  EventBus   │                      │  Transport  │           │
//! │         │             │                      │   traits    │           │
//! │         │ - Subscribe │                      │ - ChatApi   │           │
//! │         │ - Publish   │                      │ - Socket Tx │           │
//! │         └─────────────┘                      └─────────────┘           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - RSA keypair wrapper, key parsing, round-trip validation
//! - [`session`] - The owned per-login context and the cipher resolver
//! - [`messaging`] - Wire types, socket event union, the crypto pipeline
//! - [`store`] - The reactive message store and the async chat service
//! - [`events`] - Typed event fan-out with a subscription lifecycle
//! - [`transport`] - The async seams the host implements
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Layer 1: Message Confidentiality (RSA PKCS#1 v1.5)                     │
//! │  ──────────────────────────────────────────────────                     │
//! │  Every message is encrypted twice: to the recipient's public key        │
//! │  and to the sender's own. The server only ever relays ciphertext.       │
//! │                                                                         │
//! │  Layer 2: Message Authentication (SHA-256 + RSA signatures)             │
//! │  ──────────────────────────────────────────────────────────             │
//! │  Both ciphertexts are signed with the sender's private key.             │
//! │  Verification runs before plaintext is trusted; an unverifiable         │
//! │  message renders as untrusted, never as an error.                       │
//! │                                                                         │
//! │  Layer 3: Key Custody                                                   │
//! │  ────────────────────                                                   │
//! │  The private key lives only in the session context, wiped on drop.      │
//! │  Persisting it to host storage is an explicit user opt-in, and a        │
//! │  candidate key must pass a round-trip challenge before it is            │
//! │  trusted or stored.                                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership Model
//!
//! There is no global state. One [`SessionContext`] exists per login and is
//! handed explicitly to the resolver, the store, and the service; dropping
//! the service tears the whole session down. Two concurrent sessions in
//! tests are just two values.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crypto;
pub mod error;
pub mod events;
pub mod messaging;
pub mod session;
pub mod store;
pub mod transport;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crypto::{is_matching_key_pair, validate_key_pair, Cipher};
pub use error::{Error, Result};
pub use events::{EventBus, EventSubscriber, SubscriberId};
pub use messaging::{DirectMessage, DisplayMessage, Peer, ServerEvent};
pub use session::{MemoryKeyStore, PrivateKeyStore, SessionContext};
pub use store::service::ChatService;
pub use store::{MessageStore, StorePhase, DEFAULT_PAGE_SIZE};
pub use transport::{ChatApi, MessageTransport};
