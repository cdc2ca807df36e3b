//! # Conversation Cipher Resolver
//!
//! Derives the `{self_cipher, peer_cipher}` pair for the active
//! conversation, memoized on the four identity inputs:
//!
//! 1. active conversation peer (username)
//! 2. peer's public key
//! 3. local user's public key
//! 4. local private key, or its absence
//!
//! Key parsing is the most expensive operation per state change, so the
//! pair is rebuilt only when one of the inputs actually changes (string
//! equality on the raw key material). Swapping the private key therefore
//! atomically invalidates the memoized ciphers — no stale plaintext can be
//! derived under a new key's identity.
//!
//! With no active conversation the resolver yields no ciphers and the
//! pipeline must not run.

use crate::crypto::{keys, Cipher};
use crate::error::Result;
use crate::messaging::Peer;
use crate::session::SessionContext;

/// The cipher pair for one conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherPair {
    /// The local user's cipher (public key + private key when loaded)
    pub self_cipher: Cipher,
    /// The peer's cipher (public key only)
    pub peer_cipher: Cipher,
}

/// The inputs the memo is keyed on
#[derive(PartialEq, Eq)]
struct MemoKey {
    peer_username: String,
    peer_public_b64: String,
    self_public_pem: String,
    private_pem: Option<String>,
}

/// Outcome of a resolution pass
pub struct Resolution<'a> {
    /// The current cipher pair; `None` when no conversation is active
    pub ciphers: Option<&'a CipherPair>,
    /// Whether the pair differs from the previous resolution
    pub changed: bool,
}

/// Memoized derivation of the active conversation's cipher pair
#[derive(Default)]
pub struct CipherResolver {
    memo_key: Option<MemoKey>,
    cached: Option<CipherPair>,
}

impl CipherResolver {
    /// Create a resolver with nothing cached
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive (or reuse) the cipher pair for the given peer and session
    ///
    /// Errors only on unparseable key material; a `None` peer clears the
    /// cache and yields no ciphers.
    pub fn resolve(
        &mut self,
        peer: Option<&Peer>,
        session: &SessionContext,
    ) -> Result<Resolution<'_>> {
        let Some(peer) = peer else {
            let changed = self.cached.take().is_some();
            self.memo_key = None;
            return Ok(Resolution {
                ciphers: None,
                changed,
            });
        };

        let key = MemoKey {
            peer_username: peer.username.clone(),
            peer_public_b64: peer.public_key.clone(),
            self_public_pem: session.public_key_pem().to_owned(),
            private_pem: session.private_key_pem().map(str::to_owned),
        };

        if self.memo_key.as_ref() != Some(&key) {
            let peer_pem = keys::decode_key_b64(&peer.public_key)?;
            let pair = CipherPair {
                self_cipher: Cipher::new(Some(session.public_key_pem()), session.private_key_pem())?,
                peer_cipher: Cipher::from_public(&peer_pem)?,
            };

            tracing::debug!(peer = %peer.username, "rebuilt conversation ciphers");
            self.memo_key = Some(key);
            self.cached = Some(pair);

            return Ok(Resolution {
                ciphers: self.cached.as_ref(),
                changed: true,
            });
        }

        Ok(Resolution {
            ciphers: self.cached.as_ref(),
            changed: false,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::fixtures::generate_pem_pair;
    use crate::session::MemoryKeyStore;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    fn session(public_pem: &str) -> SessionContext {
        SessionContext::new(
            "alice",
            &BASE64.encode(public_pem),
            Box::new(MemoryKeyStore::default()),
        )
        .unwrap()
    }

    fn peer(username: &str, public_pem: &str) -> Peer {
        Peer {
            username: username.into(),
            public_key: BASE64.encode(public_pem),
        }
    }

    #[test]
    fn test_no_active_conversation_yields_no_ciphers() {
        let (_, alice_public) = generate_pem_pair();
        let session = session(&alice_public);
        let mut resolver = CipherResolver::new();

        let resolution = resolver.resolve(None, &session).unwrap();
        assert!(resolution.ciphers.is_none());
        assert!(!resolution.changed);
    }

    #[test]
    fn test_stable_inputs_resolve_unchanged() {
        let (_, alice_public) = generate_pem_pair();
        let (_, bob_public) = generate_pem_pair();
        let session = session(&alice_public);
        let bob = peer("bob", &bob_public);

        let mut resolver = CipherResolver::new();

        let first = resolver.resolve(Some(&bob), &session).unwrap();
        assert!(first.changed);
        assert!(first.ciphers.is_some());

        let second = resolver.resolve(Some(&bob), &session).unwrap();
        assert!(!second.changed);
        assert!(second.ciphers.is_some());
    }

    #[test]
    fn test_private_key_swap_invalidates_memo() {
        let (alice_private, alice_public) = generate_pem_pair();
        let (_, bob_public) = generate_pem_pair();
        let mut session = session(&alice_public);
        let bob = peer("bob", &bob_public);

        let mut resolver = CipherResolver::new();
        resolver.resolve(Some(&bob), &session).unwrap();

        session.install_private_key(&alice_private).unwrap();

        let after = resolver.resolve(Some(&bob), &session).unwrap();
        assert!(after.changed);
        assert!(after.ciphers.unwrap().self_cipher.has_private_key());
    }

    #[test]
    fn test_peer_switch_invalidates_memo() {
        let (_, alice_public) = generate_pem_pair();
        let (_, bob_public) = generate_pem_pair();
        let (_, carol_public) = generate_pem_pair();
        let session = session(&alice_public);

        let mut resolver = CipherResolver::new();
        resolver
            .resolve(Some(&peer("bob", &bob_public)), &session)
            .unwrap();

        let after = resolver
            .resolve(Some(&peer("carol", &carol_public)), &session)
            .unwrap();
        assert!(after.changed);
    }

    #[test]
    fn test_clearing_conversation_reports_change() {
        let (_, alice_public) = generate_pem_pair();
        let (_, bob_public) = generate_pem_pair();
        let session = session(&alice_public);
        let bob = peer("bob", &bob_public);

        let mut resolver = CipherResolver::new();
        resolver.resolve(Some(&bob), &session).unwrap();

        let cleared = resolver.resolve(None, &session).unwrap();
        assert!(cleared.ciphers.is_none());
        assert!(cleared.changed);
    }

    #[test]
    fn test_unparseable_peer_key_errors() {
        let (_, alice_public) = generate_pem_pair();
        let session = session(&alice_public);
        let bad_peer = Peer {
            username: "bob".into(),
            public_key: "!!! not base64 !!!".into(),
        };

        let mut resolver = CipherResolver::new();
        assert!(resolver.resolve(Some(&bad_peer), &session).is_err());
    }
}
