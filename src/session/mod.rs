//! # Session Module
//!
//! The owned session context: who the local user is, their public key, and
//! the single mutable private-key slot everything downstream reads.
//!
//! One `SessionContext` exists per running client. It is constructed at
//! login and dropped at logout; dropping wipes the private key material.
//! There is deliberately no global accessor — the resolver, store, and
//! service all receive the context explicitly.
//!
//! ## Private Key Persistence
//!
//! Persisting the private key in browser-local storage is a trust
//! trade-off the user opts into explicitly:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      KEY PERSISTENCE LIFECYCLE                          │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  install key + opt-in   ──► validated, then saved to the key store      │
//! │  revoke opt-in          ──► stored key purged immediately               │
//! │  remove key             ──► slot cleared and stored key purged          │
//! │  next login             ──► stored key re-validated before trust;       │
//! │                             a stale key is purged, not loaded           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod resolver;

use zeroize::Zeroizing;

use crate::crypto::{keys, validate_key_pair};
use crate::error::Result;

/// Backing storage for the opt-in persisted private key
///
/// The browser host implements this over local storage; tests and native
/// hosts use [`MemoryKeyStore`].
pub trait PrivateKeyStore: Send + Sync {
    /// Read the persisted key, if any
    fn load(&self) -> Result<Option<String>>;
    /// Persist the key
    fn save(&self, pem: &str) -> Result<()>;
    /// Remove the persisted key
    fn purge(&self) -> Result<()>;
}

/// In-memory [`PrivateKeyStore`]
#[derive(Default)]
pub struct MemoryKeyStore {
    slot: parking_lot::Mutex<Option<String>>,
}

impl PrivateKeyStore for MemoryKeyStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, pem: &str) -> Result<()> {
        *self.slot.lock() = Some(pem.to_owned());
        Ok(())
    }

    fn purge(&self) -> Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// The authenticated user's identity and key material for one client
/// session
pub struct SessionContext {
    username: String,
    public_key_pem: String,
    private_key_pem: Option<Zeroizing<String>>,
    persist_key: bool,
    key_store: Box<dyn PrivateKeyStore>,
}

impl SessionContext {
    /// Build the session context at login
    ///
    /// `public_key_b64` is the base64-encoded PEM from the session token.
    /// If the key store holds a persisted private key it is re-validated
    /// against that public key before being trusted; a key that no longer
    /// matches is purged with a warning rather than loaded.
    pub fn new(
        username: impl Into<String>,
        public_key_b64: &str,
        key_store: Box<dyn PrivateKeyStore>,
    ) -> Result<Self> {
        let username = username.into();
        let public_key_pem = keys::decode_key_b64(public_key_b64)?;

        let mut session = Self {
            username,
            public_key_pem,
            private_key_pem: None,
            persist_key: false,
            key_store,
        };

        match session.key_store.load() {
            Ok(Some(stored)) => match validate_key_pair(&stored, &session.public_key_pem) {
                Ok(()) => {
                    tracing::info!(user = %session.username, "restored persisted private key");
                    session.private_key_pem = Some(Zeroizing::new(stored));
                    session.persist_key = true;
                }
                Err(err) => {
                    tracing::warn!(user = %session.username, %err, "purging stale persisted key");
                    let _ = session.key_store.purge();
                }
            },
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(user = %session.username, %err, "key store unavailable");
            }
        }

        Ok(session)
    }

    /// The authenticated username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The user's public key as PEM text
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// The loaded private key as PEM text, if any
    pub fn private_key_pem(&self) -> Option<&str> {
        self.private_key_pem.as_deref().map(String::as_str)
    }

    /// Whether a private key is currently loaded
    pub fn has_private_key(&self) -> bool {
        self.private_key_pem.is_some()
    }

    /// Whether the key is persisted to the key store
    pub fn persists_key(&self) -> bool {
        self.persist_key
    }

    /// Install a user-supplied private key
    ///
    /// The key must pass the round-trip challenge against the session's
    /// public key; a non-matching key is rejected with `KeyMismatch` and
    /// never persisted. On success the key is saved to the store only if
    /// persistence is opted in.
    pub fn install_private_key(&mut self, pem: &str) -> Result<()> {
        validate_key_pair(pem, &self.public_key_pem)?;

        self.private_key_pem = Some(Zeroizing::new(pem.to_owned()));
        tracing::info!(user = %self.username, "private key installed");

        if self.persist_key {
            if let Err(err) = self.key_store.save(pem) {
                tracing::warn!(user = %self.username, %err, "could not persist private key");
            }
        }

        Ok(())
    }

    /// Remove the current private key and purge any persisted copy
    pub fn remove_private_key(&mut self) {
        self.private_key_pem = None;
        if let Err(err) = self.key_store.purge() {
            tracing::warn!(user = %self.username, %err, "could not purge persisted key");
        }
        tracing::info!(user = %self.username, "private key removed");
    }

    /// Change the persistence opt-in
    ///
    /// Opting in saves the currently loaded key (if any); opting out
    /// purges the stored copy immediately.
    pub fn set_key_persistence(&mut self, opt_in: bool) -> Result<()> {
        self.persist_key = opt_in;

        if opt_in {
            if let Some(pem) = self.private_key_pem.as_deref() {
                self.key_store.save(pem)?;
            }
        } else {
            self.key_store.purge()?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("username", &self.username)
            .field("private_key", &self.private_key_pem.is_some())
            .field("persist_key", &self.persist_key)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::fixtures::generate_pem_pair;
    use crate::error::Error;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use std::sync::Arc;

    /// Key store wrapper sharing one backing slot across "logins"
    struct SharedStore(Arc<MemoryKeyStore>);

    impl PrivateKeyStore for SharedStore {
        fn load(&self) -> Result<Option<String>> {
            self.0.load()
        }
        fn save(&self, pem: &str) -> Result<()> {
            self.0.save(pem)
        }
        fn purge(&self) -> Result<()> {
            self.0.purge()
        }
    }

    fn session_for(public_pem: &str, store: Box<dyn PrivateKeyStore>) -> SessionContext {
        SessionContext::new("alice", &BASE64.encode(public_pem), store).unwrap()
    }

    #[test]
    fn test_matching_key_installs() {
        let (private_pem, public_pem) = generate_pem_pair();
        let mut session = session_for(&public_pem, Box::new(MemoryKeyStore::default()));

        assert!(!session.has_private_key());
        session.install_private_key(&private_pem).unwrap();
        assert!(session.has_private_key());
        assert_eq!(session.private_key_pem(), Some(private_pem.as_str()));
    }

    #[test]
    fn test_wrong_key_rejected_and_not_persisted() {
        let (_, public_pem) = generate_pem_pair();
        let (other_private, _) = generate_pem_pair();

        let backing = Arc::new(MemoryKeyStore::default());
        let mut session = session_for(&public_pem, Box::new(SharedStore(backing.clone())));
        session.set_key_persistence(true).unwrap();

        let result = session.install_private_key(&other_private);
        assert!(matches!(result, Err(Error::KeyMismatch)));
        assert!(!session.has_private_key());
        assert_eq!(backing.load().unwrap(), None);
    }

    #[test]
    fn test_opt_in_persists_and_opt_out_purges() {
        let (private_pem, public_pem) = generate_pem_pair();
        let backing = Arc::new(MemoryKeyStore::default());
        let mut session = session_for(&public_pem, Box::new(SharedStore(backing.clone())));

        session.install_private_key(&private_pem).unwrap();
        assert_eq!(backing.load().unwrap(), None); // not opted in yet

        session.set_key_persistence(true).unwrap();
        assert_eq!(backing.load().unwrap(), Some(private_pem.clone()));

        session.set_key_persistence(false).unwrap();
        assert_eq!(backing.load().unwrap(), None);
        assert!(session.has_private_key()); // slot untouched by the opt-out
    }

    #[test]
    fn test_persisted_key_restored_on_login() {
        let (private_pem, public_pem) = generate_pem_pair();
        let backing = Arc::new(MemoryKeyStore::default());
        backing.save(&private_pem).unwrap();

        let session = session_for(&public_pem, Box::new(SharedStore(backing)));

        assert!(session.has_private_key());
        assert!(session.persists_key());
    }

    #[test]
    fn test_stale_persisted_key_purged_on_login() {
        let (_, public_pem) = generate_pem_pair();
        let (other_private, _) = generate_pem_pair();

        let backing = Arc::new(MemoryKeyStore::default());
        backing.save(&other_private).unwrap();

        let session = session_for(&public_pem, Box::new(SharedStore(backing.clone())));

        assert!(!session.has_private_key());
        assert_eq!(backing.load().unwrap(), None);
    }

    #[test]
    fn test_remove_key_purges_store() {
        let (private_pem, public_pem) = generate_pem_pair();
        let backing = Arc::new(MemoryKeyStore::default());
        let mut session = session_for(&public_pem, Box::new(SharedStore(backing.clone())));

        session.set_key_persistence(true).unwrap();
        session.install_private_key(&private_pem).unwrap();
        assert!(backing.load().unwrap().is_some());

        session.remove_private_key();
        assert!(!session.has_private_key());
        assert_eq!(backing.load().unwrap(), None);
    }
}
