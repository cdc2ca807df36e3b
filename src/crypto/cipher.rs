//! # Cipher
//!
//! The runtime wrapper around one party's RSA key material.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CIPHER CAPABILITIES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Loaded halves          Can do                                          │
//! │  ─────────────          ──────                                          │
//! │  public only            encrypt, verify                                 │
//! │  private only           decrypt, sign                                   │
//! │  both                   everything + self-test challenge                │
//! │  neither                nothing (every operation fails loudly)          │
//! │                                                                         │
//! │  encrypt:  plaintext ── RSA PKCS#1 v1.5 ──► base64 ciphertext           │
//! │  sign:     message ── SHA-256 digest ── RSA PKCS#1 v1.5 ──► hex sig     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `Cipher` is immutable after construction. When key material changes
//! (key upload, conversation switch) a new `Cipher` is built; the resolver's
//! memoization keeps that cheap.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::crypto::keys;
use crate::error::{Error, Result};

/// One logical party's asymmetric key material plus the encrypt/decrypt/
/// sign/verify primitives over it.
#[derive(Clone)]
pub struct Cipher {
    /// PEM the public half was built from (kept for change detection)
    public_pem: Option<String>,
    /// PEM the private half was built from, wiped on drop
    private_pem: Option<Zeroizing<String>>,
    public_key: Option<RsaPublicKey>,
    private_key: Option<RsaPrivateKey>,
}

impl Cipher {
    /// Construct a cipher from optional PEM halves
    ///
    /// Either or both may be absent; a present half that fails to parse is
    /// an `InvalidKey` error rather than a silently empty cipher.
    pub fn new(public_pem: Option<&str>, private_pem: Option<&str>) -> Result<Self> {
        let public_key = public_pem.map(keys::parse_public_key_pem).transpose()?;
        let private_key = private_pem.map(keys::parse_private_key_pem).transpose()?;

        Ok(Self {
            public_pem: public_pem.map(str::to_owned),
            private_pem: private_pem.map(|p| Zeroizing::new(p.to_owned())),
            public_key,
            private_key,
        })
    }

    /// Construct a cipher holding only a public key
    pub fn from_public(public_pem: &str) -> Result<Self> {
        Self::new(Some(public_pem), None)
    }

    /// Construct a cipher holding only a private key
    pub fn from_private(private_pem: &str) -> Result<Self> {
        Self::new(None, Some(private_pem))
    }

    /// Construct an empty cipher (no key material)
    pub fn empty() -> Self {
        Self {
            public_pem: None,
            private_pem: None,
            public_key: None,
            private_key: None,
        }
    }

    /// The raw public key PEM this cipher was built from
    ///
    /// Exposed so higher layers can detect "no key configured" without
    /// re-parsing key material.
    pub fn public_key_pem(&self) -> Option<&str> {
        self.public_pem.as_deref()
    }

    /// The raw private key PEM this cipher was built from
    pub fn private_key_pem(&self) -> Option<&str> {
        self.private_pem.as_deref().map(String::as_str)
    }

    /// Whether a public key is loaded
    pub fn has_public_key(&self) -> bool {
        self.public_key.is_some()
    }

    /// Whether a private key is loaded
    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// Encrypt a plaintext under the loaded public key
    ///
    /// Returns the ciphertext base64-encoded. Fails with `NoPublicKey` if
    /// no public half is loaded, or `EncryptionFailed` if the plaintext
    /// exceeds the key's capacity.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let key = self.public_key.as_ref().ok_or(Error::NoPublicKey)?;

        let capacity = keys::max_plaintext_len(key);
        if plaintext.len() > capacity {
            return Err(Error::EncryptionFailed(format!(
                "Plaintext is {} bytes but this key can encrypt at most {}",
                plaintext.len(),
                capacity
            )));
        }

        let ciphertext = key
            .encrypt(&mut rand::rngs::OsRng, Pkcs1v15Encrypt, plaintext.as_bytes())
            .map_err(|e| Error::EncryptionFailed(e.to_string()))?;

        Ok(BASE64.encode(ciphertext))
    }

    /// Decrypt a base64 ciphertext with the loaded private key
    ///
    /// Malformed ciphertext and non-matching keys both map to
    /// `DecryptionFailed`; callers treat that as "could not decrypt",
    /// not as a fatal condition.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let key = self.private_key.as_ref().ok_or(Error::NoPrivateKey)?;

        let bytes = BASE64
            .decode(ciphertext)
            .map_err(|_| Error::DecryptionFailed)?;

        let plaintext = key
            .decrypt(Pkcs1v15Encrypt, &bytes)
            .map_err(|_| Error::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| Error::DecryptionFailed)
    }

    /// Sign a message with the loaded private key
    ///
    /// The signature is RSA PKCS#1 v1.5 over the SHA-256 digest of the
    /// message, hex-encoded. Deterministic: the same message and key always
    /// produce the same signature, and `verify` uses the same digest.
    pub fn sign(&self, message: &str) -> Result<String> {
        let key = self.private_key.as_ref().ok_or(Error::NoPrivateKey)?;

        let digest = Sha256::digest(message.as_bytes());
        let signature = key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| Error::SigningFailed(e.to_string()))?;

        Ok(hex::encode(signature))
    }

    /// Verify a hex signature over a message with the loaded public key
    ///
    /// Returns `Ok(false)` — never an error — for malformed or
    /// non-matching signatures. The only error case is a missing public
    /// key, which is a caller bug rather than untrusted input.
    pub fn verify(&self, message: &str, signature: &str) -> Result<bool> {
        let key = self.public_key.as_ref().ok_or(Error::NoPublicKey)?;

        let Ok(sig_bytes) = hex::decode(signature) else {
            return Ok(false);
        };

        let digest = Sha256::digest(message.as_bytes());
        Ok(key
            .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &sig_bytes)
            .is_ok())
    }
}

/// Equality over the raw key strings, not the parsed keys. This is what
/// the resolver's memoization compares.
impl PartialEq for Cipher {
    fn eq(&self, other: &Self) -> bool {
        self.public_pem == other.public_pem
            && self.private_pem.as_deref() == other.private_pem.as_deref()
    }
}

impl Eq for Cipher {}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher")
            .field("public_key", &self.public_pem.is_some())
            .field("private_key", &self.private_pem.is_some())
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

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let (private_pem, public_pem) = generate_pem_pair();
        let cipher = Cipher::new(Some(&public_pem), Some(&private_pem)).unwrap();

        let ciphertext = cipher.encrypt("hello world").unwrap();
        assert_ne!(ciphertext, "hello world");

        let plaintext = cipher.decrypt(&ciphertext).unwrap();
        assert_eq!(plaintext, "hello world");
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let (_, public_pem) = generate_pem_pair();
        let (other_private, _) = generate_pem_pair();

        let encryptor = Cipher::from_public(&public_pem).unwrap();
        let wrong_decryptor = Cipher::from_private(&other_private).unwrap();

        let ciphertext = encryptor.encrypt("secret").unwrap();
        let result = wrong_decryptor.decrypt(&ciphertext);

        assert!(matches!(result, Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_decrypt_malformed_ciphertext_fails() {
        let (private_pem, _) = generate_pem_pair();
        let cipher = Cipher::from_private(&private_pem).unwrap();

        assert!(matches!(
            cipher.decrypt("not base64 at all !!!"),
            Err(Error::DecryptionFailed)
        ));
        assert!(matches!(
            cipher.decrypt("AAAA"),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_sign_verify() {
        let (private_pem, public_pem) = generate_pem_pair();
        let cipher = Cipher::new(Some(&public_pem), Some(&private_pem)).unwrap();

        let signature = cipher.sign("attest this").unwrap();
        assert!(cipher.verify("attest this", &signature).unwrap());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let (private_pem, _) = generate_pem_pair();
        let cipher = Cipher::from_private(&private_pem).unwrap();

        assert_eq!(cipher.sign("m").unwrap(), cipher.sign("m").unwrap());
    }

    #[test]
    fn test_verify_tampered_message_is_false() {
        let (private_pem, public_pem) = generate_pem_pair();
        let cipher = Cipher::new(Some(&public_pem), Some(&private_pem)).unwrap();

        let signature = cipher.sign("original").unwrap();
        assert!(!cipher.verify("tampered", &signature).unwrap());
    }

    #[test]
    fn test_verify_malformed_signature_is_false_not_error() {
        let (_, public_pem) = generate_pem_pair();
        let cipher = Cipher::from_public(&public_pem).unwrap();

        assert!(!cipher.verify("message", "zzzz not hex").unwrap());
        assert!(!cipher.verify("message", "deadbeef").unwrap());
    }

    #[test]
    fn test_verify_wrong_signer_is_false() {
        let (private_pem, _) = generate_pem_pair();
        let (_, other_public) = generate_pem_pair();

        let signer = Cipher::from_private(&private_pem).unwrap();
        let verifier = Cipher::from_public(&other_public).unwrap();

        let signature = signer.sign("message").unwrap();
        assert!(!verifier.verify("message", &signature).unwrap());
    }

    #[test]
    fn test_missing_halves_fail_loudly() {
        let (private_pem, public_pem) = generate_pem_pair();

        let public_only = Cipher::from_public(&public_pem).unwrap();
        assert!(matches!(public_only.decrypt("AAAA"), Err(Error::NoPrivateKey)));
        assert!(matches!(public_only.sign("m"), Err(Error::NoPrivateKey)));

        let private_only = Cipher::from_private(&private_pem).unwrap();
        assert!(matches!(private_only.encrypt("m"), Err(Error::NoPublicKey)));
        assert!(matches!(private_only.verify("m", "00"), Err(Error::NoPublicKey)));

        let empty = Cipher::empty();
        assert!(matches!(empty.encrypt("m"), Err(Error::NoPublicKey)));
        assert!(matches!(empty.decrypt("AAAA"), Err(Error::NoPrivateKey)));
    }

    #[test]
    fn test_invalid_pem_is_loud() {
        assert!(matches!(
            Cipher::from_public("garbage"),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_oversized_plaintext_rejected() {
        let (_, public_pem) = generate_pem_pair();
        let cipher = Cipher::from_public(&public_pem).unwrap();

        // 2048-bit key caps plaintext at 245 bytes
        let oversized = "x".repeat(246);
        assert!(matches!(
            cipher.encrypt(&oversized),
            Err(Error::EncryptionFailed(_))
        ));
    }

    #[test]
    fn test_exposes_raw_key_strings() {
        let (private_pem, public_pem) = generate_pem_pair();
        let cipher = Cipher::new(Some(&public_pem), Some(&private_pem)).unwrap();

        assert_eq!(cipher.public_key_pem(), Some(public_pem.as_str()));
        assert_eq!(cipher.private_key_pem(), Some(private_pem.as_str()));

        let empty = Cipher::empty();
        assert_eq!(empty.public_key_pem(), None);
        assert!(!empty.has_public_key());
    }

    #[test]
    fn test_equality_tracks_key_strings() {
        let (private_pem, public_pem) = generate_pem_pair();
        let (other_private, _) = generate_pem_pair();

        let a = Cipher::new(Some(&public_pem), Some(&private_pem)).unwrap();
        let b = Cipher::new(Some(&public_pem), Some(&private_pem)).unwrap();
        let c = Cipher::new(Some(&public_pem), Some(&other_private)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let (private_pem, _) = generate_pem_pair();
        let cipher = Cipher::from_private(&private_pem).unwrap();

        let rendered = format!("{:?}", cipher);
        assert!(!rendered.contains("BEGIN"));
    }
}
