//! # Key Material Handling
//!
//! Parsing and decoding of RSA key material.
//!
//! Keys travel through the system in two layers of encoding:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        KEY MATERIAL LAYERS                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  base64("-----BEGIN PUBLIC KEY-----\n...")   ◄── session / REST layer   │
//! │                  │                                                      │
//! │                  ▼  decode_key_b64()                                    │
//! │  "-----BEGIN PUBLIC KEY-----\n..."           ◄── PEM text (also the     │
//! │                  │                               form of uploaded       │
//! │                  ▼  parse_*_pem()                .pem key files)        │
//! │  RsaPublicKey / RsaPrivateKey                ◄── parsed key             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both PKCS#8 and the older PKCS#1 PEM encodings are accepted, since
//! user-supplied key files come in either form.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{Error, Result};

/// PKCS#1 v1.5 padding overhead in bytes
const PKCS1V15_OVERHEAD: usize = 11;

/// Decode a base64-encoded PEM string into PEM text
///
/// The session token and the friend-list REST layer both deliver public
/// keys base64-encoded.
pub fn decode_key_b64(encoded: &str) -> Result<String> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| Error::InvalidKey(format!("Invalid base64 key encoding: {}", e)))?;

    String::from_utf8(bytes).map_err(|_| Error::InvalidKey("Key is not valid UTF-8".into()))
}

/// Parse a public key from PEM text
///
/// Tries PKCS#8 (SPKI, `BEGIN PUBLIC KEY`) first, then falls back to
/// PKCS#1 (`BEGIN RSA PUBLIC KEY`).
pub fn parse_public_key_pem(pem: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| Error::InvalidKey(format!("Unparseable public key: {}", e)))
}

/// Parse a private key from PEM text
///
/// Tries PKCS#8 (`BEGIN PRIVATE KEY`) first, then falls back to PKCS#1
/// (`BEGIN RSA PRIVATE KEY`).
pub fn parse_private_key_pem(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| Error::InvalidKey(format!("Unparseable private key: {}", e)))
}

/// Maximum plaintext length (in bytes) this key can encrypt
///
/// PKCS#1 v1.5 reserves 11 bytes of the modulus for padding.
pub fn max_plaintext_len(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(PKCS1V15_OVERHEAD)
}

// ============================================================================
// TEST FIXTURES
// ============================================================================


// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    #[test]
    fn test_decode_key_b64_round_trip() {
        let pem = "-----BEGIN PUBLIC KEY-----\nabc\n-----END PUBLIC KEY-----\n";
        let encoded = BASE64.encode(pem);

        assert_eq!(decode_key_b64(&encoded).unwrap(), pem);
    }

    #[test]
    fn test_decode_key_b64_rejects_garbage() {
        assert!(decode_key_b64("not base64 !!!").is_err());
    }

    #[test]
    fn test_parse_generated_keys() {
        let (private_pem, public_pem) = fixtures::generate_pem_pair();

        assert!(parse_private_key_pem(&private_pem).is_ok());
        assert!(parse_public_key_pem(&public_pem).is_ok());
    }

    #[test]
    fn test_parse_rejects_non_pem() {
        assert!(parse_public_key_pem("hello").is_err());
        assert!(parse_private_key_pem("hello").is_err());
    }

    #[test]
    fn test_max_plaintext_len() {
        let (_, public_pem) = fixtures::generate_pem_pair();
        let key = parse_public_key_pem(&public_pem).unwrap();

        // 2048-bit modulus = 256 bytes, minus 11 bytes of padding
        assert_eq!(max_plaintext_len(&key), 245);
    }
}
