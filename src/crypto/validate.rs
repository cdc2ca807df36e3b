//! # Key Pair Validation
//!
//! Proves that a user-supplied private key is the matching half of a known
//! public key by running an encrypt/decrypt round-trip challenge.
//!
//! This is the only reliable client-side proof that an uploaded `.pem` file
//! corresponds to the public key on record. A wrong key must be rejected
//! with a specific error before it is ever trusted for message decryption
//! or persisted anywhere.

use crate::crypto::Cipher;
use crate::error::{Error, Result};

/// Fixed probe string encrypted and decrypted during the challenge
const CHALLENGE_PROBE: &str = "veil-key-challenge-probe";

/// Validate that `candidate_private_pem` is the private half of
/// `known_public_pem`
///
/// Algorithm: build a cipher with both halves, encrypt a fixed probe with
/// the public half, decrypt with the private half, compare to the probe.
/// Equality proves the keys are a matching pair.
///
/// ## Errors
///
/// - `InvalidKey` if either half fails to parse
/// - `KeyMismatch` if the round-trip does not reproduce the probe
pub fn validate_key_pair(candidate_private_pem: &str, known_public_pem: &str) -> Result<()> {
    let cipher = Cipher::new(Some(known_public_pem), Some(candidate_private_pem))?;

    let challenge = cipher.encrypt(CHALLENGE_PROBE)?;
    match cipher.decrypt(&challenge) {
        Ok(probe) if probe == CHALLENGE_PROBE => Ok(()),
        Ok(_) | Err(Error::DecryptionFailed) => Err(Error::KeyMismatch),
        Err(other) => Err(other),
    }
}

/// Boolean form of [`validate_key_pair`] for callers that only branch
pub fn is_matching_key_pair(candidate_private_pem: &str, known_public_pem: &str) -> bool {
    validate_key_pair(candidate_private_pem, known_public_pem).is_ok()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::fixtures::generate_pem_pair;

    #[test]
    fn test_matching_pair_validates() {
        let (private_pem, public_pem) = generate_pem_pair();

        assert!(validate_key_pair(&private_pem, &public_pem).is_ok());
        assert!(is_matching_key_pair(&private_pem, &public_pem));
    }

    #[test]
    fn test_shuffled_pair_is_rejected() {
        let (_, public_pem) = generate_pem_pair();
        let (other_private, _) = generate_pem_pair();

        let result = validate_key_pair(&other_private, &public_pem);
        assert!(matches!(result, Err(Error::KeyMismatch)));
        assert!(!is_matching_key_pair(&other_private, &public_pem));
    }

    #[test]
    fn test_unparseable_candidate_is_invalid_key_not_mismatch() {
        let (_, public_pem) = generate_pem_pair();

        let result = validate_key_pair("not a pem", &public_pem);
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }
}
