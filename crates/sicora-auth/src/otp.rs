//! One-time codes for email and SMS challenges.
//!
//! Codes are numeric, delivered out of band, and only their SHA-256 digest
//! is stored on the session.

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Generate a zero-padded numeric code of `digits` length.
pub fn generate_code(digits: u32) -> String {
    let mut rng = rand::rng();
    (0..digits)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// SHA-256 hex digest of a trimmed code.
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

/// Constant-time comparison of a submitted code against a stored digest.
pub fn verify_code(code: &str, stored_hash: &str) -> bool {
    hash_code(code)
        .as_bytes()
        .ct_eq(stored_hash.as_bytes())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_numeric_with_requested_length() {
        for digits in [4, 6, 8] {
            let code = generate_code(digits);
            assert_eq!(code.len(), digits as usize);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn hash_is_stable_hex() {
        let hash = hash_code("123456");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_code(" 123456 "));
    }

    #[test]
    fn verify_matches_only_the_issued_code() {
        let stored = hash_code("482913");
        assert!(verify_code("482913", &stored));
        assert!(!verify_code("482914", &stored));
        assert!(!verify_code("482913", "short"));
    }
}
