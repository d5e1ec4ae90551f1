//! Backup code generation, formatting and verification.
//!
//! Codes are 12 characters from an alphabet without look-alike symbols,
//! displayed as `XXXX-XXXX-XXXX`. Only Argon2id hashes of the normalized
//! form are stored.

use rand::Rng;

use crate::config::HashCost;
use crate::error::AuthError;
use crate::password;

const CODE_LEN: usize = 12;
const GROUP_SIZE: usize = 4;
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// A freshly generated batch: plaintext codes for the user, hashes for
/// storage, index-aligned.
#[derive(Debug)]
pub struct BackupCodeBatch {
    pub codes: Vec<String>,
    pub code_hashes: Vec<String>,
}

impl BackupCodeBatch {
    pub fn generate(
        count: usize,
        pepper: Option<&str>,
        cost: HashCost,
    ) -> Result<Self, AuthError> {
        let mut rng = rand::rng();
        let mut codes = Vec::with_capacity(count);
        let mut code_hashes = Vec::with_capacity(count);
        for _ in 0..count {
            let normalized: String = (0..CODE_LEN)
                .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
                .collect();
            code_hashes.push(password::hash_password(&normalized, pepper, cost)?);
            codes.push(format_code(&normalized)?);
        }
        Ok(Self { codes, code_hashes })
    }
}

/// Strip separators and upper-case. Fails with `BackupCodeInvalid` if the
/// result is not a well-formed code.
pub fn normalize_code(input: &str) -> Result<String, AuthError> {
    let normalized: String = input
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_uppercase())
        .collect();

    if normalized.len() != CODE_LEN || !normalized.bytes().all(|b| ALPHABET.contains(&b)) {
        return Err(AuthError::BackupCodeInvalid);
    }
    Ok(normalized)
}

/// Group a normalized code for display.
pub fn format_code(normalized: &str) -> Result<String, AuthError> {
    if normalized.len() != CODE_LEN || !normalized.is_ascii() {
        return Err(AuthError::BackupCodeInvalid);
    }
    let groups: Vec<&str> = (0..CODE_LEN)
        .step_by(GROUP_SIZE)
        .map(|start| &normalized[start..start + GROUP_SIZE])
        .collect();
    Ok(groups.join("-"))
}

/// Check an already normalized code against one stored hash.
pub fn verify_code(
    normalized: &str,
    stored_hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    password::verify_password(normalized, stored_hash, pepper)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: HashCost = HashCost {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize_code("abcd-efgh-jklm").unwrap(), "ABCDEFGHJKLM");
        assert_eq!(normalize_code(" ABCD EFGH JKLM ").unwrap(), "ABCDEFGHJKLM");
    }

    #[test]
    fn normalize_rejects_bad_input() {
        assert!(normalize_code("ABCD-EFGH").is_err());
        // 'O', '0', 'I' and '1' are not in the alphabet.
        assert!(normalize_code("ABCD-EFGH-JKL0").is_err());
        assert!(normalize_code("ABCD-EFGH-JKLI").is_err());
    }

    #[test]
    fn format_groups_by_four() {
        assert_eq!(format_code("ABCDEFGHJKLM").unwrap(), "ABCD-EFGH-JKLM");
        assert!(format_code("ABC").is_err());
    }

    #[test]
    fn batch_codes_verify_against_their_hashes() {
        let batch = BackupCodeBatch::generate(3, Some("pepper"), FAST).unwrap();
        assert_eq!(batch.codes.len(), 3);
        assert_eq!(batch.code_hashes.len(), 3);

        for (code, hash) in batch.codes.iter().zip(&batch.code_hashes) {
            assert_eq!(code.len(), 14);
            let normalized = normalize_code(code).unwrap();
            assert!(verify_code(&normalized, hash, Some("pepper")).unwrap());
            assert!(!verify_code(&normalized, hash, None).unwrap());
        }
    }
}
