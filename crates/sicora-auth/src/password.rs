//! Argon2id hashing for passwords and other low-entropy secrets.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

use crate::config::HashCost;
use crate::error::AuthError;

/// Build an Argon2id instance. A `pepper` is applied as the Argon2 secret
/// and must match the one used when the hash was written.
pub(crate) fn argon2_with<'k>(
    pepper: Option<&'k str>,
    cost: HashCost,
) -> Result<Argon2<'k>, AuthError> {
    let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params: {e}")))?;
    match pepper {
        Some(secret) => Argon2::new_with_secret(
            secret.as_bytes(),
            Algorithm::Argon2id,
            Version::V0x13,
            params,
        )
        .map_err(|e| AuthError::Crypto(format!("argon2 init: {e}"))),
        None => Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params)),
    }
}

/// Hash `secret` into a PHC-format Argon2id string.
pub fn hash_password(
    secret: &str,
    pepper: Option<&str>,
    cost: HashCost,
) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2_with(pepper, cost)?
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AuthError::Crypto(format!("hash error: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a plaintext secret against an Argon2id PHC-format hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(secret: &str, hash: &str, pepper: Option<&str>) -> Result<bool, AuthError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    // Cost parameters come from the PHC string; only the secret matters here.
    let argon2 = argon2_with(pepper, HashCost::default())?;
    match argon2.verify_password(secret.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}
