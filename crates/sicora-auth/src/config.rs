//! MFA configuration.

use std::str::FromStr;

use sicora_core::models::backup_code::DEFAULT_BACKUP_CODE_VALIDITY_DAYS;
use sicora_core::models::mfa_session::{DEFAULT_MAX_ATTEMPTS, DEFAULT_SESSION_TTL_SECS};
use sicora_core::models::user::PolicyVersions;

const ENV_SESSION_TTL_SECS: &str = "SICORA_MFA_SESSION_TTL_SECS";
const ENV_MAX_ATTEMPTS: &str = "SICORA_MFA_MAX_ATTEMPTS";
const ENV_BACKUP_CODE_COUNT: &str = "SICORA_MFA_BACKUP_CODE_COUNT";

/// Argon2id cost parameters used when hashing passwords and backup codes.
///
/// Verification always uses the parameters embedded in the stored hash,
/// so changing these only affects newly written hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Configuration for the MFA services.
#[derive(Debug, Clone)]
pub struct MfaConfig {
    /// Lifetime of a verification session in seconds (default: 300).
    pub session_ttl_secs: i64,
    /// Wrong codes tolerated before a session is exhausted (default: 3).
    pub max_attempts: u32,
    /// Length of email and SMS one-time codes.
    pub otp_digits: u32,
    /// Codes per generated backup batch (default: 10).
    pub backup_code_count: usize,
    pub backup_code_validity_days: i64,
    /// Server-side secret applied to password and backup code hashes.
    pub pepper: Option<String>,
    pub hash_cost: HashCost,
    /// Issuer name shown in authenticator apps.
    pub totp_issuer: String,
    /// 256-bit AES-GCM key for encrypting TOTP secrets at rest.
    /// `None` disables TOTP enrollment.
    pub mfa_encryption_key: Option<[u8; 32]>,
    /// Re-reads allowed after losing a conditional update.
    pub max_cas_retries: u32,
    /// Currently published legal document versions.
    pub policy_versions: PolicyVersions,
}

impl Default for MfaConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            otp_digits: 6,
            backup_code_count: 10,
            backup_code_validity_days: DEFAULT_BACKUP_CODE_VALIDITY_DAYS,
            pepper: None,
            hash_cost: HashCost::default(),
            totp_issuer: "SICORA".into(),
            mfa_encryption_key: None,
            max_cas_retries: 3,
            policy_versions: PolicyVersions::new("1.0", "1.0", "1.0"),
        }
    }
}

impl MfaConfig {
    /// Defaults overridden by any `SICORA_MFA_*` variables that parse to a
    /// positive value. Zero, negative and malformed values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ttl) = parse_env(ENV_SESSION_TTL_SECS) {
            config.session_ttl_secs = ttl;
        }
        if let Some(max) = parse_env(ENV_MAX_ATTEMPTS) {
            config.max_attempts = max;
        }
        if let Some(count) = parse_env(ENV_BACKUP_CODE_COUNT) {
            config.backup_code_count = count;
        }
        config
    }
}

fn parse_env<T: FromStr + PartialOrd + Default>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| parse_positive(&value))
}

fn parse_positive<T: FromStr + PartialOrd + Default>(value: &str) -> Option<T> {
    value.trim().parse().ok().filter(|v| *v > T::default())
}
