//! Backup (recovery) code domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default validity window of a backup code batch.
pub const DEFAULT_BACKUP_CODE_VALIDITY_DAYS: i64 = 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupCode {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Argon2id hash of the normalized code; the plaintext is never stored.
    #[serde(skip)]
    pub code_hash: String,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl BackupCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Unused and inside its validity window.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired_at(now)
    }
}

/// A batch of freshly hashed codes sharing one validity window.
#[derive(Debug, Clone)]
pub struct CreateBackupCodes {
    pub user_id: Uuid,
    pub code_hashes: Vec<String>,
    pub expires_at: DateTime<Utc>,
}
