//! In-memory implementation of [`BackupCodeRepository`].

use chrono::{DateTime, Utc};
use sicora_core::error::SicoraResult;
use sicora_core::models::backup_code::{BackupCode, CreateBackupCodes};
use sicora_core::repository::BackupCodeRepository;
use tracing::debug;
use uuid::Uuid;

use crate::db::MemoryDb;
use crate::error::StoreError;

const ENTITY: &str = "backup_code";

#[derive(Debug, Clone)]
pub struct MemoryBackupCodeRepository {
    db: MemoryDb,
}

impl MemoryBackupCodeRepository {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

impl BackupCodeRepository for MemoryBackupCodeRepository {
    async fn replace_batch(&self, input: CreateBackupCodes) -> SicoraResult<Vec<BackupCode>> {
        let now = Utc::now();
        let codes: Vec<BackupCode> = input
            .code_hashes
            .into_iter()
            .map(|code_hash| BackupCode {
                id: Uuid::new_v4(),
                user_id: input.user_id,
                code_hash,
                is_used: false,
                used_at: None,
                created_at: now,
                expires_at: input.expires_at,
            })
            .collect();

        let mut tables = self.db.write().await;
        tables.backup_codes.retain(|_, c| c.user_id != input.user_id);
        for code in &codes {
            tables.backup_codes.insert(code.id, code.clone());
        }
        Ok(codes)
    }

    async fn list_by_user(&self, user_id: Uuid) -> SicoraResult<Vec<BackupCode>> {
        let tables = self.db.read().await;
        Ok(tables
            .backup_codes
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_used(&self, id: Uuid, used_at: DateTime<Utc>) -> SicoraResult<bool> {
        let mut tables = self.db.write().await;
        let code = tables
            .backup_codes
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(ENTITY, id))?;
        if code.is_used {
            debug!(backup_code_id = %id, "Backup code already consumed");
            return Ok(false);
        }
        code.is_used = true;
        code.used_at = Some(used_at);
        Ok(true)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> SicoraResult<u64> {
        let mut tables = self.db.write().await;
        let before = tables.backup_codes.len();
        tables.backup_codes.retain(|_, c| c.user_id != user_id);
        Ok((before - tables.backup_codes.len()) as u64)
    }
}
