//! In-memory implementation of [`MfaSessionRepository`].

use chrono::{DateTime, Utc};
use sicora_core::error::SicoraResult;
use sicora_core::models::mfa_session::{CreateMfaSession, MfaSession, RecordAttempt};
use sicora_core::repository::MfaSessionRepository;
use tracing::debug;
use uuid::Uuid;

use crate::db::MemoryDb;
use crate::error::StoreError;

const ENTITY: &str = "mfa_session";

#[derive(Debug, Clone)]
pub struct MemoryMfaSessionRepository {
    db: MemoryDb,
}

impl MemoryMfaSessionRepository {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

impl MfaSessionRepository for MemoryMfaSessionRepository {
    async fn create(&self, input: CreateMfaSession) -> SicoraResult<MfaSession> {
        let session = MfaSession {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            method_type: input.method_type,
            method_id: input.method_id,
            code_hash: input.code_hash,
            is_verified: false,
            verified_at: None,
            attempts: 0,
            max_attempts: input.max_attempts,
            ip_address: input.ip_address,
            user_agent: input.user_agent,
            created_at: Utc::now(),
            expires_at: input.expires_at,
        };
        self.db
            .write()
            .await
            .mfa_sessions
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_by_id(&self, id: Uuid) -> SicoraResult<MfaSession> {
        let tables = self.db.read().await;
        let session = tables
            .mfa_sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(ENTITY, id))?;
        Ok(session)
    }

    async fn record_attempt(&self, id: Uuid, attempt: RecordAttempt) -> SicoraResult<MfaSession> {
        let mut tables = self.db.write().await;
        let session = tables
            .mfa_sessions
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(ENTITY, id))?;

        if session.is_verified || session.attempts != attempt.expected_attempts {
            debug!(
                session_id = %id,
                stored = session.attempts,
                expected = attempt.expected_attempts,
                "Attempt predicate failed"
            );
            return Err(StoreError::Conflict {
                entity: ENTITY,
                id: id.to_string(),
            }
            .into());
        }

        session.attempts = attempt.expected_attempts + 1;
        if let Some(verified_at) = attempt.verified_at {
            session.is_verified = true;
            session.verified_at = Some(verified_at);
        }
        Ok(session.clone())
    }

    async fn cleanup_expired(&self, before: DateTime<Utc>) -> SicoraResult<u64> {
        let mut tables = self.db.write().await;
        let count = tables.mfa_sessions.len();
        tables.mfa_sessions.retain(|_, s| s.expires_at >= before);
        let removed = (count - tables.mfa_sessions.len()) as u64;
        debug!(removed, "Cleaned up expired MFA sessions");
        Ok(removed)
    }
}
