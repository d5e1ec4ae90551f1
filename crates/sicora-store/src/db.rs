//! Shared in-memory tables.

use std::collections::HashMap;
use std::sync::Arc;

use sicora_core::models::backup_code::BackupCode;
use sicora_core::models::enforcement_policy::MfaEnforcementPolicy;
use sicora_core::models::mfa_method::MfaMethod;
use sicora_core::models::mfa_session::MfaSession;
use sicora_core::models::role::UserRole;
use sicora_core::models::user::User;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub users: HashMap<Uuid, User>,
    /// Ficha id → training program name.
    pub cohort_programs: HashMap<String, String>,
    pub mfa_methods: HashMap<Uuid, MfaMethod>,
    pub backup_codes: HashMap<Uuid, BackupCode>,
    pub mfa_sessions: HashMap<Uuid, MfaSession>,
    pub policies: HashMap<UserRole, MfaEnforcementPolicy>,
}

/// Handle to the in-memory tables. Cloning shares the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a cohort with its training program, used by the
    /// program filter and dashboard counts.
    pub async fn register_cohort(&self, ficha_id: impl Into<String>, program: impl Into<String>) {
        let (ficha_id, program) = (ficha_id.into(), program.into());
        debug!(%ficha_id, %program, "Registering cohort");
        self.write().await.cohort_programs.insert(ficha_id, program);
    }

    /// Administrative path for policy configuration: inserts or replaces
    /// the policy of `policy.role`.
    pub async fn upsert_policy(&self, policy: MfaEnforcementPolicy) {
        debug!(role = %policy.role, "Upserting MFA enforcement policy");
        self.write().await.policies.insert(policy.role, policy);
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }
}
