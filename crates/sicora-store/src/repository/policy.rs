//! In-memory implementation of [`EnforcementPolicyRepository`].

use sicora_core::error::{SicoraError, SicoraResult};
use sicora_core::models::enforcement_policy::MfaEnforcementPolicy;
use sicora_core::models::role::UserRole;
use sicora_core::repository::EnforcementPolicyRepository;

use crate::db::MemoryDb;

#[derive(Debug, Clone)]
pub struct MemoryPolicyRepository {
    db: MemoryDb,
}

impl MemoryPolicyRepository {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

impl EnforcementPolicyRepository for MemoryPolicyRepository {
    async fn get_by_role(&self, role: UserRole) -> SicoraResult<MfaEnforcementPolicy> {
        let tables = self.db.read().await;
        tables
            .policies
            .get(&role)
            .cloned()
            .ok_or_else(|| SicoraError::PolicyNotFound {
                role: role.as_str().to_string(),
            })
    }

    async fn list(&self) -> SicoraResult<Vec<MfaEnforcementPolicy>> {
        let tables = self.db.read().await;
        let mut policies: Vec<_> = tables.policies.values().cloned().collect();
        policies.sort_by_key(|p| p.role);
        Ok(policies)
    }
}
