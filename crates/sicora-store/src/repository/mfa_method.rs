//! In-memory implementation of [`MfaMethodRepository`].

use chrono::{DateTime, Utc};
use sicora_core::error::SicoraResult;
use sicora_core::models::mfa_method::{CreateMfaMethod, MfaMethod};
use sicora_core::repository::MfaMethodRepository;
use uuid::Uuid;

use crate::db::{MemoryDb, Tables};
use crate::error::StoreError;

const ENTITY: &str = "mfa_method";

fn demote_primary(tables: &mut Tables, user_id: Uuid, now: DateTime<Utc>) {
    for method in tables
        .mfa_methods
        .values_mut()
        .filter(|m| m.user_id == user_id && m.is_primary)
    {
        method.is_primary = false;
        method.updated_at = now;
    }
}

#[derive(Debug, Clone)]
pub struct MemoryMfaMethodRepository {
    db: MemoryDb,
}

impl MemoryMfaMethodRepository {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

impl MfaMethodRepository for MemoryMfaMethodRepository {
    async fn create(&self, input: CreateMfaMethod) -> SicoraResult<MfaMethod> {
        let now = Utc::now();
        let method = MfaMethod::from_create(input, now);
        let mut tables = self.db.write().await;
        if method.is_primary {
            demote_primary(&mut tables, method.user_id, now);
        }
        tables.mfa_methods.insert(method.id, method.clone());
        Ok(method)
    }

    async fn get_by_id(&self, id: Uuid) -> SicoraResult<MfaMethod> {
        let tables = self.db.read().await;
        let method = tables
            .mfa_methods
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(ENTITY, id))?;
        Ok(method)
    }

    async fn list_by_user(&self, user_id: Uuid) -> SicoraResult<Vec<MfaMethod>> {
        let tables = self.db.read().await;
        let mut methods: Vec<MfaMethod> = tables
            .mfa_methods
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        methods.sort_by_key(|m| m.created_at);
        Ok(methods)
    }

    async fn get_primary(&self, user_id: Uuid) -> SicoraResult<Option<MfaMethod>> {
        let tables = self.db.read().await;
        Ok(tables
            .mfa_methods
            .values()
            .find(|m| m.user_id == user_id && m.is_primary)
            .cloned())
    }

    async fn set_primary(&self, user_id: Uuid, method_id: Uuid) -> SicoraResult<MfaMethod> {
        let now = Utc::now();
        let mut tables = self.db.write().await;
        match tables.mfa_methods.get(&method_id) {
            Some(method) if method.user_id == user_id => {}
            _ => return Err(StoreError::not_found(ENTITY, method_id).into()),
        }
        demote_primary(&mut tables, user_id, now);
        let method = tables
            .mfa_methods
            .get_mut(&method_id)
            .ok_or_else(|| StoreError::not_found(ENTITY, method_id))?;
        method.is_primary = true;
        method.updated_at = now;
        Ok(method.clone())
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> SicoraResult<MfaMethod> {
        let mut tables = self.db.write().await;
        let method = tables
            .mfa_methods
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(ENTITY, id))?;
        method.is_enabled = enabled;
        method.updated_at = Utc::now();
        Ok(method.clone())
    }

    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> SicoraResult<()> {
        let mut tables = self.db.write().await;
        let method = tables
            .mfa_methods
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(ENTITY, id))?;
        method.last_used_at = Some(at);
        method.updated_at = at;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> SicoraResult<()> {
        let mut tables = self.db.write().await;
        tables
            .mfa_methods
            .remove(&id)
            .ok_or_else(|| StoreError::not_found(ENTITY, id))?;
        Ok(())
    }
}
