//! In-memory implementation of [`UserRepository`].
//!
//! Email uniqueness is checked on the trimmed, lower-cased address and
//! document uniqueness on the trimmed number, mirroring the unique indexes
//! a relational backend would carry.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate, Utc};
use sicora_core::error::SicoraResult;
use sicora_core::models::role::UserRole;
use sicora_core::models::user::User;
use sicora_core::repository::{
    ActivityCounts, BulkOperationResult, PaginatedResult, SortDirection, UserFilter,
    UserRepository, UserSortField,
};
use sicora_core::validation::normalize_email;
use uuid::Uuid;

use crate::db::{MemoryDb, Tables};
use crate::error::StoreError;

const ENTITY: &str = "user";

fn same_email(a: &str, b: &str) -> bool {
    normalize_email(a) == normalize_email(b)
}

fn same_document(a: &str, b: &str) -> bool {
    a.trim() == b.trim()
}

/// Reject `candidate` if another user already holds its email or document.
fn check_unique(tables: &Tables, candidate: &User) -> Result<(), StoreError> {
    for other in tables.users.values().filter(|u| u.id != candidate.id) {
        if same_email(&other.email, &candidate.email) {
            return Err(StoreError::Duplicate {
                field: "email",
                value: candidate.email.clone(),
            });
        }
        if same_document(&other.document_number, &candidate.document_number) {
            return Err(StoreError::Duplicate {
                field: "document_number",
                value: candidate.document_number.clone(),
            });
        }
    }
    Ok(())
}

fn find_by_email_mut<'a>(tables: &'a mut Tables, email: &str) -> Option<&'a mut User> {
    tables
        .users
        .values_mut()
        .find(|u| same_email(&u.email, email))
}

fn program_of<'a>(programs: &'a HashMap<String, String>, user: &User) -> Option<&'a String> {
    user.ficha_id.as_ref().and_then(|ficha| programs.get(ficha))
}

fn matches_filter(filter: &UserFilter, programs: &HashMap<String, String>, user: &User) -> bool {
    if filter.role.is_some_and(|role| role != user.role) {
        return false;
    }
    if filter.is_active.is_some_and(|active| active != user.is_active) {
        return false;
    }
    if let Some(ficha) = &filter.ficha_id {
        if user.ficha_id.as_ref() != Some(ficha) {
            return false;
        }
    }
    if let Some(program) = &filter.program {
        if program_of(programs, user) != Some(program) {
            return false;
        }
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        let hit = [&user.first_name, &user.last_name, &user.email]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }
    true
}

fn compare(sort_by: UserSortField, a: &User, b: &User) -> Ordering {
    match sort_by {
        UserSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        UserSortField::FirstName => a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()),
        UserSortField::LastName => a.last_name.to_lowercase().cmp(&b.last_name.to_lowercase()),
        UserSortField::Email => normalize_email(&a.email).cmp(&normalize_email(&b.email)),
        UserSortField::Role => a.role.as_str().cmp(b.role.as_str()),
    }
}

/// In-memory implementation of the User repository.
#[derive(Debug, Clone)]
pub struct MemoryUserRepository {
    db: MemoryDb,
}

impl MemoryUserRepository {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: User) -> SicoraResult<User> {
        let mut tables = self.db.write().await;
        check_unique(&tables, &user)?;
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> SicoraResult<User> {
        let tables = self.db.read().await;
        let user = tables
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(ENTITY, id))?;
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> SicoraResult<User> {
        let tables = self.db.read().await;
        let user = tables
            .users
            .values()
            .find(|u| same_email(&u.email, email))
            .cloned()
            .ok_or_else(|| StoreError::not_found(ENTITY, format!("email={email}")))?;
        Ok(user)
    }

    async fn get_by_document_number(&self, document_number: &str) -> SicoraResult<User> {
        let tables = self.db.read().await;
        let user = tables
            .users
            .values()
            .find(|u| same_document(&u.document_number, document_number))
            .cloned()
            .ok_or_else(|| {
                StoreError::not_found(ENTITY, format!("document_number={document_number}"))
            })?;
        Ok(user)
    }

    async fn update(&self, user: User) -> SicoraResult<User> {
        let mut tables = self.db.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(StoreError::not_found(ENTITY, user.id).into());
        }
        check_unique(&tables, &user)?;
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> SicoraResult<()> {
        let mut tables = self.db.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(ENTITY, id))?;
        user.deactivate();
        Ok(())
    }

    async fn list(&self, filter: UserFilter) -> SicoraResult<PaginatedResult<User>> {
        let tables = self.db.read().await;
        let mut matched: Vec<&User> = tables
            .users
            .values()
            .filter(|u| matches_filter(&filter, &tables.cohort_programs, u))
            .collect();

        matched.sort_by(|a, b| {
            let ord = compare(filter.sort_by, a, b);
            match filter.sort_direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(filter.offset())
            .take(filter.page_size as usize)
            .cloned()
            .collect();

        Ok(PaginatedResult {
            items,
            total,
            page: filter.page.max(1),
            page_size: filter.page_size,
        })
    }

    async fn get_by_ficha(&self, ficha_id: &str) -> SicoraResult<Vec<User>> {
        let tables = self.db.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.is_learner() && u.ficha_id.as_deref() == Some(ficha_id))
            .cloned()
            .collect())
    }

    async fn exists_by_email(&self, email: &str) -> SicoraResult<bool> {
        let tables = self.db.read().await;
        Ok(tables.users.values().any(|u| same_email(&u.email, email)))
    }

    async fn exists_by_document_number(&self, document_number: &str) -> SicoraResult<bool> {
        let tables = self.db.read().await;
        Ok(tables
            .users
            .values()
            .any(|u| same_document(&u.document_number, document_number)))
    }

    async fn bulk_create(&self, users: Vec<User>) -> SicoraResult<BulkOperationResult> {
        let mut tables = self.db.write().await;
        let mut result = BulkOperationResult::new(users.len());
        for (index, user) in users.into_iter().enumerate() {
            match check_unique(&tables, &user) {
                Ok(()) => {
                    tables.users.insert(user.id, user);
                    result.record_success();
                }
                Err(err) => {
                    let field = match &err {
                        StoreError::Duplicate { field, .. } => Some(*field),
                        _ => None,
                    };
                    result.record_failure(index, user.email, err, field);
                }
            }
        }
        Ok(result)
    }

    async fn bulk_update(&self, updates: Vec<(String, User)>) -> SicoraResult<BulkOperationResult> {
        let mut tables = self.db.write().await;
        let mut result = BulkOperationResult::new(updates.len());
        for (index, (email, mut user)) in updates.into_iter().enumerate() {
            let Some(existing_id) = find_by_email_mut(&mut tables, &email).map(|u| u.id) else {
                result.record_failure(index, email, "user not found", Some("email"));
                continue;
            };
            user.id = existing_id;
            if let Err(err) = check_unique(&tables, &user) {
                let field = match &err {
                    StoreError::Duplicate { field, .. } => Some(*field),
                    _ => None,
                };
                result.record_failure(index, email, err, field);
                continue;
            }
            user.updated_at = Utc::now();
            tables.users.insert(existing_id, user);
            result.record_success();
        }
        Ok(result)
    }

    async fn bulk_delete(&self, emails: Vec<String>) -> SicoraResult<BulkOperationResult> {
        self.bulk_status_change(emails, false).await
    }

    async fn bulk_status_change(
        &self,
        emails: Vec<String>,
        is_active: bool,
    ) -> SicoraResult<BulkOperationResult> {
        let mut tables = self.db.write().await;
        let mut result = BulkOperationResult::new(emails.len());
        for (index, email) in emails.into_iter().enumerate() {
            match find_by_email_mut(&mut tables, &email) {
                Some(user) => {
                    if is_active {
                        user.activate();
                    } else {
                        user.deactivate();
                    }
                    result.record_success();
                }
                None => result.record_failure(index, email, "user not found", Some("email")),
            }
        }
        Ok(result)
    }

    async fn get_multiple_by_emails(&self, emails: &[String]) -> SicoraResult<Vec<User>> {
        let tables = self.db.read().await;
        Ok(emails
            .iter()
            .filter_map(|email| tables.users.values().find(|u| same_email(&u.email, email)))
            .cloned()
            .collect())
    }

    async fn count_by_role(&self) -> SicoraResult<BTreeMap<UserRole, u64>> {
        let tables = self.db.read().await;
        let mut counts = BTreeMap::new();
        for user in tables.users.values() {
            *counts.entry(user.role).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count_by_program(&self) -> SicoraResult<BTreeMap<String, u64>> {
        let tables = self.db.read().await;
        let mut counts = BTreeMap::new();
        for user in tables.users.values() {
            if let Some(program) = program_of(&tables.cohort_programs, user) {
                *counts.entry(program.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn registration_trend(&self, days: u32) -> SicoraResult<BTreeMap<NaiveDate, u64>> {
        let tables = self.db.read().await;
        let today = Utc::now().date_naive();
        let mut trend: BTreeMap<NaiveDate, u64> = (0..i64::from(days))
            .map(|offset| (today - Duration::days(offset), 0))
            .collect();
        for user in tables.users.values() {
            if let Some(count) = trend.get_mut(&user.created_at.date_naive()) {
                *count += 1;
            }
        }
        Ok(trend)
    }

    async fn active_inactive_count(&self) -> SicoraResult<ActivityCounts> {
        let tables = self.db.read().await;
        let active = tables.users.values().filter(|u| u.is_active).count() as u64;
        Ok(ActivityCounts {
            active,
            inactive: tables.users.len() as u64 - active,
        })
    }
}
