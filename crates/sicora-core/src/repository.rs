//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations must make every
//! state transition on a single entity atomic: the conditional operations
//! (`record_attempt`, `mark_used`, `set_primary`, primary demotion in
//! `create`) behave as compare-and-swap against the stored row.
//!
//! Entities returned here may carry secret fields (hashes, encrypted
//! secrets). Those fields are excluded from serialization by the models
//! themselves.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SicoraResult;
use crate::models::{
    backup_code::{BackupCode, CreateBackupCodes},
    enforcement_policy::MfaEnforcementPolicy,
    mfa_method::{CreateMfaMethod, MfaMethod},
    mfa_session::{CreateMfaSession, MfaSession, RecordAttempt},
    role::UserRole,
    user::User,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSortField {
    #[default]
    CreatedAt,
    FirstName,
    LastName,
    Email,
    Role,
}

/// Filters and paging for user listings. Pages are 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub ficha_id: Option<String>,
    pub program: Option<String>,
    pub is_active: Option<bool>,
    /// Case-insensitive match against first name, last name or email.
    pub search: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub sort_by: UserSortField,
    pub sort_direction: SortDirection,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            role: None,
            ficha_id: None,
            program: None,
            is_active: None,
            search: None,
            page: 1,
            page_size: 20,
            sort_by: UserSortField::default(),
            sort_direction: SortDirection::default(),
        }
    }
}

impl UserFilter {
    /// Number of rows skipped before the requested page.
    pub fn offset(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.page_size as usize
    }
}

/// A paginated result set.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PaginatedResult<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Failure detail for one item of a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOperationError {
    /// Position of the item in the request.
    pub index: usize,
    /// Email or document identifying the item.
    pub user: String,
    pub error: String,
    pub field: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOperationResult {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<BulkOperationError>,
}

impl BulkOperationResult {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(
        &mut self,
        index: usize,
        user: impl Into<String>,
        error: impl ToString,
        field: Option<&str>,
    ) {
        self.failed += 1;
        self.errors.push(BulkOperationError {
            index,
            user: user.into(),
            error: error.to_string(),
            field: field.map(str::to_string),
        });
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCounts {
    pub active: u64,
    pub inactive: u64,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Persist a validated user. Fails with `DuplicateUser` when the email
    /// or document number is taken.
    fn create(&self, user: User) -> impl Future<Output = SicoraResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SicoraResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = SicoraResult<User>> + Send;
    fn get_by_document_number(
        &self,
        document_number: &str,
    ) -> impl Future<Output = SicoraResult<User>> + Send;
    fn update(&self, user: User) -> impl Future<Output = SicoraResult<User>> + Send;
    /// Soft-delete: deactivates the user.
    fn delete(&self, id: Uuid) -> impl Future<Output = SicoraResult<()>> + Send;
    fn list(
        &self,
        filter: UserFilter,
    ) -> impl Future<Output = SicoraResult<PaginatedResult<User>>> + Send;
    /// Every learner enrolled in a cohort.
    fn get_by_ficha(&self, ficha_id: &str) -> impl Future<Output = SicoraResult<Vec<User>>> + Send;
    fn exists_by_email(&self, email: &str) -> impl Future<Output = SicoraResult<bool>> + Send;
    fn exists_by_document_number(
        &self,
        document_number: &str,
    ) -> impl Future<Output = SicoraResult<bool>> + Send;

    fn bulk_create(
        &self,
        users: Vec<User>,
    ) -> impl Future<Output = SicoraResult<BulkOperationResult>> + Send;
    /// Replace users keyed by their current email.
    fn bulk_update(
        &self,
        updates: Vec<(String, User)>,
    ) -> impl Future<Output = SicoraResult<BulkOperationResult>> + Send;
    fn bulk_delete(
        &self,
        emails: Vec<String>,
    ) -> impl Future<Output = SicoraResult<BulkOperationResult>> + Send;
    fn bulk_status_change(
        &self,
        emails: Vec<String>,
        is_active: bool,
    ) -> impl Future<Output = SicoraResult<BulkOperationResult>> + Send;
    fn get_multiple_by_emails(
        &self,
        emails: &[String],
    ) -> impl Future<Output = SicoraResult<Vec<User>>> + Send;

    fn count_by_role(&self) -> impl Future<Output = SicoraResult<BTreeMap<UserRole, u64>>> + Send;
    fn count_by_program(&self) -> impl Future<Output = SicoraResult<BTreeMap<String, u64>>> + Send;
    /// Registrations per day over the last `days` days.
    fn registration_trend(
        &self,
        days: u32,
    ) -> impl Future<Output = SicoraResult<BTreeMap<NaiveDate, u64>>> + Send;
    fn active_inactive_count(&self) -> impl Future<Output = SicoraResult<ActivityCounts>> + Send;
}

// ---------------------------------------------------------------------------
// MFA
// ---------------------------------------------------------------------------

pub trait MfaMethodRepository: Send + Sync {
    /// Store a new method. When `input.is_primary` is set, any existing
    /// primary method of the user is demoted in the same atomic step.
    fn create(&self, input: CreateMfaMethod) -> impl Future<Output = SicoraResult<MfaMethod>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SicoraResult<MfaMethod>> + Send;
    fn list_by_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = SicoraResult<Vec<MfaMethod>>> + Send;
    fn get_primary(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = SicoraResult<Option<MfaMethod>>> + Send;
    /// Atomically demote the current primary and promote `method_id`.
    fn set_primary(
        &self,
        user_id: Uuid,
        method_id: Uuid,
    ) -> impl Future<Output = SicoraResult<MfaMethod>> + Send;
    fn set_enabled(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> impl Future<Output = SicoraResult<MfaMethod>> + Send;
    fn touch_last_used(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = SicoraResult<()>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = SicoraResult<()>> + Send;
}

pub trait BackupCodeRepository: Send + Sync {
    /// Store a new batch, discarding every previous code of the user.
    fn replace_batch(
        &self,
        input: CreateBackupCodes,
    ) -> impl Future<Output = SicoraResult<Vec<BackupCode>>> + Send;
    fn list_by_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = SicoraResult<Vec<BackupCode>>> + Send;
    /// Mark a code used if, and only if, it is still unused. Returns
    /// whether this call performed the transition.
    fn mark_used(
        &self,
        id: Uuid,
        used_at: DateTime<Utc>,
    ) -> impl Future<Output = SicoraResult<bool>> + Send;
    fn delete_by_user(&self, user_id: Uuid) -> impl Future<Output = SicoraResult<u64>> + Send;
}

pub trait MfaSessionRepository: Send + Sync {
    fn create(
        &self,
        input: CreateMfaSession,
    ) -> impl Future<Output = SicoraResult<MfaSession>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SicoraResult<MfaSession>> + Send;
    /// Apply one verification attempt. Fails with `Conflict` when the
    /// stored attempt count no longer equals `attempt.expected_attempts`
    /// or the session is already verified.
    fn record_attempt(
        &self,
        id: Uuid,
        attempt: RecordAttempt,
    ) -> impl Future<Output = SicoraResult<MfaSession>> + Send;
    /// Remove sessions that expired before `before`.
    fn cleanup_expired(
        &self,
        before: DateTime<Utc>,
    ) -> impl Future<Output = SicoraResult<u64>> + Send;
}

pub trait EnforcementPolicyRepository: Send + Sync {
    /// Fails with `PolicyNotFound` when the role has no policy.
    fn get_by_role(
        &self,
        role: UserRole,
    ) -> impl Future<Output = SicoraResult<MfaEnforcementPolicy>> + Send;
    fn list(&self) -> impl Future<Output = SicoraResult<Vec<MfaEnforcementPolicy>>> + Send;
}
