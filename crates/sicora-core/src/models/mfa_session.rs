//! MFA verification session domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::mfa_method::MfaMethodType;

pub const DEFAULT_SESSION_TTL_SECS: i64 = 300;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Lifecycle position of a session. Everything but `Active` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaSessionState {
    Active,
    Verified,
    Expired,
    Exhausted,
}

impl MfaSessionState {
    pub fn is_terminal(self) -> bool {
        self != Self::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfaSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub method_type: MfaMethodType,
    /// The registered method the challenge was issued against.
    pub method_id: Option<Uuid>,
    /// SHA-256 of the delivered code, for email and SMS challenges.
    #[serde(skip)]
    pub code_hash: Option<String>,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MfaSession {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn has_exceeded_attempts(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    /// Derive the state at `now`. Verification and exhaustion are recorded
    /// facts and win over the clock; expiry is evaluated lazily.
    pub fn state_at(&self, now: DateTime<Utc>) -> MfaSessionState {
        if self.is_verified {
            MfaSessionState::Verified
        } else if self.has_exceeded_attempts() {
            MfaSessionState::Exhausted
        } else if self.is_expired_at(now) {
            MfaSessionState::Expired
        } else {
            MfaSessionState::Active
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateMfaSession {
    pub user_id: Uuid,
    pub method_type: MfaMethodType,
    pub method_id: Option<Uuid>,
    pub code_hash: Option<String>,
    pub max_attempts: u32,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// A conditional update recording one verification attempt.
///
/// Applies only while the stored session still has `expected_attempts`
/// attempts and is unverified; the attempt count becomes
/// `expected_attempts + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordAttempt {
    pub expected_attempts: u32,
    pub verified_at: Option<DateTime<Utc>>,
}
