//! Per-role MFA enforcement policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::mfa_method::MfaMethodType;
use super::role::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementLevel {
    Mandatory,
    Recommended,
    Optional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfaEnforcementPolicy {
    pub id: Uuid,
    pub role: UserRole,
    /// Preferred methods, in order of preference.
    pub primary_methods: Vec<MfaMethodType>,
    /// Fallback methods, in order of preference.
    pub alternative_methods: Vec<MfaMethodType>,
    pub enforcement_level: EnforcementLevel,
    pub grace_period_days: u32,
    pub require_backup_codes: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MfaEnforcementPolicy {
    pub fn is_mandatory(&self) -> bool {
        self.enforcement_level == EnforcementLevel::Mandatory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_snake_case_names() {
        let now = Utc::now();
        let policy = MfaEnforcementPolicy {
            id: Uuid::new_v4(),
            role: UserRole::Admin,
            primary_methods: vec![MfaMethodType::Totp],
            alternative_methods: vec![MfaMethodType::EmailOtp],
            enforcement_level: EnforcementLevel::Mandatory,
            grace_period_days: 7,
            require_backup_codes: true,
            created_at: now,
            updated_at: now,
        };
        assert!(policy.is_mandatory());

        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["enforcement_level"], "mandatory");
        assert_eq!(json["alternative_methods"][0], "email_otp");
    }
}
