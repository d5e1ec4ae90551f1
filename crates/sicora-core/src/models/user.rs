//! User domain model.
//!
//! A [`User`] can only be built through [`User::new`], which runs the full
//! validation chain. Consent and activity fields are written exclusively
//! by the mutators below, each of which refreshes `updated_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::UserRole;
use crate::validation::{self, ValidationError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

/// Evidence that one legal document was accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyAcceptance {
    pub version: String,
    pub accepted_at: DateTime<Utc>,
}

/// The three acceptances plus the address they were given from. Either all
/// of it is recorded or none of it is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LegalConsent {
    pub privacy_policy: PolicyAcceptance,
    pub terms: PolicyAcceptance,
    pub data_treatment: PolicyAcceptance,
    pub ip_address: String,
}

/// Versions of the legal documents, either published or accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyVersions {
    pub privacy_policy: String,
    pub terms: String,
    pub data_treatment: String,
}

impl PolicyVersions {
    pub fn new(
        privacy_policy: impl Into<String>,
        terms: impl Into<String>,
        data_treatment: impl Into<String>,
    ) -> Self {
        Self {
            privacy_policy: privacy_policy.into(),
            terms: terms.into(),
            data_treatment: data_treatment.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub document_number: String,
    pub document_type: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    /// Argon2id PHC string. Persisted, never serialized outward.
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    /// Learner cohort. Only meaningful for [`UserRole::Learner`].
    pub ficha_id: Option<String>,
    pub sede_id: Option<Uuid>,
    pub email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub legal_consent: Option<LegalConsent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub document_number: String,
    pub document_type: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub ficha_id: Option<String>,
    pub sede_id: Option<Uuid>,
}

impl User {
    /// Validate `input` and build an active, unverified user with no
    /// recorded consent.
    pub fn new(input: NewUser) -> Result<Self, ValidationError> {
        validation::validate_user_data(
            &input.first_name,
            &input.last_name,
            &input.email,
            &input.document_number,
            input.role.as_str(),
        )?;
        if let Some(ficha) = &input.ficha_id {
            validation::validate_ficha_id(ficha)?;
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            document_number: input.document_number,
            document_type: input.document_type,
            phone: input.phone,
            role: input.role,
            status: UserStatus::Active,
            password_hash: None,
            is_active: true,
            ficha_id: input.ficha_id,
            sede_id: input.sede_id,
            email_verified: false,
            email_verified_at: None,
            legal_consent: None,
            created_at: now,
            updated_at: now,
            last_login: None,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_learner(&self) -> bool {
        self.role == UserRole::Learner
    }

    pub fn is_instructor(&self) -> bool {
        self.role == UserRole::Instructor
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_coordinator(&self) -> bool {
        self.role == UserRole::Coordinator
    }

    pub fn is_director(&self) -> bool {
        self.role == UserRole::Director
    }

    pub fn mark_logged_in(&mut self) {
        let now = Utc::now();
        self.last_login = Some(now);
        self.updated_at = now;
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.status = UserStatus::Active;
        self.updated_at = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.status = UserStatus::Inactive;
        self.updated_at = Utc::now();
    }

    pub fn verify_email(&mut self) {
        let now = Utc::now();
        self.email_verified = true;
        self.email_verified_at = Some(now);
        self.updated_at = now;
    }

    /// Move the user to another cohort, or clear it with `None`.
    pub fn assign_ficha(&mut self, ficha_id: Option<String>) -> Result<(), ValidationError> {
        if let Some(ficha) = &ficha_id {
            validation::validate_ficha_id(ficha)?;
        }
        self.ficha_id = ficha_id;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record acceptance of the privacy policy, terms and data-treatment
    /// authorization in a single step.
    pub fn accept_legal_policies(&mut self, versions: PolicyVersions, ip_address: impl Into<String>) {
        let now = Utc::now();
        let accepted = |version: String| PolicyAcceptance {
            version,
            accepted_at: now,
        };
        self.legal_consent = Some(LegalConsent {
            privacy_policy: accepted(versions.privacy_policy),
            terms: accepted(versions.terms),
            data_treatment: accepted(versions.data_treatment),
            ip_address: ip_address.into(),
        });
        self.updated_at = now;
    }

    pub fn has_accepted_all_policies(&self) -> bool {
        self.legal_consent.is_some()
    }

    /// True when consent was never given, or when any accepted version
    /// differs from the currently published one.
    pub fn needs_policy_update(&self, current: &PolicyVersions) -> bool {
        match &self.legal_consent {
            None => true,
            Some(consent) => {
                consent.privacy_policy.version != current.privacy_policy
                    || consent.terms.version != current.terms
                    || consent.data_treatment.version != current.data_treatment
            }
        }
    }

    /// The gate in front of every login: active and fully consented.
    pub fn can_access_system(&self) -> bool {
        self.is_active && self.has_accepted_all_policies()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            first_name: "Ana María".into(),
            last_name: "Gómez".into(),
            email: "ana.gomez@sena.edu.co".into(),
            document_number: "1020304050".into(),
            document_type: "CC".into(),
            role: UserRole::Learner,
            phone: Some("3001234567".into()),
            ficha_id: Some("2558104".into()),
            sede_id: None,
        }
    }

    fn current_versions() -> PolicyVersions {
        PolicyVersions::new("2.0", "1.3", "1.1")
    }

    #[test]
    fn new_user_round_trips_fields() {
        let user = User::new(new_user()).unwrap();
        assert_eq!(user.first_name, "Ana María");
        assert_eq!(user.last_name, "Gómez");
        assert_eq!(user.email, "ana.gomez@sena.edu.co");
        assert_eq!(user.document_number, "1020304050");
        assert_eq!(user.document_type, "CC");
        assert_eq!(user.role, UserRole::Learner);
        assert_eq!(user.phone.as_deref(), Some("3001234567"));
        assert_eq!(user.ficha_id.as_deref(), Some("2558104"));
        assert_eq!(user.status, UserStatus::Active);
        assert!(user.is_active);
        assert!(!user.email_verified);
        assert!(user.legal_consent.is_none());
        assert!(user.last_login.is_none());
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn new_user_rejects_invalid_fields() {
        let mut input = new_user();
        input.email = "a@b".into();
        assert!(User::new(input).is_err());

        let mut input = new_user();
        input.ficha_id = Some("12".into());
        assert!(User::new(input).is_err());
    }

    #[test]
    fn full_name_and_role_predicates() {
        let user = User::new(new_user()).unwrap();
        assert_eq!(user.full_name(), "Ana María Gómez");
        assert!(user.is_learner());
        assert!(!user.is_instructor());
        assert!(!user.is_admin());
        assert!(!user.is_coordinator());
        assert!(!user.is_director());
    }

    #[test]
    fn mutators_refresh_updated_at() {
        let mut user = User::new(new_user()).unwrap();
        let created = user.updated_at;

        user.mark_logged_in();
        assert_eq!(user.last_login, Some(user.updated_at));
        assert!(user.updated_at >= created);

        user.deactivate();
        assert!(!user.is_active);
        assert_eq!(user.status, UserStatus::Inactive);

        user.activate();
        assert!(user.is_active);
        assert_eq!(user.status, UserStatus::Active);

        user.verify_email();
        assert!(user.email_verified);
        assert_eq!(user.email_verified_at, Some(user.updated_at));
    }

    #[test]
    fn assign_ficha_validates() {
        let mut user = User::new(new_user()).unwrap();
        assert!(user.assign_ficha(Some("abc".into())).is_err());
        assert_eq!(user.ficha_id.as_deref(), Some("2558104"));
        user.assign_ficha(None).unwrap();
        assert!(user.ficha_id.is_none());
    }

    #[test]
    fn consent_is_recorded_atomically() {
        let mut user = User::new(new_user()).unwrap();
        assert!(!user.has_accepted_all_policies());

        user.accept_legal_policies(current_versions(), "10.0.0.8");
        let consent = user.legal_consent.as_ref().unwrap();
        assert_eq!(consent.privacy_policy.version, "2.0");
        assert_eq!(consent.terms.version, "1.3");
        assert_eq!(consent.data_treatment.version, "1.1");
        assert_eq!(consent.ip_address, "10.0.0.8");
        assert_eq!(consent.terms.accepted_at, user.updated_at);
        assert!(user.has_accepted_all_policies());
    }

    #[test]
    fn needs_policy_update_without_consent() {
        let user = User::new(new_user()).unwrap();
        assert!(user.needs_policy_update(&current_versions()));
    }

    #[test]
    fn needs_policy_update_on_any_single_mismatch() {
        let mut user = User::new(new_user()).unwrap();
        user.accept_legal_policies(current_versions(), "10.0.0.8");
        assert!(!user.needs_policy_update(&current_versions()));

        assert!(user.needs_policy_update(&PolicyVersions::new("2.1", "1.3", "1.1")));
        assert!(user.needs_policy_update(&PolicyVersions::new("2.0", "1.4", "1.1")));
        assert!(user.needs_policy_update(&PolicyVersions::new("2.0", "1.3", "1.2")));
    }

    #[test]
    fn access_requires_active_and_consent() {
        let mut user = User::new(new_user()).unwrap();
        assert!(!user.can_access_system());

        user.accept_legal_policies(current_versions(), "10.0.0.8");
        assert!(user.can_access_system());

        user.deactivate();
        assert!(!user.can_access_system());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let mut user = User::new(new_user()).unwrap();
        user.password_hash = Some("$argon2id$v=19$secret".into());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "aprendiz");
    }
}
