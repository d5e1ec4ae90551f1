//! Per-role MFA enforcement: policy lookup and requirement evaluation.

use chrono::{DateTime, Duration, Utc};
use sicora_core::error::SicoraError;
use sicora_core::models::enforcement_policy::{EnforcementLevel, MfaEnforcementPolicy};
use sicora_core::models::mfa_method::MfaMethodType;
use sicora_core::models::role::UserRole;
use sicora_core::repository::EnforcementPolicyRepository;
use tracing::debug;

use crate::error::AuthResult;

/// The policy in force for a role, after applying the fallback for roles
/// without a configured policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePolicy {
    pub role: UserRole,
    pub enforcement_level: EnforcementLevel,
    pub primary_methods: Vec<MfaMethodType>,
    pub alternative_methods: Vec<MfaMethodType>,
    pub grace_period_days: u32,
    pub require_backup_codes: bool,
    /// True when no policy was configured for the role.
    pub is_default: bool,
}

/// What a login must satisfy under a policy at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfaRequirement {
    NotRequired,
    /// MFA is encouraged; challenged only if the user has a method.
    Recommended,
    /// Mandatory, but the grace window has not closed yet.
    RequiredWithinGrace { deadline: DateTime<Utc> },
    Required,
}

impl From<MfaEnforcementPolicy> for EffectivePolicy {
    fn from(policy: MfaEnforcementPolicy) -> Self {
        Self {
            role: policy.role,
            enforcement_level: policy.enforcement_level,
            primary_methods: policy.primary_methods,
            alternative_methods: policy.alternative_methods,
            grace_period_days: policy.grace_period_days,
            require_backup_codes: policy.require_backup_codes,
            is_default: false,
        }
    }
}

impl EffectivePolicy {
    /// Optional MFA with every method type allowed.
    pub fn default_for(role: UserRole) -> Self {
        Self {
            role,
            enforcement_level: EnforcementLevel::Optional,
            primary_methods: MfaMethodType::ALL.to_vec(),
            alternative_methods: Vec::new(),
            grace_period_days: 0,
            require_backup_codes: false,
            is_default: true,
        }
    }

    pub fn allowed_methods(&self) -> impl Iterator<Item = MfaMethodType> + '_ {
        self.primary_methods
            .iter()
            .chain(&self.alternative_methods)
            .copied()
    }

    pub fn allows(&self, method: MfaMethodType) -> bool {
        self.allowed_methods().any(|m| m == method)
    }

    /// End of the grace window for a policy that started binding at `anchor`.
    pub fn grace_deadline(&self, anchor: DateTime<Utc>) -> DateTime<Utc> {
        anchor + Duration::days(i64::from(self.grace_period_days))
    }

    /// Evaluate the requirement at `now`. `grace_anchor` is the instant the
    /// policy started to bind the user (typically account creation).
    pub fn requirement(&self, grace_anchor: DateTime<Utc>, now: DateTime<Utc>) -> MfaRequirement {
        match self.enforcement_level {
            EnforcementLevel::Optional => MfaRequirement::NotRequired,
            EnforcementLevel::Recommended => MfaRequirement::Recommended,
            EnforcementLevel::Mandatory => {
                let deadline = self.grace_deadline(grace_anchor);
                if now < deadline {
                    MfaRequirement::RequiredWithinGrace { deadline }
                } else {
                    MfaRequirement::Required
                }
            }
        }
    }
}

/// Looks up the enforcement policy of a role.
pub struct PolicyResolver<P: EnforcementPolicyRepository> {
    policy_repo: P,
}

impl<P: EnforcementPolicyRepository> PolicyResolver<P> {
    pub fn new(policy_repo: P) -> Self {
        Self { policy_repo }
    }

    /// Resolve the policy for `role`. A missing policy falls back to
    /// [`EffectivePolicy::default_for`]; any other repository error
    /// propagates.
    pub async fn resolve(&self, role: UserRole) -> AuthResult<EffectivePolicy> {
        match self.policy_repo.get_by_role(role).await {
            Ok(policy) => Ok(policy.into()),
            Err(SicoraError::PolicyNotFound { .. }) => {
                debug!(%role, "No MFA policy configured, using default");
                Ok(EffectivePolicy::default_for(role))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn mandatory(grace_period_days: u32) -> EffectivePolicy {
        let now = Utc::now();
        MfaEnforcementPolicy {
            id: Uuid::new_v4(),
            role: UserRole::Admin,
            primary_methods: vec![MfaMethodType::Totp],
            alternative_methods: vec![MfaMethodType::EmailOtp],
            enforcement_level: EnforcementLevel::Mandatory,
            grace_period_days,
            require_backup_codes: true,
            created_at: now,
            updated_at: now,
        }
        .into()
    }

    #[test]
    fn default_policy_is_optional() {
        let policy = EffectivePolicy::default_for(UserRole::Learner);
        assert!(policy.is_default);
        assert_eq!(
            policy.requirement(Utc::now(), Utc::now()),
            MfaRequirement::NotRequired
        );
        assert!(MfaMethodType::ALL.iter().all(|m| policy.allows(*m)));
    }

    #[test]
    fn mandatory_within_grace() {
        let policy = mandatory(7);
        let anchor = Utc::now() - Duration::days(3);
        assert_eq!(
            policy.requirement(anchor, Utc::now()),
            MfaRequirement::RequiredWithinGrace {
                deadline: anchor + Duration::days(7)
            }
        );
    }

    #[test]
    fn mandatory_after_grace() {
        let policy = mandatory(7);
        let anchor = Utc::now() - Duration::days(8);
        assert_eq!(
            policy.requirement(anchor, Utc::now()),
            MfaRequirement::Required
        );
        assert_eq!(
            mandatory(0).requirement(Utc::now(), Utc::now()),
            MfaRequirement::Required
        );
    }

    #[test]
    fn configured_policy_restricts_methods() {
        let policy = mandatory(0);
        assert!(!policy.is_default);
        assert!(policy.allows(MfaMethodType::EmailOtp));
        assert!(!policy.allows(MfaMethodType::Sms));
        let methods: Vec<_> = policy.allowed_methods().collect();
        assert_eq!(methods, vec![MfaMethodType::Totp, MfaMethodType::EmailOtp]);
    }

    #[test]
    fn grace_deadline_counts_days_from_anchor() {
        let anchor = Utc::now();
        assert_eq!(mandatory(7).grace_deadline(anchor), anchor + Duration::days(7));
        assert_eq!(mandatory(0).grace_deadline(anchor), anchor);
    }
}
