//! MFA service — login evaluation, challenge issue and verification,
//! backup code lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sicora_core::error::SicoraError;
use sicora_core::models::backup_code::CreateBackupCodes;
use sicora_core::models::mfa_method::{MfaMethod, MfaMethodType};
use sicora_core::models::mfa_session::{CreateMfaSession, MfaSession};
use sicora_core::models::user::User;
use sicora_core::repository::{
    BackupCodeRepository, EnforcementPolicyRepository, MfaMethodRepository,
    MfaSessionRepository, UserRepository,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backup_codes::{self, BackupCodeBatch};
use crate::config::MfaConfig;
use crate::error::{AuthError, AuthResult};
use crate::otp;
use crate::policy::{EffectivePolicy, MfaRequirement, PolicyResolver};
use crate::session::{self, AttemptOutcome};
use crate::totp;

/// Verifies a WebAuthn assertion against a stored credential.
///
/// Ceremony handling (challenge generation, origin and counter checks) is
/// owned by the implementor.
pub trait AssertionVerifier: Send + Sync {
    fn verify_assertion(&self, credential: &str, assertion: &str) -> Result<bool, AuthError>;
}

/// What a login must do next once the password step has succeeded.
#[derive(Debug, Clone)]
pub enum LoginDecision {
    /// No second factor needed. `enrollment_deadline` is set while a
    /// mandatory policy is still in its grace window.
    Allow {
        enrollment_deadline: Option<DateTime<Utc>>,
    },
    /// Verify one of `methods` (primary first), or consume a backup code.
    Challenge { methods: Vec<MfaMethod> },
    /// A mandatory policy applies and the user has no usable method.
    EnrollmentRequired { allowed_methods: Vec<MfaMethodType> },
}

/// Input for issuing a challenge.
#[derive(Debug, Clone, Default)]
pub struct ChallengeInput {
    pub user_id: Uuid,
    /// Method to challenge; the first usable method, primary first, when `None`.
    pub method_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A challenge that was opened.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub session: MfaSession,
    /// Plaintext code to deliver, for email and SMS challenges. Never stored.
    pub code: Option<String>,
    /// Email address or phone number the code goes to.
    pub destination: Option<String>,
}

/// A successful verification.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub session: MfaSession,
    /// The user with refreshed login metadata.
    pub user: User,
}

/// MFA orchestration service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the storage crate.
pub struct MfaService<U, M, B, S, P>
where
    U: UserRepository,
    M: MfaMethodRepository,
    B: BackupCodeRepository,
    S: MfaSessionRepository,
    P: EnforcementPolicyRepository,
{
    user_repo: U,
    method_repo: M,
    backup_repo: B,
    session_repo: S,
    policies: PolicyResolver<P>,
    config: MfaConfig,
    assertion_verifier: Option<Arc<dyn AssertionVerifier>>,
}

impl<U, M, B, S, P> MfaService<U, M, B, S, P>
where
    U: UserRepository,
    M: MfaMethodRepository,
    B: BackupCodeRepository,
    S: MfaSessionRepository,
    P: EnforcementPolicyRepository,
{
    pub fn new(
        user_repo: U,
        method_repo: M,
        backup_repo: B,
        session_repo: S,
        policy_repo: P,
        config: MfaConfig,
    ) -> Self {
        Self {
            user_repo,
            method_repo,
            backup_repo,
            session_repo,
            policies: PolicyResolver::new(policy_repo),
            config,
            assertion_verifier: None,
        }
    }

    /// Enable WebAuthn challenges.
    pub fn with_assertion_verifier(mut self, verifier: Arc<dyn AssertionVerifier>) -> Self {
        self.assertion_verifier = Some(verifier);
        self
    }

    /// Decide whether a login needs a second factor.
    ///
    /// `grace_anchor` is when the role's policy started to bind the user;
    /// defaults to account creation.
    pub async fn evaluate_login(
        &self,
        user_id: Uuid,
        grace_anchor: Option<DateTime<Utc>>,
    ) -> AuthResult<LoginDecision> {
        // 1. System access gate.
        let user = self.accessible_user(user_id).await?;

        // 2. Policy and requirement for the role.
        let policy = self.policies.resolve(user.role).await?;
        let requirement = policy.requirement(grace_anchor.unwrap_or(user.created_at), Utc::now());

        // 3. Usable methods: enabled and still allowed, primary first.
        let methods = self.usable_methods(&user, &policy).await?;

        let decision = match (requirement, methods.is_empty()) {
            (_, false) => LoginDecision::Challenge { methods },
            (MfaRequirement::Required, true) => LoginDecision::EnrollmentRequired {
                allowed_methods: policy.allowed_methods().collect(),
            },
            (MfaRequirement::RequiredWithinGrace { deadline }, true) => LoginDecision::Allow {
                enrollment_deadline: Some(deadline),
            },
            (MfaRequirement::NotRequired | MfaRequirement::Recommended, true) => {
                LoginDecision::Allow {
                    enrollment_deadline: None,
                }
            }
        };
        debug!(user_id = %user.id, role = %user.role, ?requirement, "Login evaluated");
        Ok(decision)
    }

    /// Open a verification session against one of the user's methods.
    ///
    /// Without an explicit `method_id` the first usable method is taken,
    /// in the order [`MfaService::evaluate_login`] offers them.
    pub async fn issue_challenge(&self, input: ChallengeInput) -> AuthResult<IssuedChallenge> {
        // 1. System access gate and policy.
        let user = self.accessible_user(input.user_id).await?;
        let policy = self.policies.resolve(user.role).await?;

        // 2. Resolve the method.
        let method = match input.method_id {
            Some(method_id) => {
                let method = self.method_repo.get_by_id(method_id).await?;
                if method.user_id != user.id {
                    return Err(AuthError::MethodNotRegistered {
                        method: method.method_type,
                    });
                }
                if !method.is_enabled {
                    return Err(AuthError::MethodDisabled);
                }
                ensure_allowed(&user, &policy, method.method_type)?;
                method
            }
            None => self
                .usable_methods(&user, &policy)
                .await?
                .into_iter()
                .next()
                .ok_or(AuthError::NoMethodsRegistered)?,
        };

        // 3. Delivered-code methods get a fresh code; only its hash is kept.
        let (code, destination) = match method.method_type {
            MfaMethodType::EmailOtp => (
                Some(otp::generate_code(self.config.otp_digits)),
                method.email_address.clone(),
            ),
            MfaMethodType::Sms => (
                Some(otp::generate_code(self.config.otp_digits)),
                method.phone_number.clone(),
            ),
            MfaMethodType::Totp | MfaMethodType::WebAuthn => (None, None),
        };

        // 4. Persist the session.
        let session = self
            .session_repo
            .create(CreateMfaSession {
                user_id: input.user_id,
                method_type: method.method_type,
                method_id: Some(method.id),
                code_hash: code.as_deref().map(otp::hash_code),
                max_attempts: self.config.max_attempts,
                ip_address: input.ip_address,
                user_agent: input.user_agent,
                expires_at: Utc::now() + Duration::seconds(self.config.session_ttl_secs),
            })
            .await?;

        info!(
            user_id = %session.user_id,
            session_id = %session.id,
            method = %session.method_type,
            "MFA challenge issued"
        );
        Ok(IssuedChallenge {
            session,
            code,
            destination,
        })
    }

    /// Submit a code (or WebAuthn assertion) for a session.
    ///
    /// Each call on an active session consumes exactly one attempt, even
    /// under concurrent submissions.
    pub async fn verify_challenge(&self, session_id: Uuid, code: &str) -> AuthResult<VerifyOutcome> {
        // 1. Load and reject terminal sessions before doing any crypto.
        let mut current = self.session_repo.get_by_id(session_id).await?;
        if let Err(err) = session::ensure_active(&current, Utc::now()) {
            self.log_refusal(&current, &err);
            return Err(err);
        }

        // 2. The user must still pass the gate and the policy.
        let user = self.accessible_user(current.user_id).await?;
        let policy = self.policies.resolve(user.role).await?;
        ensure_allowed(&user, &policy, current.method_type)?;

        // 3. Check the submitted code once.
        let code_matches = self.code_matches(&current, code).await?;

        // 4. Record the attempt with a conditional write, re-reading on conflict.
        // Every conflict means another attempt was recorded, so after
        // `max_attempts` conflicts the session is terminal and planning fails.
        let max_retries = self.config.max_cas_retries.max(current.max_attempts);
        let mut retries = 0;
        let (updated, outcome) = loop {
            let (attempt, outcome) = match session::plan_attempt(&current, code_matches, Utc::now()) {
                Ok(plan) => plan,
                Err(err) => {
                    self.log_refusal(&current, &err);
                    return Err(err);
                }
            };
            match self.session_repo.record_attempt(session_id, attempt).await {
                Ok(updated) => break (updated, outcome),
                Err(SicoraError::Conflict { .. }) if retries < max_retries => {
                    retries += 1;
                    debug!(%session_id, retries, "Session attempt raced, re-reading");
                    current = self.session_repo.get_by_id(session_id).await?;
                }
                Err(e) => return Err(e.into()),
            }
        };

        // 5. Report failures.
        if let Err(err) = outcome.into_result() {
            warn!(
                user_id = %updated.user_id,
                session_id = %updated.id,
                method = %updated.method_type,
                attempts = updated.attempts,
                exhausted = matches!(outcome, AttemptOutcome::Exhausted),
                "MFA verification failed"
            );
            return Err(err);
        }

        // 6. Success: method usage and login metadata.
        if let Some(method_id) = updated.method_id {
            self.method_repo
                .touch_last_used(method_id, updated.verified_at.unwrap_or_else(Utc::now))
                .await?;
        }
        let user = self.complete_login(updated.user_id).await?;

        info!(
            user_id = %updated.user_id,
            session_id = %updated.id,
            method = %updated.method_type,
            attempts = updated.attempts,
            "MFA verification succeeded"
        );
        Ok(VerifyOutcome {
            session: updated,
            user,
        })
    }

    /// Replace the user's backup codes with a fresh batch. Returns the
    /// plaintext codes, which are not retrievable afterwards.
    pub async fn generate_backup_codes(&self, user_id: Uuid) -> AuthResult<Vec<String>> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let batch = BackupCodeBatch::generate(
            self.config.backup_code_count,
            self.config.pepper.as_deref(),
            self.config.hash_cost,
        )?;

        let expires_at = Utc::now() + Duration::days(self.config.backup_code_validity_days);
        let stored = self
            .backup_repo
            .replace_batch(CreateBackupCodes {
                user_id: user.id,
                code_hashes: batch.code_hashes,
                expires_at,
            })
            .await?;

        info!(user_id = %user.id, count = stored.len(), %expires_at, "Backup codes generated");
        Ok(batch.codes)
    }

    /// Complete a login with a backup code instead of a challenge.
    pub async fn consume_backup_code(&self, user_id: Uuid, code: &str) -> AuthResult<User> {
        // 1. System access gate, before any code is burned.
        self.accessible_user(user_id).await?;

        // 2. Find the stored code the input hashes to.
        let normalized = backup_codes::normalize_code(code)?;
        let pepper = self.config.pepper.as_deref();
        let mut matched = None;
        for stored in self.backup_repo.list_by_user(user_id).await? {
            if backup_codes::verify_code(&normalized, &stored.code_hash, pepper)? {
                matched = Some(stored);
                break;
            }
        }
        let Some(stored) = matched else {
            warn!(%user_id, "Backup code did not match");
            return Err(AuthError::BackupCodeInvalid);
        };

        // 3. Expiry wins over the used flag.
        let now = Utc::now();
        if stored.is_expired_at(now) {
            warn!(%user_id, backup_code_id = %stored.id, "Expired backup code presented");
            return Err(AuthError::BackupCodeExpired);
        }

        // 4. Single use, decided by the conditional write.
        if stored.is_used || !self.backup_repo.mark_used(stored.id, now).await? {
            warn!(%user_id, backup_code_id = %stored.id, "Backup code reuse rejected");
            return Err(AuthError::BackupCodeAlreadyUsed);
        }

        let user = self.complete_login(user_id).await?;
        info!(%user_id, backup_code_id = %stored.id, "Backup code consumed");
        Ok(user)
    }

    /// Number of unused, unexpired backup codes.
    pub async fn remaining_backup_codes(&self, user_id: Uuid) -> AuthResult<usize> {
        let now = Utc::now();
        Ok(self
            .backup_repo
            .list_by_user(user_id)
            .await?
            .iter()
            .filter(|c| c.is_available_at(now))
            .count())
    }

    /// Delete sessions that have expired. Expiry is enforced at read time
    /// regardless; this only reclaims storage.
    pub async fn cleanup_expired_sessions(&self) -> AuthResult<u64> {
        let removed = self.session_repo.cleanup_expired(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "Expired MFA sessions removed");
        }
        Ok(removed)
    }

    async fn code_matches(&self, session: &MfaSession, code: &str) -> AuthResult<bool> {
        match session.method_type {
            MfaMethodType::EmailOtp | MfaMethodType::Sms => {
                let stored = session.code_hash.as_deref().ok_or_else(|| {
                    AuthError::Core(SicoraError::Internal(format!(
                        "session {} has no code hash",
                        session.id
                    )))
                })?;
                Ok(otp::verify_code(code, stored))
            }
            MfaMethodType::Totp => {
                let method = self.session_method(session).await?;
                let key = self
                    .config
                    .mfa_encryption_key
                    .as_ref()
                    .ok_or_else(|| AuthError::MfaNotConfigured("no TOTP encryption key".into()))?;
                let encrypted = method
                    .secret_encrypted
                    .as_deref()
                    .ok_or_else(|| AuthError::Crypto("TOTP method has no secret".into()))?;
                let secret = totp::decrypt_secret(key, encrypted)?;
                totp::verify_code(
                    &secret,
                    code,
                    &self.config.totp_issuer,
                    &session.user_id.to_string(),
                )
            }
            MfaMethodType::WebAuthn => {
                let method = self.session_method(session).await?;
                let verifier = self
                    .assertion_verifier
                    .as_ref()
                    .ok_or_else(|| AuthError::MfaNotConfigured("no WebAuthn verifier".into()))?;
                let credential = method
                    .webauthn_data
                    .as_deref()
                    .ok_or_else(|| AuthError::Crypto("WebAuthn method has no credential".into()))?;
                verifier.verify_assertion(credential, code)
            }
        }
    }

    async fn session_method(&self, session: &MfaSession) -> AuthResult<MfaMethod> {
        let method_id = session.method_id.ok_or(AuthError::MethodNotRegistered {
            method: session.method_type,
        })?;
        Ok(self.method_repo.get_by_id(method_id).await?)
    }

    async fn complete_login(&self, user_id: Uuid) -> AuthResult<User> {
        let mut user = self.accessible_user(user_id).await?;
        user.mark_logged_in();
        Ok(self.user_repo.update(user).await?)
    }

    /// Load a user that may access the system: active and fully consented.
    async fn accessible_user(&self, user_id: Uuid) -> AuthResult<User> {
        let user = self.user_repo.get_by_id(user_id).await?;
        if !user.is_active {
            return Err(self.deny(&user, "account is inactive"));
        }
        if !user.has_accepted_all_policies() {
            return Err(self.deny(&user, "legal policies have not been accepted"));
        }
        Ok(user)
    }

    /// Enabled methods the policy still allows, primary first, then oldest.
    async fn usable_methods(
        &self,
        user: &User,
        policy: &EffectivePolicy,
    ) -> AuthResult<Vec<MfaMethod>> {
        let mut methods: Vec<MfaMethod> = self
            .method_repo
            .list_by_user(user.id)
            .await?
            .into_iter()
            .filter(|m| m.is_enabled && policy.allows(m.method_type))
            .collect();
        methods.sort_by_key(|m| !m.is_primary);
        Ok(methods)
    }

    fn deny(&self, user: &User, reason: &str) -> AuthError {
        warn!(user_id = %user.id, reason, "System access denied");
        AuthError::AccessDenied {
            reason: reason.into(),
        }
    }

    fn log_refusal(&self, session: &MfaSession, err: &AuthError) {
        warn!(
            user_id = %session.user_id,
            session_id = %session.id,
            method = %session.method_type,
            attempts = session.attempts,
            error = %err,
            "MFA session refused attempt"
        );
    }
}

fn ensure_allowed(user: &User, policy: &EffectivePolicy, method: MfaMethodType) -> AuthResult<()> {
    if policy.allows(method) {
        return Ok(());
    }
    warn!(user_id = %user.id, role = %user.role, %method, "MFA method not allowed by policy");
    Err(AuthError::MethodNotAllowed {
        method,
        role: user.role,
    })
}
