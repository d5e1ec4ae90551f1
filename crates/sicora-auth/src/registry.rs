//! Per-user MFA method registry.

use sicora_core::models::mfa_method::{CreateMfaMethod, MethodCredential, MfaMethod};
use sicora_core::models::user::User;
use sicora_core::repository::{EnforcementPolicyRepository, MfaMethodRepository};
use tracing::info;
use uuid::Uuid;

use crate::config::MfaConfig;
use crate::error::{AuthError, AuthResult};
use crate::policy::PolicyResolver;
use crate::totp::{self, TotpEnrollment};

/// Registers, promotes and removes the second factors of a user, subject
/// to the enforcement policy of the user's role.
pub struct MethodRegistry<M: MfaMethodRepository, P: EnforcementPolicyRepository> {
    method_repo: M,
    policies: PolicyResolver<P>,
    config: MfaConfig,
}

impl<M: MfaMethodRepository, P: EnforcementPolicyRepository> MethodRegistry<M, P> {
    pub fn new(method_repo: M, policy_repo: P, config: MfaConfig) -> Self {
        Self {
            method_repo,
            policies: PolicyResolver::new(policy_repo),
            config,
        }
    }

    /// Register a method. The first method of a user always becomes
    /// primary; otherwise `is_primary` demotes the current primary.
    pub async fn register(
        &self,
        user: &User,
        credential: MethodCredential,
        is_primary: bool,
    ) -> AuthResult<MfaMethod> {
        let method_type = credential.method_type();
        let policy = self.policies.resolve(user.role).await?;
        if !policy.allows(method_type) {
            return Err(AuthError::MethodNotAllowed {
                method: method_type,
                role: user.role,
            });
        }

        let existing = self.method_repo.list_by_user(user.id).await?;
        let method = self
            .method_repo
            .create(CreateMfaMethod {
                user_id: user.id,
                is_primary: is_primary || existing.is_empty(),
                credential,
            })
            .await?;

        info!(
            user_id = %user.id,
            method = %method_type,
            is_primary = method.is_primary,
            "MFA method registered"
        );
        Ok(method)
    }

    /// Generate an authenticator secret and register it as a TOTP method.
    /// The returned enrollment carries the only plaintext copy of the secret.
    pub async fn enroll_totp(
        &self,
        user: &User,
        is_primary: bool,
    ) -> AuthResult<(MfaMethod, TotpEnrollment)> {
        let key = self
            .config
            .mfa_encryption_key
            .as_ref()
            .ok_or_else(|| AuthError::MfaNotConfigured("no TOTP encryption key".into()))?;
        let enrollment = totp::generate_enrollment(key, &self.config.totp_issuer, &user.email)?;

        let method = self
            .register(
                user,
                MethodCredential::Totp {
                    secret_encrypted: enrollment.secret_encrypted.clone(),
                },
                is_primary,
            )
            .await?;
        Ok((method, enrollment))
    }

    pub async fn list(&self, user_id: Uuid) -> AuthResult<Vec<MfaMethod>> {
        Ok(self.method_repo.list_by_user(user_id).await?)
    }

    pub async fn set_primary(&self, user_id: Uuid, method_id: Uuid) -> AuthResult<MfaMethod> {
        let method = self.owned_method(user_id, method_id).await?;
        if !method.is_enabled {
            return Err(AuthError::MethodDisabled);
        }
        let method = self.method_repo.set_primary(user_id, method_id).await?;
        info!(%user_id, method = %method.method_type, "Primary MFA method changed");
        Ok(method)
    }

    pub async fn set_enabled(
        &self,
        user_id: Uuid,
        method_id: Uuid,
        enabled: bool,
    ) -> AuthResult<MfaMethod> {
        self.owned_method(user_id, method_id).await?;
        let method = self.method_repo.set_enabled(method_id, enabled).await?;
        info!(%user_id, method = %method.method_type, enabled, "MFA method toggled");
        Ok(method)
    }

    pub async fn remove(&self, user_id: Uuid, method_id: Uuid) -> AuthResult<()> {
        let method = self.owned_method(user_id, method_id).await?;
        self.method_repo.delete(method_id).await?;
        info!(%user_id, method = %method.method_type, "MFA method removed");
        Ok(())
    }

    /// Load a method, rejecting one that belongs to another user.
    async fn owned_method(&self, user_id: Uuid, method_id: Uuid) -> AuthResult<MfaMethod> {
        let method = self.method_repo.get_by_id(method_id).await?;
        if method.user_id != user_id {
            return Err(AuthError::MethodNotRegistered {
                method: method.method_type,
            });
        }
        Ok(method)
    }
}
