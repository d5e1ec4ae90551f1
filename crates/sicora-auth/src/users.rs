//! User registration and account maintenance.

use sicora_core::error::{SicoraError, SicoraResult};
use sicora_core::models::user::{NewUser, User};
use sicora_core::repository::UserRepository;
use sicora_core::validation;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::MfaConfig;
use crate::password;

/// Input for registering a user with a password.
#[derive(Debug, Clone)]
pub struct RegisterUserInput {
    pub user: NewUser,
    pub password: String,
}

/// Registration, credential checks and legal consent.
pub struct UserService<U: UserRepository> {
    user_repo: U,
    config: MfaConfig,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(user_repo: U, config: MfaConfig) -> Self {
        Self { user_repo, config }
    }

    /// Validate, check uniqueness, hash the password and store the user.
    pub async fn register(&self, input: RegisterUserInput) -> SicoraResult<User> {
        // 1. Field and password validation.
        validation::validate_password(&input.password)?;
        let mut user = User::new(input.user)?;
        user.email = validation::normalize_email(&user.email);
        user.document_number = user.document_number.trim().to_string();

        // 2. Uniqueness. The repository enforces it again on write.
        if self.user_repo.exists_by_email(&user.email).await? {
            return Err(SicoraError::DuplicateUser {
                field: "email".into(),
                value: user.email,
            });
        }
        if self
            .user_repo
            .exists_by_document_number(&user.document_number)
            .await?
        {
            return Err(SicoraError::DuplicateUser {
                field: "document_number".into(),
                value: user.document_number,
            });
        }

        // 3. Hash and persist.
        user.password_hash = Some(password::hash_password(
            &input.password,
            self.config.pepper.as_deref(),
            self.config.hash_cost,
        )?);
        let user = self.user_repo.create(user).await?;

        info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Check an email and password pair. Unknown emails and wrong
    /// passwords fail identically.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> SicoraResult<User> {
        let invalid = || SicoraError::AuthenticationFailed {
            reason: "invalid credentials".into(),
        };

        let user = match self.user_repo.get_by_email(email).await {
            Ok(user) => user,
            Err(SicoraError::NotFound { .. }) => return Err(invalid()),
            Err(e) => return Err(e),
        };
        let Some(hash) = user.password_hash.as_deref() else {
            return Err(invalid());
        };
        if !password::verify_password(password, hash, self.config.pepper.as_deref())? {
            warn!(user_id = %user.id, "Password verification failed");
            return Err(invalid());
        }
        Ok(user)
    }

    /// Record acceptance of the currently published legal documents.
    pub async fn accept_legal_policies(&self, user_id: Uuid, ip_address: &str) -> SicoraResult<User> {
        let mut user = self.user_repo.get_by_id(user_id).await?;
        user.accept_legal_policies(self.config.policy_versions.clone(), ip_address);
        let user = self.user_repo.update(user).await?;
        info!(%user_id, "Legal policies accepted");
        Ok(user)
    }

    /// Whether the user must (re)accept the published legal documents.
    pub async fn needs_policy_update(&self, user_id: Uuid) -> SicoraResult<bool> {
        let user = self.user_repo.get_by_id(user_id).await?;
        Ok(user.needs_policy_update(&self.config.policy_versions))
    }

    pub async fn set_active(&self, user_id: Uuid, active: bool) -> SicoraResult<User> {
        let mut user = self.user_repo.get_by_id(user_id).await?;
        if active {
            user.activate();
        } else {
            user.deactivate();
        }
        let user = self.user_repo.update(user).await?;
        info!(%user_id, active, "User activation changed");
        Ok(user)
    }

    pub async fn verify_email(&self, user_id: Uuid) -> SicoraResult<User> {
        let mut user = self.user_repo.get_by_id(user_id).await?;
        user.verify_email();
        Ok(self.user_repo.update(user).await?)
    }

    pub async fn assign_ficha(&self, user_id: Uuid, ficha_id: Option<String>) -> SicoraResult<User> {
        let mut user = self.user_repo.get_by_id(user_id).await?;
        user.assign_ficha(ficha_id)?;
        Ok(self.user_repo.update(user).await?)
    }
}
