//! MFA error types.

use sicora_core::error::SicoraError;
use sicora_core::models::mfa_method::MfaMethodType;
use sicora_core::models::role::UserRole;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("MFA session has expired")]
    SessionExpired,

    #[error("invalid MFA code, {remaining_attempts} attempt(s) remaining")]
    InvalidCode { remaining_attempts: u32 },

    #[error("maximum MFA attempts exceeded")]
    AttemptsExceeded,

    #[error("MFA session is already verified")]
    SessionAlreadyVerified,

    #[error("invalid backup code")]
    BackupCodeInvalid,

    #[error("backup code has already been used")]
    BackupCodeAlreadyUsed,

    #[error("backup code has expired")]
    BackupCodeExpired,

    #[error("MFA method '{method}' is not allowed for role '{role}'")]
    MethodNotAllowed {
        method: MfaMethodType,
        role: UserRole,
    },

    #[error("MFA method '{method}' is not registered for this user")]
    MethodNotRegistered { method: MfaMethodType },

    #[error("MFA method is disabled")]
    MethodDisabled,

    #[error("no MFA methods are registered for this user")]
    NoMethodsRegistered,

    #[error("access denied: {reason}")]
    AccessDenied { reason: String },

    #[error("MFA is not configured: {0}")]
    MfaNotConfigured(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error(transparent)]
    Core(#[from] SicoraError),
}

impl From<AuthError> for SicoraError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Core(inner) => inner,
            AuthError::Crypto(msg) => SicoraError::Crypto(msg),
            AuthError::MfaNotConfigured(msg) => SicoraError::Internal(msg),
            other => SicoraError::AuthenticationFailed {
                reason: other.to_string(),
            },
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
