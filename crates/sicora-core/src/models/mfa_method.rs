//! MFA method domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MfaMethodType {
    #[serde(rename = "totp")]
    Totp,
    #[serde(rename = "email_otp")]
    EmailOtp,
    #[serde(rename = "sms")]
    Sms,
    #[serde(rename = "webauthn")]
    WebAuthn,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown MFA method type '{0}': must be totp, email_otp, sms or webauthn")]
pub struct UnknownMethodType(pub String);

impl MfaMethodType {
    pub const ALL: [MfaMethodType; 4] = [Self::Totp, Self::EmailOtp, Self::Sms, Self::WebAuthn];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Totp => "totp",
            Self::EmailOtp => "email_otp",
            Self::Sms => "sms",
            Self::WebAuthn => "webauthn",
        }
    }

    /// Methods whose challenge is a server-generated code delivered out of
    /// band and stored hashed on the session.
    pub fn uses_delivered_code(self) -> bool {
        matches!(self, Self::EmailOtp | Self::Sms)
    }
}

impl fmt::Display for MfaMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MfaMethodType {
    type Err = UnknownMethodType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| UnknownMethodType(s.to_string()))
    }
}

/// A second factor configured for a user.
///
/// `secret_encrypted` and `webauthn_data` are persisted but never leave the
/// service in serialized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfaMethod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub method_type: MfaMethodType,
    pub is_primary: bool,
    pub is_enabled: bool,
    /// AES-256-GCM encrypted TOTP secret.
    #[serde(skip)]
    pub secret_encrypted: Option<String>,
    pub phone_number: Option<String>,
    pub email_address: Option<String>,
    /// Stored WebAuthn credential (public key and metadata).
    #[serde(skip)]
    pub webauthn_data: Option<String>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Type-specific material supplied when a method is registered.
#[derive(Debug, Clone)]
pub enum MethodCredential {
    Totp { secret_encrypted: String },
    EmailOtp { email_address: String },
    Sms { phone_number: String },
    WebAuthn { credential: String },
}

impl MethodCredential {
    pub fn method_type(&self) -> MfaMethodType {
        match self {
            Self::Totp { .. } => MfaMethodType::Totp,
            Self::EmailOtp { .. } => MfaMethodType::EmailOtp,
            Self::Sms { .. } => MfaMethodType::Sms,
            Self::WebAuthn { .. } => MfaMethodType::WebAuthn,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateMfaMethod {
    pub user_id: Uuid,
    pub is_primary: bool,
    pub credential: MethodCredential,
}

impl MfaMethod {
    /// Build the stored form of a new, enabled method.
    pub fn from_create(input: CreateMfaMethod, now: DateTime<Utc>) -> Self {
        let method_type = input.credential.method_type();
        let mut method = Self {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            method_type,
            is_primary: input.is_primary,
            is_enabled: true,
            secret_encrypted: None,
            phone_number: None,
            email_address: None,
            webauthn_data: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };
        match input.credential {
            MethodCredential::Totp { secret_encrypted } => {
                method.secret_encrypted = Some(secret_encrypted)
            }
            MethodCredential::EmailOtp { email_address } => {
                method.email_address = Some(email_address)
            }
            MethodCredential::Sms { phone_number } => method.phone_number = Some(phone_number),
            MethodCredential::WebAuthn { credential } => method.webauthn_data = Some(credential),
        }
        method
    }
}
