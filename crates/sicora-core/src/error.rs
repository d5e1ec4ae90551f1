//! Error types for the SICORA user domain.

use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum SicoraError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate user: {field} '{value}' is already registered")]
    DuplicateUser { field: String, value: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("No MFA enforcement policy configured for role '{role}'")]
    PolicyNotFound { role: String },

    /// A conditional update lost against a concurrent writer.
    #[error("Concurrent modification of {entity} with id {id}")]
    Conflict { entity: String, id: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SicoraError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(entity: &str, id: impl ToString) -> Self {
        Self::Conflict {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

pub type SicoraResult<T> = Result<T, SicoraError>;
