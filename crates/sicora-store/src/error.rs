//! Store-specific error types and conversions.

use sicora_core::error::SicoraError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Unique constraint violated on {field}: {value}")]
    Duplicate { field: &'static str, value: String },

    #[error("Conditional update rejected for {entity} with id {id}")]
    Conflict { entity: &'static str, id: String },
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for SicoraError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => SicoraError::not_found(entity, id),
            StoreError::Duplicate { field, value } => SicoraError::DuplicateUser {
                field: field.into(),
                value,
            },
            StoreError::Conflict { entity, id } => SicoraError::conflict(entity, id),
        }
    }
}
