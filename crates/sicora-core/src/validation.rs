//! Field-level validation rules for user data.
//!
//! Every validator is pure: it trims its input where the rule calls for it
//! and reports the first violated rule. Lengths are counted in characters,
//! not bytes, so accented names are measured the way users type them.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::models::role::UserRole;

const NAME_MIN_LEN: usize = 2;
const NAME_MAX_LEN: usize = 100;
const EMAIL_MAX_LEN: usize = 100;
const DOCUMENT_MIN_LEN: usize = 7;
const DOCUMENT_MAX_LEN: usize = 20;
const PASSWORD_MIN_LEN: usize = 10;
const PASSWORD_MAX_LEN: usize = 128;

/// Special characters accepted by the password policy.
pub const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*";

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-ZáéíóúÁÉÍÓÚñÑ\s]+$").expect("valid name regex"));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$").expect("valid email regex")
});
static DOCUMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-]+$").expect("valid document regex"));
static FICHA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{7}$").expect("valid ficha regex"));

/// The user field a validation rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    FirstName,
    LastName,
    Email,
    DocumentNumber,
    Role,
    FichaId,
    Password,
}

impl Field {
    /// Machine-readable field name, as used in bulk operation reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::DocumentNumber => "document_number",
            Self::Role => "role",
            Self::FichaId => "ficha_id",
            Self::Password => "password",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FirstName => "first name",
            Self::LastName => "last name",
            Self::Email => "email",
            Self::DocumentNumber => "document number",
            Self::Role => "role",
            Self::FichaId => "ficha id",
            Self::Password => "password",
        };
        f.write_str(label)
    }
}

/// Character classes the password policy requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Lowercase,
    Uppercase,
    Digit,
    Special,
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lowercase => f.write_str("lowercase letter"),
            Self::Uppercase => f.write_str("uppercase letter"),
            Self::Digit => f.write_str("digit"),
            Self::Special => write!(f, "special character ({PASSWORD_SPECIAL_CHARS})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: Field },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: Field, min: usize },

    #[error("{field} must not exceed {max} characters")]
    TooLong { field: Field, max: usize },

    #[error("{field} may only contain {allowed}")]
    InvalidCharacters { field: Field, allowed: &'static str },

    #[error("{field} must be {expected}")]
    InvalidFormat { field: Field, expected: &'static str },

    #[error("password must contain at least one {0}")]
    PasswordMissing(CharClass),

    #[error(
        "role '{0}' is not valid: must be aprendiz, instructor, admin, coordinador or directivo"
    )]
    InvalidRole(String),
}

impl ValidationError {
    /// The field whose rule was violated.
    pub fn field(&self) -> Field {
        match self {
            Self::Empty { field }
            | Self::TooShort { field, .. }
            | Self::TooLong { field, .. }
            | Self::InvalidCharacters { field, .. }
            | Self::InvalidFormat { field, .. } => *field,
            Self::PasswordMissing(_) => Field::Password,
            Self::InvalidRole(_) => Field::Role,
        }
    }
}

fn check_length(field: Field, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::TooShort { field, min });
    }
    if len > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

fn validate_person_name(field: Field, raw: &str) -> Result<(), ValidationError> {
    let name = raw.trim();
    check_length(field, name, NAME_MIN_LEN, NAME_MAX_LEN)?;
    if !NAME_RE.is_match(name) {
        return Err(ValidationError::InvalidCharacters {
            field,
            allowed: "letters, spaces and accents",
        });
    }
    Ok(())
}

pub fn validate_first_name(first_name: &str) -> Result<(), ValidationError> {
    validate_person_name(Field::FirstName, first_name)
}

pub fn validate_last_name(last_name: &str) -> Result<(), ValidationError> {
    validate_person_name(Field::LastName, last_name)
}

/// Trim and lower-case an email address the way the email rule sees it.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ValidationError::Empty {
            field: Field::Email,
        });
    }
    if email.chars().count() > EMAIL_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: Field::Email,
            max: EMAIL_MAX_LEN,
        });
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(ValidationError::InvalidFormat {
            field: Field::Email,
            expected: "a valid address (local@domain.tld)",
        });
    }
    Ok(())
}

pub fn validate_document_number(document_number: &str) -> Result<(), ValidationError> {
    let document = document_number.trim();
    check_length(
        Field::DocumentNumber,
        document,
        DOCUMENT_MIN_LEN,
        DOCUMENT_MAX_LEN,
    )?;
    if !DOCUMENT_RE.is_match(document) {
        return Err(ValidationError::InvalidCharacters {
            field: Field::DocumentNumber,
            allowed: "letters, digits and hyphens",
        });
    }
    Ok(())
}

/// Parse a raw role name into the closed [`UserRole`] set.
pub fn validate_role(role: &str) -> Result<UserRole, ValidationError> {
    role.parse()
}

/// Ficha (learner cohort) identifiers are exactly seven digits.
pub fn validate_ficha_id(ficha_id: &str) -> Result<(), ValidationError> {
    if ficha_id.is_empty() {
        return Err(ValidationError::Empty {
            field: Field::FichaId,
        });
    }
    if !FICHA_RE.is_match(ficha_id) {
        return Err(ValidationError::InvalidFormat {
            field: Field::FichaId,
            expected: "a 7-digit number",
        });
    }
    Ok(())
}

/// Enforce the password policy: 10–128 characters with at least one
/// lowercase letter, uppercase letter, digit and special character,
/// reported in that order.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    check_length(
        Field::Password,
        password,
        PASSWORD_MIN_LEN,
        PASSWORD_MAX_LEN,
    )?;

    let checks: [(CharClass, fn(char) -> bool); 4] = [
        (CharClass::Lowercase, |c| c.is_ascii_lowercase()),
        (CharClass::Uppercase, |c| c.is_ascii_uppercase()),
        (CharClass::Digit, |c| c.is_ascii_digit()),
        (CharClass::Special, |c| PASSWORD_SPECIAL_CHARS.contains(c)),
    ];
    for (class, matches) in checks {
        if !password.chars().any(matches) {
            return Err(ValidationError::PasswordMissing(class));
        }
    }
    Ok(())
}

/// Validate the identity fields of a user, stopping at the first failure
/// in the order first name, last name, email, document, role.
pub fn validate_user_data(
    first_name: &str,
    last_name: &str,
    email: &str,
    document_number: &str,
    role: &str,
) -> Result<UserRole, ValidationError> {
    validate_first_name(first_name)?;
    validate_last_name(last_name)?;
    validate_email(email)?;
    validate_document_number(document_number)?;
    validate_role(role)
}
