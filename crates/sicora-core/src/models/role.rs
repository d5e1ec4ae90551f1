//! User role domain model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// The closed set of platform roles. Persisted and serialized using the
/// platform's role names (`aprendiz`, `coordinador`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UserRole {
    #[serde(rename = "aprendiz")]
    Learner,
    #[serde(rename = "instructor")]
    Instructor,
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "coordinador")]
    Coordinator,
    #[serde(rename = "directivo")]
    Director,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        Self::Learner,
        Self::Instructor,
        Self::Admin,
        Self::Coordinator,
        Self::Director,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Learner => "aprendiz",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
            Self::Coordinator => "coordinador",
            Self::Director => "directivo",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidRole(s.to_string()))
    }
}
