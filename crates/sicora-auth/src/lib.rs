//! SICORA Auth — MFA enrollment, enforcement policies, verification
//! sessions, backup codes and user registration.

pub mod backup_codes;
pub mod config;
pub mod error;
pub mod otp;
pub mod password;
pub mod policy;
pub mod registry;
pub mod service;
pub mod session;
pub mod totp;
pub mod users;

pub use config::{HashCost, MfaConfig};
pub use error::AuthError;
pub use policy::{EffectivePolicy, MfaRequirement, PolicyResolver};
pub use registry::MethodRegistry;
pub use service::{
    AssertionVerifier, ChallengeInput, IssuedChallenge, LoginDecision, MfaService, VerifyOutcome,
};
pub use users::{RegisterUserInput, UserService};
