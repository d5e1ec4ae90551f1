//! Domain models for SICORA user management and MFA.

pub mod backup_code;
pub mod enforcement_policy;
pub mod mfa_method;
pub mod mfa_session;
pub mod role;
pub mod user;
