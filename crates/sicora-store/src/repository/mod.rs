//! In-memory repository implementations.

pub mod backup_code;
pub mod mfa_method;
pub mod mfa_session;
pub mod policy;
pub mod user;

pub use backup_code::MemoryBackupCodeRepository;
pub use mfa_method::MemoryMfaMethodRepository;
pub use mfa_session::MemoryMfaSessionRepository;
pub use policy::MemoryPolicyRepository;
pub use user::MemoryUserRepository;
