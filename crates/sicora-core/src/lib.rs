//! SICORA Core — user domain model, MFA entities, field validation
//! and repository contracts shared by every other crate.

pub mod error;
pub mod models;
pub mod repository;
pub mod validation;
