//! SICORA Store — in-memory implementations of the `sicora-core`
//! repository contracts.
//!
//! This crate provides:
//! - A shared table set ([`MemoryDb`]) guarded by a single async lock
//! - One repository type per contract, all built from a cloned [`MemoryDb`]
//! - Error types ([`StoreError`])
//!
//! Every conditional update runs under the write lock, which gives the
//! compare-and-swap semantics the contracts require.

mod db;
mod error;
pub mod repository;

pub use db::MemoryDb;
pub use error::StoreError;
