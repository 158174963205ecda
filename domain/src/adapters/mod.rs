//! Adapters that live inside the domain crate for convenience.
//!
//! These back unit tests and the server's `memory` storage mode. Real
//! adapters (sqlx, MongoDB, SQLite) live in separate crates.

pub mod memory_repo;
pub mod memory_sql;
