//! # Taskcrew Shared Library
//!
//! This crate contains the types, persistence layer, and business logic shared
//! by the Taskcrew API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their CRUD operations
//! - `auth`: Password hashing, JWT issuance, the authorization guard, and
//!   the Axum authentication middleware
//! - `db`: PostgreSQL connection pool management
//! - `realtime`: In-process per-team broadcast channels for live task events

pub mod auth;
pub mod db;
pub mod models;
pub mod realtime;

/// Current version of the Taskcrew shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
