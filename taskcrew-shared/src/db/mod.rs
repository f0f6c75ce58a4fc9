/// Database access layer
///
/// This module provides the PostgreSQL connection pool used by every model.
/// Schema management (migrations) is applied out of band; the expected table
/// shapes are documented on the individual models.

pub mod pool;

pub use pool::{close_pool, create_pool, health_check, DatabaseConfig};
