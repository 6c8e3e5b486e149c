//! Database module for PostgreSQL connection and operations
//!
//! Read-only query execution and information-schema introspection against
//! the analytics database.

pub mod connection;
pub mod executor;
pub mod schema;

pub use connection::{init_pool, DbPool};
pub use executor::PgExecutor;
pub use schema::PgSchemaProvider;
