//! PostgreSQL backend for pgdb-operator.
//!
//! Provides [`PostgresServer`], which converges databases, login roles and
//! grants on a PostgreSQL server through an administrative connection pool.
//!
//! # Example
//!
//! ```ignore
//! use pgdb_core::DatabaseStateReconciler;
//! use pgdb_postgres::{PostgresConfig, PostgresServer};
//!
//! let server = PostgresServer::connect(&PostgresConfig::new("postgres://admin:pw@localhost/postgres"))?;
//! server.ensure_database("orders").await?;
//! ```

mod config;
mod error;
mod pool;
mod server;

pub use config::{CONNECTION_STRING_VAR, PostgresConfig};
pub use error::{
    PG_DUPLICATE_DATABASE, PG_DUPLICATE_OBJECT, PG_INSUFFICIENT_PRIVILEGE, PG_UNIQUE_VIOLATION,
    PostgresError, Result, classify, has_pg_error_code, tenant_error,
};
pub use pool::{PgPoolOptions, create_pool, mask_password, test_connection};
pub use server::PostgresServer;

// Re-export for callers that hold the pool directly
pub use sqlx_postgres::PgPool;
