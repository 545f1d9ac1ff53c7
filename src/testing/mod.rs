//! Test support for code driving the migrate tool.
//!
//! Each backend implements [`TestDatabase`]: it provisions an isolated
//! database, hands back the connection string migrate should use, and can
//! seed the version-tracking table directly to simulate states such as a
//! dirty database. [`MigrationFixture`] writes migration files.

mod fixture;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use fixture::MigrationFixture;
#[cfg(feature = "postgres")]
pub use postgres::PostgresTestDatabase;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTestDatabase;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestDatabaseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    PostgresError(#[from] ::postgres::Error),

    #[error("Background task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Database has not been set up")]
    NotSetUp,

    #[error("Version {0} does not fit the tracking table")]
    InvalidVersion(u64),
}

/// A database provisioned for one test.
#[async_trait]
pub trait TestDatabase: Send + Sync {
    /// Provision the database and return its connection string.
    async fn setup_database(&mut self) -> Result<String, TestDatabaseError>;

    /// Release everything `setup_database` created.
    async fn cleanup_database(&mut self) -> Result<(), TestDatabaseError>;

    /// Create the version-tracking table the way migrate lays it out.
    async fn create_tracking_table(&self) -> Result<(), TestDatabaseError>;

    /// Replace the recorded version, creating the table if needed.
    async fn set_version(&self, version: u64, dirty: bool) -> Result<(), TestDatabaseError>;
}

/// Tracking tables store versions as signed 64-bit integers.
#[cfg(any(feature = "sqlite", feature = "postgres"))]
fn stored_version(version: u64) -> Result<i64, TestDatabaseError> {
    i64::try_from(version).map_err(|_| TestDatabaseError::InvalidVersion(version))
}
