//! File-based SQLite backend.

use super::{stored_version, TestDatabase, TestDatabaseError};
use crate::utils::DEFAULT_TABLE_NAME;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// A SQLite database file inside its own temporary directory.
///
/// migrate does not cope with in-memory SQLite, so every fixture gets a
/// real file that lives until `cleanup_database`.
pub struct SqliteTestDatabase {
    table_name: String,
    temp_dir: Option<TempDir>,
}

impl SqliteTestDatabase {
    pub fn new() -> Self {
        Self::with_table_name(DEFAULT_TABLE_NAME)
    }

    pub fn with_table_name(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            temp_dir: None,
        }
    }

    /// Path of the database file once set up.
    pub fn db_path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|dir| dir.path().join("test.db"))
    }

    /// Read the recorded `(version, dirty)` row, if any.
    pub async fn read_version(&self) -> Result<Option<(u64, bool)>, TestDatabaseError> {
        let table = self.table_name.clone();
        self.with_connection(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT version, dirty FROM \"{}\" LIMIT 1", table),
                    [],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, bool>(1)?)),
                )
                .optional()?;
            Ok(row.map(|(version, dirty)| (version as u64, dirty)))
        })
        .await
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T, TestDatabaseError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, TestDatabaseError> + Send + 'static,
    {
        let path = self.db_path().ok_or(TestDatabaseError::NotSetUp)?;
        tokio::task::spawn_blocking(move || {
            let mut conn = Connection::open(&path)?;
            f(&mut conn)
        })
        .await?
    }
}

impl Default for SqliteTestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" (
            version INTEGER PRIMARY KEY,
            dirty INTEGER NOT NULL DEFAULT 0
        )",
        table
    )
}

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

#[async_trait]
impl TestDatabase for SqliteTestDatabase {
    async fn setup_database(&mut self) -> Result<String, TestDatabaseError> {
        let temp_dir = tempfile::Builder::new().prefix("migrate-sqlite-").tempdir()?;
        self.temp_dir = Some(temp_dir);

        let path = self.db_path().ok_or(TestDatabaseError::NotSetUp)?;
        debug!(path = %path.display(), "Provisioned SQLite test database");
        Ok(sqlite_url(&path))
    }

    async fn cleanup_database(&mut self) -> Result<(), TestDatabaseError> {
        if let Some(temp_dir) = self.temp_dir.take() {
            temp_dir.close()?;
        }
        Ok(())
    }

    async fn create_tracking_table(&self) -> Result<(), TestDatabaseError> {
        let sql = create_table_sql(&self.table_name);
        self.with_connection(move |conn| {
            conn.execute(&sql, [])?;
            Ok(())
        })
        .await
    }

    async fn set_version(&self, version: u64, dirty: bool) -> Result<(), TestDatabaseError> {
        let version = stored_version(version)?;
        let table = self.table_name.clone();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(&create_table_sql(&table), [])?;
            tx.execute(&format!("DELETE FROM \"{}\"", table), [])?;
            tx.execute(
                &format!("INSERT INTO \"{}\" (version, dirty) VALUES (?1, ?2)", table),
                params![version, dirty],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
