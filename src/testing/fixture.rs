use crate::migration::Migration;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Writes migration files into a directory.
#[derive(Debug, Clone)]
pub struct MigrationFixture {
    migrations_path: PathBuf,
}

impl MigrationFixture {
    pub fn new(migrations_path: impl AsRef<Path>) -> Self {
        Self {
            migrations_path: migrations_path.as_ref().to_path_buf(),
        }
    }

    pub fn migrations_path(&self) -> &Path {
        &self.migrations_path
    }

    /// Write `NNNNNN_<name>.up.sql` and the matching down file.
    pub async fn add(
        &self,
        version: u64,
        name: &str,
        up_sql: &str,
        down_sql: &str,
    ) -> Result<Migration, std::io::Error> {
        let mut migration = self.add_up_only(version, name, up_sql).await?;
        let down_file = self.file_path(version, name, "down");
        fs::write(&down_file, down_sql).await?;
        migration.down_file = Some(down_file);
        Ok(migration)
    }

    /// Write only the up file.
    pub async fn add_up_only(
        &self,
        version: u64,
        name: &str,
        up_sql: &str,
    ) -> Result<Migration, std::io::Error> {
        let up_file = self.file_path(version, name, "up");
        fs::write(&up_file, up_sql).await?;
        Ok(Migration {
            version,
            name: name.to_string(),
            up_file,
            down_file: None,
            timestamp: None,
        })
    }

    /// Write only the down file.
    pub async fn add_down_only(
        &self,
        version: u64,
        name: &str,
        down_sql: &str,
    ) -> Result<PathBuf, std::io::Error> {
        let down_file = self.file_path(version, name, "down");
        fs::write(&down_file, down_sql).await?;
        Ok(down_file)
    }

    fn file_path(&self, version: u64, name: &str, direction: &str) -> PathBuf {
        self.migrations_path
            .join(format!("{:06}_{}.{}.sql", version, name, direction))
    }
}
