use crate::utils::{DEFAULT_COMMAND, DEFAULT_TABLE_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Database URL is required")]
    MissingDatabaseUrl,

    #[error("Migrations path does not exist: {}", .0.display())]
    MigrationsPathNotFound(PathBuf),
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_command_path() -> String {
    DEFAULT_COMMAND.to_string()
}

/// Configuration for the migrate command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateConfig {
    /// Connection string handed to `-database` unmodified
    pub database_url: String,
    /// Directory holding the migration files, handed to `-path`
    pub migrations_path: PathBuf,
    /// Name of the version-tracking table
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// Binary name (looked up on PATH) or explicit path to the binary
    #[serde(default = "default_command_path")]
    pub command_path: String,
}

impl MigrateConfig {
    pub fn new(database_url: impl Into<String>, migrations_path: impl AsRef<Path>) -> Self {
        Self {
            database_url: database_url.into(),
            migrations_path: migrations_path.as_ref().to_path_buf(),
            table_name: default_table_name(),
            command_path: default_command_path(),
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_command_path(mut self, command_path: impl Into<String>) -> Self {
        self.command_path = command_path.into();
        self
    }

    /// Check that the URL is set and the migrations directory exists
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if !self.migrations_path.exists() {
            return Err(ConfigError::MigrationsPathNotFound(
                self.migrations_path.clone(),
            ));
        }
        Ok(())
    }
}
