//! Types for the migration wrapper.

use crate::config::ConfigError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for migrate operations.
///
/// Only conditions that need caller action are raised; routine failures of
/// the external tool come back as a [`MigrationResult`] with `success: false`.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("migrate command not found at: {0}. Please install golang-migrate/migrate first.")]
    NotFound(String),

    #[error("{0}")]
    Dirty(String),

    #[error("Failed to create migration: {0}")]
    CreateFailed(String),

    #[error("Could not find created migration")]
    CreatedMigrationNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MigrateError {
    /// Whether this error signals a dirty database that needs `force`.
    pub fn is_dirty(&self) -> bool {
        matches!(self, MigrateError::Dirty(_))
    }
}

/// A migration discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Migration {
    pub version: u64,
    pub name: String,
    pub up_file: PathBuf,
    pub down_file: Option<PathBuf>,
    /// Raw timestamp for timestamp-numbered migrations.
    pub timestamp: Option<u64>,
}

impl Migration {
    /// The `<version>_<name>` part shared by the up and down file names.
    pub fn filename_prefix(&self) -> String {
        match self.timestamp {
            Some(timestamp) if timestamp != 0 => format!("{}_{}", timestamp, self.name),
            _ => format!("{:06}_{}", self.version, self.name),
        }
    }

    /// Check if the up migration file exists.
    pub fn has_up_file(&self) -> bool {
        self.up_file.exists()
    }

    /// Check if the down migration file exists.
    pub fn has_down_file(&self) -> bool {
        self.down_file.as_ref().is_some_and(|path| path.exists())
    }
}

/// Result of a mutating migrate operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Version after the operation, if any.
    pub version: Option<u64>,
    /// Human-readable outcome.
    pub message: String,
    /// Raw error text captured from the tool, if it failed.
    pub error: Option<String>,
    /// Whether the tool reported a dirty database.
    pub dirty: bool,
}

/// Current database migration state as reported by migrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    pub version: Option<u64>,
    pub dirty: bool,
}

impl DatabaseInfo {
    pub fn is_clean(&self) -> bool {
        !self.dirty
    }
}

/// A migration missing its down file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingDownFile {
    pub version: u64,
    pub name: String,
}

/// Result of validating the migrations directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub total_migrations: usize,
    /// Versions missing from the sequence, ascending.
    pub gaps: Vec<u64>,
    pub missing_down_files: Vec<MissingDownFile>,
}

impl ValidationResult {
    pub fn has_gaps(&self) -> bool {
        !self.gaps.is_empty()
    }

    pub fn has_missing_down_files(&self) -> bool {
        !self.missing_down_files.is_empty()
    }
}
