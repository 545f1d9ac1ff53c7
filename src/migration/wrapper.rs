//! The public facade over the migrate CLI.

use super::command::{CommandOutput, CommandRunner, MigrateCommand, ProcessRunner};
use super::scanner::MigrationScanner;
use super::types::{
    DatabaseInfo, MigrateError, Migration, MigrationResult, MissingDownFile, ValidationResult,
};
use crate::config::MigrateConfig;
use crate::utils::contains_ignore_case;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// First standalone digit run in the `version` report.
static VERSION_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\b").expect("valid regex"));

const DIRTY_STATE_MESSAGE: &str = "Database is in dirty state";

/// Options for creating a migration
#[derive(Debug, Clone)]
pub struct CreateMigrationOptions {
    /// Sequential (`-seq`) numbering instead of timestamps
    pub sequential: bool,
    /// File extension passed to `-ext`
    pub extension: String,
}

impl Default for CreateMigrationOptions {
    fn default() -> Self {
        Self {
            sequential: true,
            extension: "sql".to_string(),
        }
    }
}

/// Wrapper around the golang-migrate CLI.
///
/// Each operation spawns the tool once (plus a `version` query where the
/// result reports the current version) and waits for it to exit. No timeout
/// is applied; wrap calls in `tokio::time::timeout` when latency must be
/// bounded. The child is killed if the future is dropped.
pub struct MigrateWrapper {
    command: MigrateCommand,
    scanner: MigrationScanner,
}

impl MigrateWrapper {
    /// Validate the configuration and locate the migrate binary.
    pub fn new(config: MigrateConfig) -> Result<Self, MigrateError> {
        Self::with_runner(config, Arc::new(ProcessRunner))
    }

    /// Like [`MigrateWrapper::new`], executing through a custom runner.
    pub fn with_runner(
        config: MigrateConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, MigrateError> {
        config.validate()?;
        let scanner = MigrationScanner::new(&config.migrations_path);
        let command = MigrateCommand::with_runner(config, runner)?;
        Ok(Self { command, scanner })
    }

    pub fn config(&self) -> &MigrateConfig {
        self.command.config()
    }

    /// Create a new pair of migration files and return the new migration.
    pub async fn create(
        &self,
        name: &str,
        options: CreateMigrationOptions,
    ) -> Result<Migration, MigrateError> {
        let existing: HashSet<u64> = self.scanner.scan()?.iter().map(|m| m.version).collect();

        let mut args = self.command.build_base_args();
        args.extend(["create".to_string(), "-ext".to_string(), options.extension]);
        if options.sequential {
            args.extend(["-seq".to_string(), name.to_string()]);
        } else {
            args.push(name.to_string());
        }

        let output = self.command.execute(&args).await;
        if !output.success() {
            warn!(name = %name, stderr = %output.stderr.trim(), "Create failed");
            return Err(MigrateError::CreateFailed(output.stderr.trim().to_string()));
        }

        let mut migrations = self.scanner.scan()?;

        if let Some(index) = migrations.iter().position(|m| !existing.contains(&m.version)) {
            let created = migrations.swap_remove(index);
            info!(version = created.version, name = %created.name, "Created migration");
            return Ok(created);
        }

        // Nothing new is visible, report the latest migration
        migrations.pop().ok_or(MigrateError::CreatedMigrationNotFound)
    }

    /// Apply all pending migrations, or the next `steps`.
    pub async fn up(&self, steps: Option<u64>) -> Result<MigrationResult, MigrateError> {
        let mut args = self.command.build_base_args();
        args.push("up".to_string());
        if let Some(steps) = steps {
            args.push(steps.to_string());
        }

        let output = self.command.execute(&args).await;
        if output.success() {
            let version = self.version().await;
            info!(version = ?version, "Migrations applied");
            return Ok(succeeded(version, "Migrations applied successfully"));
        }

        self.failed_migration(&output, "Migration failed").await
    }

    /// Roll back `steps` migrations, or all of them.
    pub async fn down(&self, steps: Option<u64>) -> Result<MigrationResult, MigrateError> {
        let mut args = self.command.build_base_args();
        args.push("down".to_string());
        match steps {
            Some(steps) => args.push(steps.to_string()),
            None => args.push("-all".to_string()),
        }

        let output = self.command.execute(&args).await;
        if output.success() {
            let version = self.version().await;
            info!(version = ?version, "Migrations rolled back");
            return Ok(succeeded(version, "Migrations rolled back successfully"));
        }

        self.failed_migration(&output, "Rollback failed").await
    }

    /// Migrate up or down to `version`.
    pub async fn goto(&self, version: u64) -> Result<MigrationResult, MigrateError> {
        let mut args = self.command.build_base_args();
        args.extend(["goto".to_string(), version.to_string()]);

        let output = self.command.execute(&args).await;
        if output.success() {
            info!(version, "Migrated to version");
            return Ok(succeeded(
                non_zero(version),
                &format!("Migrated to version {}", version),
            ));
        }

        self.failed_migration(&output, "Goto failed").await
    }

    /// Set the recorded version without running migrations, clearing dirty.
    ///
    /// Failures are returned as results, never as [`MigrateError::Dirty`].
    pub async fn force(&self, version: u64) -> Result<MigrationResult, MigrateError> {
        let mut args = self.command.build_base_args();
        args.extend(["force".to_string(), version.to_string()]);

        let output = self.command.execute(&args).await;
        if output.success() {
            info!(version, "Forced version");
            return Ok(succeeded(
                non_zero(version),
                &format!("Forced version to {}", version),
            ));
        }

        Ok(self.failed_result(&output, "Force failed").await)
    }

    /// Drop everything in the database.
    pub async fn drop(&self, force: bool) -> Result<MigrationResult, MigrateError> {
        let mut args = self.command.build_base_args();
        args.push("drop".to_string());
        if force {
            args.push("-f".to_string());
        }

        let output = self.command.execute(&args).await;
        if output.success() {
            info!("Database dropped");
            return Ok(succeeded(None, "Database dropped successfully"));
        }

        Ok(self.failed_result(&output, "Drop failed").await)
    }

    /// Current version, or `None` if there is none or the query failed.
    pub async fn version(&self) -> Option<u64> {
        self.status().await.version
    }

    /// Current version and dirty flag.
    pub async fn status(&self) -> DatabaseInfo {
        let mut args = self.command.build_base_args();
        args.push("version".to_string());

        let output = self.command.execute(&args).await;
        parse_status(&output)
    }

    /// All migrations in the directory, sorted by version.
    pub fn list_migrations(&self) -> Result<Vec<Migration>, MigrateError> {
        Ok(self.scanner.scan()?)
    }

    /// Check the directory for sequence gaps and missing down files.
    pub fn validate_migrations(&self) -> Result<ValidationResult, MigrateError> {
        let migrations = self.list_migrations()?;
        let gaps = self.scanner.find_gaps(&migrations);
        let missing_down_files: Vec<MissingDownFile> = migrations
            .iter()
            .filter(|m| !m.has_down_file())
            .map(|m| MissingDownFile {
                version: m.version,
                name: m.name.clone(),
            })
            .collect();

        Ok(ValidationResult {
            valid: gaps.is_empty() && missing_down_files.is_empty(),
            total_migrations: migrations.len(),
            gaps,
            missing_down_files,
        })
    }

    /// Failure handling shared by `up`, `down` and `goto`.
    async fn failed_migration(
        &self,
        output: &CommandOutput,
        default_message: &str,
    ) -> Result<MigrationResult, MigrateError> {
        if contains_ignore_case(&output.stderr, "dirty") {
            let message = self
                .command
                .parse_error(&output.stderr)
                .unwrap_or_else(|| DIRTY_STATE_MESSAGE.to_string());
            warn!(stderr = %output.stderr.trim(), "Database is dirty");
            return Err(MigrateError::Dirty(message));
        }

        Ok(self.failed_result(output, default_message).await)
    }

    async fn failed_result(&self, output: &CommandOutput, default_message: &str) -> MigrationResult {
        let message = self
            .command
            .parse_error(&output.stderr)
            .unwrap_or_else(|| default_message.to_string());
        warn!(exit_code = output.exit_code, message = %message, "migrate operation failed");

        let stderr = output.stderr.trim();
        MigrationResult {
            success: false,
            version: self.version().await,
            message,
            error: (!stderr.is_empty()).then(|| stderr.to_string()),
            dirty: false,
        }
    }
}

fn succeeded(version: Option<u64>, message: &str) -> MigrationResult {
    MigrationResult {
        success: true,
        version,
        message: message.to_string(),
        error: None,
        dirty: false,
    }
}

fn non_zero(version: u64) -> Option<u64> {
    (version > 0).then_some(version)
}

/// The text migrate reported: stdout, or stderr when stdout is blank.
fn reported_text(output: &CommandOutput) -> &str {
    let stdout = output.stdout.trim();
    if stdout.is_empty() {
        output.stderr.trim()
    } else {
        stdout
    }
}

/// Interpret the output of `migrate version`.
pub fn parse_status(output: &CommandOutput) -> DatabaseInfo {
    if !output.success() {
        return DatabaseInfo::default();
    }

    let text = reported_text(output);
    let version = VERSION_NUMBER
        .captures(text)
        .and_then(|captures| captures[1].parse().ok());

    DatabaseInfo {
        version,
        dirty: contains_ignore_case(text, "dirty"),
    }
}
