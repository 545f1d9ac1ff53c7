//! Programmatic control of the golang-migrate CLI.
//!
//! # Overview
//!
//! - `MigrationScanner` discovers `<version>_<name>.<up|down>.sql` files and
//!   reports gaps in the version sequence
//! - `MigrateCommand` resolves the binary, builds command lines and runs
//!   them through a `CommandRunner`
//! - `MigrateWrapper` composes both into the migration operations and turns
//!   the tool's text output into structured results
//!
//! A dirty database is raised as `MigrateError::Dirty` from `up`, `down` and
//! `goto`; every other tool failure comes back as a `MigrationResult` with
//! `success: false`.
//!
//! # Usage
//!
//! ```ignore
//! let config = MigrateConfig::new("sqlite://app.db", "migrations");
//! let wrapper = MigrateWrapper::new(config)?;
//! let result = wrapper.up(None).await?;
//! ```

mod command;
mod scanner;
mod types;
mod wrapper;

pub use command::{
    parse_error, resolve_binary, CommandOutput, CommandRunner, MigrateCommand, ProcessRunner,
    SPAWN_FAILURE_EXIT_CODE,
};
pub use scanner::{find_gaps, MigrationScanner};
pub use types::{
    DatabaseInfo, MigrateError, Migration, MigrationResult, MissingDownFile, ValidationResult,
};
pub use wrapper::{parse_status, CreateMigrationOptions, MigrateWrapper};
