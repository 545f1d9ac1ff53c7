pub mod config;
pub mod migration;
pub mod testing;
pub mod utils;

// Re-export commonly used types
pub use config::{ConfigError, MigrateConfig};
pub use migration::{
    CommandOutput, CommandRunner, CreateMigrationOptions, DatabaseInfo, MigrateCommand,
    MigrateError, MigrateWrapper, Migration, MigrationResult, MigrationScanner, MissingDownFile,
    ProcessRunner, ValidationResult,
};
pub use testing::{MigrationFixture, TestDatabase, TestDatabaseError};
