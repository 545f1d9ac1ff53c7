//! Execution of the external migrate binary.

use super::types::MigrateError;
use crate::config::MigrateConfig;
use crate::utils::{contains_ignore_case, redact_database_url};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, error};

/// Exit code reported when the process could not be spawned or was killed.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

/// Captured outcome of one migrate invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a command line and captures its output.
///
/// Implementations never fail: anything that goes wrong is reported as a
/// non-zero exit code, and interpreting it is left to the caller.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `args[0]` with the remaining arguments.
    async fn run(&self, args: &[String]) -> CommandOutput;
}

/// Spawns real processes with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, args: &[String]) -> CommandOutput {
        let Some((program, rest)) = args.split_first() else {
            return CommandOutput {
                exit_code: SPAWN_FAILURE_EXIT_CODE,
                stdout: String::new(),
                stderr: "empty command line".to_string(),
            };
        };

        let output = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => CommandOutput {
                exit_code: output.status.code().unwrap_or(SPAWN_FAILURE_EXIT_CODE),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(e) => {
                error!(program = %program, error = %e, "Failed to spawn migrate");
                CommandOutput {
                    exit_code: SPAWN_FAILURE_EXIT_CODE,
                    stdout: String::new(),
                    stderr: e.to_string(),
                }
            }
        }
    }
}

/// Locate the binary the way a shell would.
///
/// A bare name is searched along `PATH`; anything with a directory part is
/// checked as given.
pub fn resolve_binary(command_path: &str) -> Option<PathBuf> {
    if command_path.is_empty() {
        return None;
    }

    let candidate = Path::new(command_path);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let search_path = std::env::var_os("PATH")?;
    std::env::split_paths(&search_path).find_map(|dir| {
        let full = dir.join(command_path);
        if is_executable(&full) {
            return Some(full);
        }
        if cfg!(windows) {
            let exe = full.with_extension("exe");
            if is_executable(&exe) {
                return Some(exe);
            }
        }
        None
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Classify stderr text into a short message.
///
/// Checked in priority order, first match wins. Unrecognised text is
/// returned trimmed, empty text yields `None`.
pub fn parse_error(stderr: &str) -> Option<String> {
    const KNOWN_ERRORS: [(&str, &str); 5] = [
        ("dirty database", "Database is in dirty state"),
        ("no migration", "No migrations found"),
        ("already at the latest", "Already at latest version"),
        ("file does not exist", "Migration file not found"),
        ("connection refused", "Database connection failed"),
    ];

    if let Some((_, message)) = KNOWN_ERRORS
        .iter()
        .find(|(needle, _)| contains_ignore_case(stderr, needle))
    {
        return Some(message.to_string());
    }

    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Builds and runs migrate command lines for one configuration.
pub struct MigrateCommand {
    config: MigrateConfig,
    binary: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl MigrateCommand {
    /// Create a command that spawns real processes.
    pub fn new(config: MigrateConfig) -> Result<Self, MigrateError> {
        Self::with_runner(config, Arc::new(ProcessRunner))
    }

    /// Create a command that executes through the given runner.
    ///
    /// The binary must still resolve, so a missing tool is reported here
    /// rather than on the first operation.
    pub fn with_runner(
        config: MigrateConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, MigrateError> {
        let binary = resolve_binary(&config.command_path)
            .ok_or_else(|| MigrateError::NotFound(config.command_path.clone()))?;

        debug!(binary = %binary.display(), "Resolved migrate binary");

        Ok(Self {
            config,
            binary,
            runner,
        })
    }

    pub fn config(&self) -> &MigrateConfig {
        &self.config
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// `<binary> -database <url> -path <dir>`
    pub fn build_base_args(&self) -> Vec<String> {
        vec![
            self.binary.to_string_lossy().into_owned(),
            "-database".to_string(),
            self.config.database_url.clone(),
            "-path".to_string(),
            self.config.migrations_path.to_string_lossy().into_owned(),
        ]
    }

    /// Run the command line and capture its output. Never fails.
    pub async fn execute(&self, args: &[String]) -> CommandOutput {
        let database_url = &self.config.database_url;
        let printable: Vec<String> = args
            .iter()
            .map(|arg| {
                if arg == database_url {
                    redact_database_url(arg)
                } else {
                    arg.clone()
                }
            })
            .collect();
        debug!(args = ?printable, "Running migrate");

        let output = self.runner.run(args).await;

        debug!(exit_code = output.exit_code, "migrate exited");
        output
    }

    /// See [`parse_error`].
    pub fn parse_error(&self, stderr: &str) -> Option<String> {
        parse_error(stderr)
    }
}
