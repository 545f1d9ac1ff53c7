#![allow(dead_code)]

use async_trait::async_trait;
use migrate_wrapper::{
    CommandOutput, CommandRunner, MigrateConfig, MigrateWrapper, MigrationFixture,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Route library logs to the test output; `RUST_LOG=debug` shows command lines.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Should create temp dir")
}

pub fn ok(stdout: &str) -> CommandOutput {
    output(0, stdout, "")
}

pub fn fail(stderr: &str) -> CommandOutput {
    output(1, "", stderr)
}

pub fn output(exit_code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

/// Write an executable shell script.
pub fn write_script(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).expect("Should write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .expect("Should make script executable");
    }
}

/// Records every command line and answers from a script of outputs.
///
/// Outputs are handed out in order; the last one repeats once the list runs
/// out, so a single output answers every call.
pub struct RecordingRunner {
    responses: Mutex<Vec<CommandOutput>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingRunner {
    pub fn new(output: CommandOutput) -> Self {
        Self::with_responses(vec![output])
    }

    pub fn with_responses(responses: Vec<CommandOutput>) -> Self {
        assert!(!responses.is_empty(), "RecordingRunner needs a response");
        Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call(&self, index: usize) -> Vec<String> {
        self.calls()[index].clone()
    }

    pub fn last_call(&self) -> Vec<String> {
        self.calls().last().cloned().expect("Should have been called")
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, args: &[String]) -> CommandOutput {
        self.calls.lock().unwrap().push(args.to_vec());
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.remove(0)
        } else {
            responses[0].clone()
        }
    }
}

pub fn has_arg(args: &[String], arg: &str) -> bool {
    args.iter().any(|a| a == arg)
}

/// A wrapper over a temp migrations directory and a stand-in binary.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub migrations_dir: PathBuf,
    pub binary: PathBuf,
    pub database_url: String,
    pub fixture: MigrationFixture,
    pub runner: Arc<RecordingRunner>,
    pub wrapper: MigrateWrapper,
}

impl TestEnv {
    pub fn new(runner: RecordingRunner) -> Self {
        Self::with_database_url("sqlite://test.db", runner)
    }

    pub fn with_database_url(database_url: &str, runner: RecordingRunner) -> Self {
        init_tracing();
        let temp_dir = create_test_dir();
        let migrations_dir = temp_dir.path().join("migrations");
        std::fs::create_dir(&migrations_dir).expect("Should create migrations dir");

        // Only needs to resolve; the runner never executes it
        let bin_dir = temp_dir.path().join("bin");
        std::fs::create_dir(&bin_dir).expect("Should create bin dir");
        let binary = bin_dir.join("migrate");
        write_script(&binary, "exit 0");

        let config = MigrateConfig::new(database_url, &migrations_dir)
            .with_command_path(binary.to_string_lossy());
        let runner = Arc::new(runner);
        let wrapper = MigrateWrapper::with_runner(config, runner.clone())
            .expect("Should create wrapper");

        Self {
            fixture: MigrationFixture::new(&migrations_dir),
            temp_dir,
            migrations_dir,
            binary,
            database_url: database_url.to_string(),
            runner,
            wrapper,
        }
    }
}
