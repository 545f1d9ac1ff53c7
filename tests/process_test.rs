//! Drives the real process runner against a stand-in migrate script.
#![cfg(unix)]

mod common;

use common::{create_test_dir, init_tracing, write_script};
use migrate_wrapper::{CreateMigrationOptions, MigrateConfig, MigrateWrapper};
use std::path::Path;
use tempfile::TempDir;

/// Mimics migrate's command line: `$1..$4` are `-database URL -path DIR`,
/// `$5` the subcommand. Every invocation is appended to `calls.log`.
const FAKE_MIGRATE: &str = r#"
dir="$4"
printf '%s\n' "$*" >> "$(dirname "$0")/calls.log"
state="$(dirname "$0")/state"
case "$5" in
  create)
    ext="$7"
    if [ "$8" = "-seq" ]; then name="$9"; else name="$8"; fi
    n=$(ls "$dir" | grep -c "\.up\.$ext\$")
    v=$(printf '%06d' $((n + 1)))
    : > "$dir/${v}_${name}.up.$ext"
    : > "$dir/${v}_${name}.down.$ext"
    ;;
  up)
    if [ -f "$state.dirty" ]; then
      echo "error: Dirty database version 2. Fix and force version." >&2
      exit 1
    fi
    echo 2 > "$state"
    echo "1/u first" >&2
    echo "2/u second" >&2
    ;;
  force)
    rm -f "$state.dirty"
    echo "$6" > "$state"
    ;;
  version)
    if [ ! -f "$state" ]; then
      echo "error: no migration" >&2
      exit 1
    fi
    if [ -f "$state.dirty" ]; then
      echo "$(cat "$state") (dirty)" >&2
    else
      cat "$state" >&2
    fi
    ;;
  *)
    echo "error: unknown command $5" >&2
    exit 2
    ;;
esac
"#;

struct Harness {
    temp_dir: TempDir,
    wrapper: MigrateWrapper,
}

impl Harness {
    fn new() -> Self {
        init_tracing();
        let temp_dir = create_test_dir();
        let migrations_dir = temp_dir.path().join("migrations");
        let bin_dir = temp_dir.path().join("bin");
        std::fs::create_dir(&migrations_dir).unwrap();
        std::fs::create_dir(&bin_dir).unwrap();

        let binary = bin_dir.join("migrate");
        write_script(&binary, FAKE_MIGRATE);

        let config = MigrateConfig::new("sqlite://test.db", &migrations_dir)
            .with_command_path(binary.to_string_lossy());
        let wrapper = MigrateWrapper::new(config).expect("Should create wrapper");

        Self { temp_dir, wrapper }
    }

    fn bin_dir(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("bin")
    }

    fn mark_dirty(&self) {
        std::fs::write(self.bin_dir().join("state"), "2\n").unwrap();
        std::fs::write(self.bin_dir().join("state.dirty"), "").unwrap();
    }

    fn calls(&self) -> Vec<String> {
        read_lines(&self.bin_dir().join("calls.log"))
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| line.to_string())
        .collect()
}

#[tokio::test]
async fn test_create_writes_sequential_pairs() {
    let harness = Harness::new();

    let first = harness
        .wrapper
        .create("create_users", CreateMigrationOptions::default())
        .await
        .unwrap();
    let second = harness
        .wrapper
        .create("add_email", CreateMigrationOptions::default())
        .await
        .unwrap();

    assert_eq!(first.version, 1);
    assert_eq!(first.name, "create_users");
    assert_eq!(second.version, 2);
    assert_eq!(second.name, "add_email");
    assert!(second.has_up_file() && second.has_down_file());

    let validation = harness.wrapper.validate_migrations().unwrap();
    assert!(validation.valid);
    assert_eq!(validation.total_migrations, 2);
}

#[tokio::test]
async fn test_version_reads_stderr() {
    let harness = Harness::new();

    assert_eq!(harness.wrapper.version().await, None);

    let result = harness.wrapper.up(None).await.unwrap();
    assert!(result.success);
    assert_eq!(result.version, Some(2));
    assert_eq!(harness.wrapper.version().await, Some(2));

    let calls = harness.calls();
    assert!(calls.iter().any(|call| call.ends_with(" up")));
    assert!(calls.iter().all(|call| call.starts_with("-database sqlite://test.db -path ")));
}

#[tokio::test]
async fn test_dirty_then_force() {
    let harness = Harness::new();
    harness.mark_dirty();

    let status = harness.wrapper.status().await;
    assert_eq!(status.version, Some(2));
    assert!(status.dirty);

    let err = harness.wrapper.up(None).await.unwrap_err();
    assert!(err.is_dirty());

    let forced = harness.wrapper.force(2).await.unwrap();
    assert!(forced.success);
    assert!(!forced.dirty);
    assert_eq!(forced.message, "Forced version to 2");

    let status = harness.wrapper.status().await;
    assert_eq!(status.version, Some(2));
    assert!(status.is_clean());
}

#[tokio::test]
async fn test_unknown_failure_is_a_result() {
    let harness = Harness::new();

    let result = harness.wrapper.drop(true).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.message, "error: unknown command drop");
    assert_eq!(result.error.as_deref(), Some("error: unknown command drop"));
}
