//! Discovery of migration files on disk.

use super::types::Migration;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// `<version>_<name>.<up|down>.sql`
static MIGRATION_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)_(.+)\.(up|down)\.sql$").expect("valid regex"));

/// Files seen so far for one version.
#[derive(Default)]
struct PendingMigration {
    name: String,
    up_file: Option<PathBuf>,
    down_file: Option<PathBuf>,
}

/// Scans a directory for migration files.
#[derive(Debug, Clone)]
pub struct MigrationScanner {
    migrations_path: PathBuf,
}

impl MigrationScanner {
    pub fn new(migrations_path: impl AsRef<Path>) -> Self {
        Self {
            migrations_path: migrations_path.as_ref().to_path_buf(),
        }
    }

    pub fn migrations_path(&self) -> &Path {
        &self.migrations_path
    }

    /// Scan for all migrations, sorted by version.
    ///
    /// Files are grouped by version number. A version only yields a
    /// [`Migration`] when its up file exists; a lone down file is dropped.
    /// Up and down names under the same version are not cross-checked, the
    /// name of the first file encountered wins.
    pub fn scan(&self) -> Result<Vec<Migration>, std::io::Error> {
        let mut pending: BTreeMap<u64, PendingMigration> = BTreeMap::new();

        for entry in WalkDir::new(&self.migrations_path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
        {
            let entry = match entry {
                Ok(entry) => entry,
                // The directory itself could not be read
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(_) => continue,
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(file_name) = entry.file_name().to_str() else {
                continue;
            };
            let Some(captures) = MIGRATION_FILE.captures(file_name) else {
                continue;
            };
            let Ok(version) = captures[1].parse::<u64>() else {
                debug!(file = %file_name, "Skipping migration file with oversized version");
                continue;
            };

            let slot = pending.entry(version).or_insert_with(|| PendingMigration {
                name: captures[2].to_string(),
                ..Default::default()
            });

            match &captures[3] {
                "up" => slot.up_file = Some(entry.path().to_path_buf()),
                _ => slot.down_file = Some(entry.path().to_path_buf()),
            }
        }

        // BTreeMap iteration keeps the result sorted by version
        let migrations: Vec<Migration> = pending
            .into_iter()
            .filter_map(|(version, slot)| {
                let up_file = slot.up_file?;
                Some(Migration {
                    version,
                    name: slot.name,
                    up_file,
                    down_file: slot.down_file,
                    timestamp: None,
                })
            })
            .collect();

        debug!(
            path = %self.migrations_path.display(),
            count = migrations.len(),
            "Scanned migrations"
        );

        Ok(migrations)
    }

    /// Find versions missing between the lowest and highest migration.
    pub fn find_gaps(&self, migrations: &[Migration]) -> Vec<u64> {
        find_gaps(migrations)
    }
}

/// Every version in `[min, max]` without a migration, ascending.
pub fn find_gaps(migrations: &[Migration]) -> Vec<u64> {
    let mut versions: Vec<u64> = migrations.iter().map(|m| m.version).collect();
    versions.sort_unstable();
    versions.dedup();

    // Walk neighbouring versions so the span is covered without a lookup table
    versions
        .windows(2)
        .flat_map(|pair| (pair[0] + 1)..pair[1])
        .collect()
}
