//! Locating, migrating and opening the highscore store.
//!
//! The store is a single SQLite file. Older releases kept it next to the
//! binary under `./data/highscore.db`; current releases keep it under the
//! per-user root `~/.yadarts/data/highscore.db`. Startup runs four stages in
//! order, each one aborting the sequence on failure:
//!
//! 1. [`StoreLocation::resolve`] computes both paths (pure).
//! 2. [`migrate`] copies a legacy file into place if the canonical one is absent.
//! 3. [`provision`] guarantees an accessible canonical file exists.
//! 4. [`ConnectionFactory::open`] opens the database handle.

pub mod connection;
pub mod location;
pub mod migrate;
pub mod provision;

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

pub use connection::ConnectionFactory;
pub use location::StoreLocation;
pub use migrate::{migrate, migrate_with};
pub use provision::provision;

/// Failures of the startup sequence. All of them are fatal to startup.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to migrate legacy highscore file '{}' to '{}': {source}", legacy.display(), canonical.display())]
    MigrationFailed {
        legacy: PathBuf,
        canonical: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Highscore file '{}' exists but is not accessible: {source}", path.display())]
    StoreInaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not create highscore file '{}': {source}", path.display())]
    StoreCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Database driver '{driver}' is unavailable: {reason}")]
    DriverUnavailable { driver: String, reason: String },

    #[error("Could not open highscore database '{}': {source}", path.display())]
    ConnectionFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// State of a path on disk, looked up fresh on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Absent,
    ExistsReadableWritable,
    ExistsNotAccessible,
}

impl FileState {
    /// Only a successful lookup counts as existing. A missing, unsearchable
    /// or file-blocked parent leaves the path `Absent`, so creation is tried
    /// and reports its own failure.
    pub fn of(path: &Path) -> Self {
        match fs::metadata(path) {
            Err(_) => FileState::Absent,
            Ok(_) => match check_access(path) {
                Ok(()) => FileState::ExistsReadableWritable,
                Err(_) => FileState::ExistsNotAccessible,
            },
        }
    }

    pub fn exists(self) -> bool {
        self != FileState::Absent
    }
}

/// Opens `path` for reading and writing without creating or truncating it.
pub(crate) fn check_access(path: &Path) -> io::Result<()> {
    let meta = fs::metadata(path)?;
    if !meta.is_file() {
        return Err(io::Error::other("not a regular file"));
    }
    OpenOptions::new().read(true).write(true).open(path)?;
    Ok(())
}

/// What the migration stage decided. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    NoLegacyFound,
    MigratedFromLegacy,
    CanonicalAlreadyPresent,
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationOutcome::NoLegacyFound => "no legacy highscore found",
            MigrationOutcome::MigratedFromLegacy => "migrated from legacy layout",
            MigrationOutcome::CanonicalAlreadyPresent => "canonical highscore present",
        };
        f.write_str(s)
    }
}

/// An open handle plus how the file got there.
#[derive(Debug)]
pub struct OpenedStore {
    pub connection: Connection,
    pub outcome: MigrationOutcome,
    pub path: PathBuf,
}

/// Runs migration and provisioning, leaving an accessible canonical file.
pub fn prepare(location: &StoreLocation) -> Result<(PathBuf, MigrationOutcome)> {
    let outcome = migrate(location)?;
    let path = provision(location, outcome)?;
    Ok((path, outcome))
}

/// Runs the full startup sequence and opens the database.
pub fn open_store(location: &StoreLocation) -> Result<OpenedStore> {
    let (path, outcome) = prepare(location)?;
    let connection = ConnectionFactory::new()?.open(&path)?;
    info!(path = %path.display(), %outcome, "highscore store opened");

    Ok(OpenedStore {
        connection,
        outcome,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_state_absent() {
        let dir = tempdir().unwrap();
        assert_eq!(FileState::of(&dir.path().join("nope.db")), FileState::Absent);
    }

    #[test]
    fn file_state_regular_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.db");
        fs::write(&path, b"x").unwrap();
        assert_eq!(FileState::of(&path), FileState::ExistsReadableWritable);
        assert!(FileState::of(&path).exists());
    }

    #[test]
    fn file_state_directory_is_not_accessible() {
        let dir = tempdir().unwrap();
        assert_eq!(FileState::of(dir.path()), FileState::ExistsNotAccessible);
    }

    #[test]
    fn file_state_is_not_cached() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.db");
        assert_eq!(FileState::of(&path), FileState::Absent);
        fs::write(&path, b"").unwrap();
        assert_eq!(FileState::of(&path), FileState::ExistsReadableWritable);
        fs::remove_file(&path).unwrap();
        assert_eq!(FileState::of(&path), FileState::Absent);
    }

    #[test]
    fn file_state_under_a_file_is_absent() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("data");
        fs::write(&blocker, b"").unwrap();
        assert_eq!(FileState::of(&blocker.join("highscore.db")), FileState::Absent);
    }

    #[cfg(unix)]
    #[test]
    fn file_state_under_an_unsearchable_dir_is_absent() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("a.db"), b"").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root can still search it
        let privileged = fs::metadata(locked.join("a.db")).is_ok();
        let state = FileState::of(&locked.join("a.db"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        if !privileged {
            assert_eq!(state, FileState::Absent);
        }
    }

    #[test]
    fn prepare_twice_is_stable() {
        let home = tempdir().unwrap();
        let work = tempdir().unwrap();
        let location = StoreLocation::resolve(home.path()).with_legacy_root(work.path());

        let (path, first) = prepare(&location).unwrap();
        assert_eq!(first, MigrationOutcome::NoLegacyFound);
        let (again, second) = prepare(&location).unwrap();
        assert_eq!(second, MigrationOutcome::CanonicalAlreadyPresent);
        assert_eq!(path, again);
    }

    #[test]
    fn open_store_on_fresh_home() {
        let home = tempdir().unwrap();
        let work = tempdir().unwrap();
        let location = StoreLocation::resolve(home.path()).with_legacy_root(work.path());

        let opened = open_store(&location).unwrap();
        assert_eq!(opened.outcome, MigrationOutcome::NoLegacyFound);
        assert_eq!(opened.path, location.canonical_path());
        let version: i64 = opened
            .connection
            .query_row("PRAGMA schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 0);
    }
}
