use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;

use tracing::{debug, info};

use super::{check_access, FileState, MigrationOutcome, Result, StoreError, StoreLocation};

/// Makes sure an accessible canonical highscore file exists and returns its path.
///
/// Safe to call repeatedly: an existing file is only checked, never
/// truncated or re-migrated.
pub fn provision(location: &StoreLocation, outcome: MigrationOutcome) -> Result<PathBuf> {
    let path = location.canonical_path();
    debug!(path = %path.display(), %outcome, "provisioning highscore file");

    if FileState::of(path) == FileState::Absent {
        let dir = location.canonical_dir();
        fs::create_dir_all(dir).map_err(|source| StoreError::StoreCreationFailed {
            path: dir.to_path_buf(),
            source,
        })?;

        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => info!(path = %path.display(), "created empty highscore file"),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "highscore file appeared concurrently")
            }
            Err(source) => {
                return Err(StoreError::StoreCreationFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    check_access(path).map_err(|source| StoreError::StoreInaccessible {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(path.to_path_buf())
}
