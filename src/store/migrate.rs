use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{FileState, MigrationOutcome, Result, StoreError, StoreLocation};

/// Copies a legacy highscore file into the canonical location if needed.
pub fn migrate(location: &StoreLocation) -> Result<MigrationOutcome> {
    migrate_with(location, copy_file)
}

/// Like [`migrate`], with the byte copy supplied by the caller.
///
/// `copier` receives the legacy path and a temporary path next to the
/// canonical file. Whatever it reports, the temporary file only replaces the
/// canonical one if its length on disk matches the legacy file.
pub fn migrate_with<F>(location: &StoreLocation, copier: F) -> Result<MigrationOutcome>
where
    F: FnOnce(&Path, &Path) -> io::Result<u64>,
{
    let canonical = location.canonical_path();
    let state = FileState::of(canonical);
    debug!(path = %canonical.display(), ?state, "checked canonical highscore file");
    if state.exists() {
        return Ok(MigrationOutcome::CanonicalAlreadyPresent);
    }

    let legacy = location.legacy_path();
    info!(
        canonical = %canonical.display(),
        legacy = %legacy.display(),
        "highscore file not found, searching legacy layout"
    );
    let expected = match legacy_len(legacy) {
        Ok(Some(len)) => len,
        Ok(None) => return Ok(MigrationOutcome::NoLegacyFound),
        Err(e) => {
            warn!(path = %legacy.display(), error = %e, "legacy highscore file is not readable, ignoring");
            return Ok(MigrationOutcome::NoLegacyFound);
        }
    };
    info!(path = %legacy.display(), bytes = expected, "found legacy highscore file");

    let dir = location.canonical_dir();
    fs::create_dir_all(dir).map_err(|source| StoreError::StoreCreationFailed {
        path: dir.to_path_buf(),
        source,
    })?;

    let staging = staging_path(canonical);
    let failed = |source| StoreError::MigrationFailed {
        legacy: legacy.to_path_buf(),
        canonical: canonical.to_path_buf(),
        source,
    };

    if let Err(e) = copier(legacy, &staging).and_then(|_| verify_len(&staging, expected)) {
        let _ = fs::remove_file(&staging);
        return Err(failed(e));
    }
    if let Err(e) = fs::rename(&staging, canonical) {
        let _ = fs::remove_file(&staging);
        return Err(failed(e));
    }

    info!(
        from = %legacy.display(),
        to = %canonical.display(),
        "copied legacy highscore file"
    );
    Ok(MigrationOutcome::MigratedFromLegacy)
}

/// Returns the legacy file's length, `None` if there is nothing there.
fn legacy_len(path: &Path) -> io::Result<Option<u64>> {
    let meta = match fs::metadata(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        other => other?,
    };
    if !meta.is_file() {
        return Err(io::Error::other("not a regular file"));
    }
    File::open(path)?;
    Ok(Some(meta.len()))
}

fn staging_path(canonical: &Path) -> PathBuf {
    let mut name = canonical
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("highscore"));
    name.push(".migrating");
    canonical.with_file_name(name)
}

fn verify_len(path: &Path, expected: u64) -> io::Result<()> {
    let actual = fs::metadata(path)?.len();
    if actual != expected {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("copied {actual} of {expected} bytes"),
        ));
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> io::Result<u64> {
    let mut src = File::open(from)?;
    let mut dst = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(to)?;
    let copied = io::copy(&mut src, &mut dst)?;
    dst.sync_all()?;
    Ok(copied)
}
