use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use super::{Result, StoreError};

/// Identifier of the embedded engine the store is written for.
pub const DRIVER_ID: &str = "sqlite";

/// Oldest SQLite release the highscore schema runs on (3.8.0).
const MIN_ENGINE_VERSION: i32 = 3_008_000;

const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens database handles on an already provisioned file.
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    driver: String,
    engine_version: String,
}

impl ConnectionFactory {
    pub fn new() -> Result<Self> {
        Self::for_driver(DRIVER_ID)
    }

    /// Looks up the engine registered under `driver`.
    pub fn for_driver(driver: &str) -> Result<Self> {
        if driver != DRIVER_ID {
            return Err(StoreError::DriverUnavailable {
                driver: driver.to_string(),
                reason: format!("only '{DRIVER_ID}' is linked into this build"),
            });
        }

        let version = rusqlite::version_number();
        if version < MIN_ENGINE_VERSION {
            return Err(StoreError::DriverUnavailable {
                driver: driver.to_string(),
                reason: format!(
                    "engine {} is older than the required {MIN_ENGINE_VERSION}",
                    rusqlite::version()
                ),
            });
        }

        Ok(Self {
            driver: driver.to_string(),
            engine_version: rusqlite::version().to_string(),
        })
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    /// Opens `path` read-write. The file must already exist.
    pub fn open(&self, path: &Path) -> Result<Connection> {
        let failed = |source| StoreError::ConnectionFailed {
            path: path.to_path_buf(),
            source,
        };

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(failed)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(failed)?;

        // Forces the header to be read so corrupt files fail here.
        let schema_version: i64 = conn
            .query_row("PRAGMA schema_version", [], |row| row.get(0))
            .map_err(failed)?;
        debug!(
            path = %path.display(),
            engine = %self.engine_version,
            schema_version,
            "opened highscore database"
        );

        Ok(conn)
    }
}
