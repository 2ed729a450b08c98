use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "yadarts=info";

/// Installs the global subscriber, appending to `log_path`.
///
/// The terminal UI owns stdout, so logs go to a file. If the file cannot be
/// opened they go to stderr instead and the open error is returned for the
/// caller to report.
pub fn init(log_path: &Path) -> io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false);

    match open_log(log_path) {
        Ok(file) => {
            let _ = builder.with_writer(Mutex::new(file)).try_init();
            Ok(())
        }
        Err(e) => {
            let _ = builder.with_writer(io::stderr).try_init();
            Err(e)
        }
    }
}

fn open_log(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
