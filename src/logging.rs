//! Log setup for the binaries.
//!
//! The terminal belongs to the UI, so logs go to a file.  The filter comes
//! from `AIFUN_LOG` and defaults to `info`.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::{Error, Result};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "AIFUN_LOG";

/// Log file used when none is configured.
pub const DEFAULT_LOG_FILE: &str = "aifun.log";

/// Route `tracing` events to `path`, appending.
///
/// Calling this twice keeps the first subscriber.
pub fn init(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(format!("cannot open log file {}: {e}", path.display()), e))?;

    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}
