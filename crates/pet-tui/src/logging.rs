use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "desktop-pet.log";

pub fn log_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;
    Ok(data_dir.join("desktop-pet").join("logs"))
}

/// Route tracing output to a file; the terminal belongs to the UI.
///
/// `RUST_LOG` overrides the default filter. The returned guard flushes
/// buffered lines on drop, so keep it alive for the whole run.
pub fn init(debug: bool) -> Result<WorkerGuard> {
    init_in(&log_dir()?, debug)
}

fn init_in(dir: &Path, debug: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let log_file = options.open(dir.join(LOG_FILE_NAME))?;

    let (writer, guard) = non_blocking(log_file);

    let default_filter = if debug {
        "pet_core=debug,pet_tui=debug"
    } else {
        "pet_core=info,pet_tui=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_ansi(false)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    Ok(guard)
}
