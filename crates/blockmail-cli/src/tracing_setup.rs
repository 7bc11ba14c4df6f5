use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "BLOCKMAIL_LOG";
const LOG_FILE_ENV: &str = "BLOCKMAIL_LOG_FILE";

/// Install the global subscriber. Filter comes from `BLOCKMAIL_LOG`
/// (default `warn`); output goes to stderr unless a log file is named by
/// `BLOCKMAIL_LOG_FILE` or the config.
pub fn init_tracing(config_log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let env_file = std::env::var(LOG_FILE_ENV).ok();
    let log_path = env_file.as_deref().map(Path::new).or(config_log_file);

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    match log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            builder
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_thread_names(true)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;
        }
    }
    Ok(())
}
