//! Structured logging.
//!
//! Installs a `tracing-subscriber` registry with an env filter, a stderr
//! formatter and, when configured, a second formatter appending to a file.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize the global subscriber. Fails only if the log file cannot be opened.
pub fn init_logging(config: &ObservabilityConfig) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("front_gateway={0},front={0},tower_http=info", config.log_level).into()
    });

    let file_layer = if config.log_file.is_empty() {
        None
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)?;
        Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}
