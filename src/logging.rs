//! Logging setup
//!
//! Installs a `tracing` subscriber from the `[logging]` config section.
//! `RUST_LOG`, when set, takes precedence over the configured level. Output
//! goes to stderr (or the configured file) so command output on stdout stays
//! machine-readable.

use crate::config::LoggingConfig;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to open log file {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Filter used when `RUST_LOG` is absent
fn default_directive(level: &str) -> String {
    format!("meterdb={}", level.trim().to_lowercase())
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let (writer, ansi) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::File {
                    path: PathBuf::from(path),
                    source,
                })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format.as_str() {
        "json" => fmt::layer().json().with_writer(writer).boxed(),
        _ => fmt::layer().with_ansi(ansi).with_writer(writer).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()?;

    Ok(())
}
