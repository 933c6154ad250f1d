//! Diagnostics for the shipper itself, via `tracing-subscriber`.

use super::ConfigError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Noisy dependencies kept at `warn` unless `RUST_LOG` says otherwise.
pub const DEFAULT_DIRECTIVES: &[&str] = &["hyper=warn", "reqwest=warn", "rustls=warn", "h2=warn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsFormat {
    #[default]
    Compact,
    Json,
}

/// `<default level>,<directive>,...`
pub fn build_filter_string(default_level: &str) -> String {
    let mut parts = Vec::with_capacity(DEFAULT_DIRECTIVES.len() + 1);
    parts.push(default_level);
    parts.extend_from_slice(DEFAULT_DIRECTIVES);
    parts.join(",")
}

/// Installs the global subscriber. Later calls return the first call's result.
pub fn init_diagnostics(default_level: &str, format: DiagnosticsFormat) -> Result<(), ConfigError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    INIT.get_or_init(|| install(default_level, format))
        .clone()
        .map_err(ConfigError::InvalidConfig)
}

/// `RUST_LOG` when set, otherwise the default level with the quiet directives.
fn build_filter(default_level: &str) -> Result<EnvFilter, String> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(_) => EnvFilter::try_from_default_env().map_err(|e| e.to_string()),
        Err(_) => EnvFilter::try_new(build_filter_string(default_level)).map_err(|e| e.to_string()),
    }
    .map_err(|e| format!("Failed to create log filter: {e}"))
}

fn install(default_level: &str, format: DiagnosticsFormat) -> Result<(), String> {
    let filter = build_filter(default_level)?;

    let json = (format == DiagnosticsFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false)
    });
    let compact = (format == DiagnosticsFormat::Compact).then(|| {
        fmt::layer()
            .compact()
            .with_target(true)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(compact)
        .try_init()
        .map_err(|e| format!("Failed to set global tracing subscriber: {e}"))
}
