//! Destinations a formatted log is dispatched to.

pub mod console;
pub mod custom;
pub mod file;
pub mod logstash;

use crate::domain::LogType;
use chrono::Local;

pub use console::ConsoleDestination;
pub use custom::{CustomDestination, CustomDestinationSender};
pub use file::FileDestination;
pub use logstash::LogstashSink;

/// Receives every log once it has been sanitized and formatted.
pub trait LogDestination: Send + Sync {
    fn name(&self) -> &'static str;

    fn send(&self, log_type: LogType, formatted: &str);
}

/// `<local timestamp> <LEVEL>: <message>`
pub fn format_line(log_type: LogType, message: &str) -> String {
    format!(
        "{} {}: {}",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        log_type.label(),
        message
    )
}

/// The plain message stored under `key` in a formatted JSON log.
pub fn inner_message(formatted: &str, key: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(formatted).ok()?;
    value.get(key)?.as_str().map(str::to_string)
}
