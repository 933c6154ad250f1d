use super::LogDestination;
use crate::destination::LogstashDestination;
use crate::domain::{LogEntry, LogType};
use serde_json::Value;
use tracing::debug;

/// Flattens formatted logs and hands them to the delivery coordinator.
pub struct LogstashSink {
    destination: LogstashDestination,
    token: Option<String>,
}

impl LogstashSink {
    pub fn new(destination: LogstashDestination, token: Option<String>) -> Self {
        Self { destination, token }
    }

    /// The entry shipped for a formatted log, or `None` when it is not a JSON object.
    pub fn entry_for(&self, formatted: &str) -> Option<LogEntry> {
        match serde_json::from_str::<Value>(formatted) {
            Ok(Value::Object(map)) => {
                Some(LogEntry::flattened(map).with_token(self.token.as_deref()))
            }
            _ => None,
        }
    }
}

impl LogDestination for LogstashSink {
    fn name(&self) -> &'static str {
        "logstash"
    }

    fn send(&self, _log_type: LogType, formatted: &str) {
        match self.entry_for(formatted) {
            Some(entry) => {
                self.destination.append(entry);
            }
            None => debug!("Skipping log that is not a JSON object"),
        }
    }
}
