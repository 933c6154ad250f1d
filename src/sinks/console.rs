use super::{LogDestination, format_line, inner_message};
use crate::domain::LogType;

/// Prints the plain message of each log to stdout.
#[derive(Debug, Clone)]
pub struct ConsoleDestination {
    message_key: String,
}

impl ConsoleDestination {
    pub fn new(message_key: impl Into<String>) -> Self {
        Self {
            message_key: message_key.into(),
        }
    }

    /// The line that would be printed, or `None` when the formatted log
    /// carries no message.
    pub fn render(&self, log_type: LogType, formatted: &str) -> Option<String> {
        inner_message(formatted, &self.message_key).map(|message| format_line(log_type, &message))
    }
}

impl Default for ConsoleDestination {
    fn default() -> Self {
        Self::new("message")
    }
}

impl LogDestination for ConsoleDestination {
    fn name(&self) -> &'static str {
        "console"
    }

    fn send(&self, log_type: LogType, formatted: &str) {
        if let Some(line) = self.render(log_type, formatted) {
            println!("{line}");
        }
    }
}
