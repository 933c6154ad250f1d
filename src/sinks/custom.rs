use super::{LogDestination, format_line};
use crate::domain::LogType;
use std::sync::Arc;

/// Application-provided receiver of formatted log lines.
pub trait CustomDestinationSender: Send + Sync {
    fn log(&self, line: &str);
}

pub struct CustomDestination {
    sender: Arc<dyn CustomDestinationSender>,
}

impl CustomDestination {
    pub fn new(sender: Arc<dyn CustomDestinationSender>) -> Self {
        Self { sender }
    }
}

impl LogDestination for CustomDestination {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn send(&self, log_type: LogType, formatted: &str) {
        self.sender.log(&format_line(log_type, formatted));
    }
}
