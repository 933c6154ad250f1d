use crate::domain::{LogError, LogType};
use serde_json::{Map, Value};

/// A log record as handed to the [`Logger`](super::Logger).
#[derive(Debug, Clone, PartialEq)]
pub struct Log {
    pub log_type: LogType,
    pub message: String,
    pub error: Option<LogError>,
    pub custom_data: Option<Map<String, Value>>,
    pub file: String,
    pub function: String,
    pub line: u32,
}

impl Log {
    pub fn new(log_type: LogType, message: impl Into<String>) -> Self {
        Self {
            log_type,
            message: message.into(),
            error: None,
            custom_data: None,
            file: String::new(),
            function: String::new(),
            line: 0,
        }
    }

    pub fn with_error(mut self, error: LogError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_custom_data(mut self, custom_data: Map<String, Value>) -> Self {
        self.custom_data = Some(custom_data);
        self
    }

    /// Records the call site.
    pub fn at(mut self, file: &str, function: &str, line: u32) -> Self {
        self.file = file.to_string();
        self.function = function.to_string();
        self.line = line;
        self
    }
}

/// Builds a [`Log`] stamped with the caller's file, module and line.
///
/// ```
/// use rask_log_shipper::{LogType, log_here};
///
/// let log = log_here!(LogType::Info, "user signed in");
/// assert!(log.file.ends_with(".rs"));
/// ```
#[macro_export]
macro_rules! log_here {
    ($log_type:expr, $message:expr) => {
        $crate::Log::new($log_type, $message).at(file!(), module_path!(), line!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_here_captures_call_site() {
        let log = crate::log_here!(LogType::Warning, "disk almost full");

        assert_eq!(log.log_type, LogType::Warning);
        assert_eq!(log.message, "disk almost full");
        assert!(log.file.ends_with("log.rs"));
        assert!(log.function.contains("logger::log"));
        assert!(log.line > 0);
    }
}
