use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log sent through the [`Logger`](crate::Logger).
///
/// Variants are declared in ascending severity so that the derived ordering
/// can be used to compare against a minimum level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Verbose => "verbose",
            LogType::Debug => "debug",
            LogType::Info => "info",
            LogType::Warning => "warning",
            LogType::Error => "error",
        }
    }

    /// Upper-case label used by the console and file sinks.
    pub fn label(&self) -> &'static str {
        match self {
            LogType::Verbose => "VERBOSE",
            LogType::Debug => "DEBUG",
            LogType::Info => "INFO",
            LogType::Warning => "WARNING",
            LogType::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "verbose" => Ok(LogType::Verbose),
            "debug" => Ok(LogType::Debug),
            "info" => Ok(LogType::Info),
            "warning" | "warn" => Ok(LogType::Warning),
            "error" => Ok(LogType::Error),
            _ => Err(format!(
                "Invalid log type '{s}'. Valid values: verbose, debug, info, warning, error"
            )),
        }
    }
}
