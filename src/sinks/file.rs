use super::{LogDestination, format_line};
use crate::domain::LogType;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Appends one line per log to a file, creating it on first write.
pub struct FileDestination {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileDestination {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) -> io::Result<()> {
        let mut file = self.file.lock();
        if file.is_none() {
            *file = Some(OpenOptions::new().create(true).append(true).open(&self.path)?);
        }
        let result = match file.as_mut() {
            Some(handle) => writeln!(handle, "{line}"),
            None => Ok(()),
        };
        if result.is_err() {
            // Reopened on the next write.
            *file = None;
        }
        result
    }
}

impl LogDestination for FileDestination {
    fn name(&self) -> &'static str {
        "file"
    }

    fn send(&self, log_type: LogType, formatted: &str) {
        if let Err(e) = self.append(&format_line(log_type, formatted)) {
            warn!("Could not write to log file {}: {}", self.path.display(), e);
        }
    }
}
