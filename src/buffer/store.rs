use crate::domain::{LogEntry, LogTag};
use std::collections::BTreeMap;

/// In-memory store of entries not yet acknowledged by the collector.
///
/// Not synchronized: the destination actor is its only owner.
#[derive(Debug, Default)]
pub struct LogBuffer {
    entries: BTreeMap<LogTag, LogEntry>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: LogTag, entry: LogEntry) {
        self.entries.insert(tag, entry);
    }

    /// Takes every entry out of the buffer, leaving it empty.
    pub fn snapshot_and_clear(&mut self) -> BTreeMap<LogTag, LogEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Puts undelivered entries back. Entries appended since the snapshot
    /// keep their own tags, so nothing is overwritten.
    pub fn merge_back(&mut self, unsent: BTreeMap<LogTag, LogEntry>) {
        self.entries.extend(unsent);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<LogTag, LogEntry> {
        &self.entries
    }
}
