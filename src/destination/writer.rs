use crate::domain::{LogEntry, LogTag};
use crate::sender::{LogTransport, Transform, TransportError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Result of one write: the entries to put back and a representative error.
#[derive(Debug, Default)]
pub struct WriteResult {
    pub unsent: BTreeMap<LogTag, LogEntry>,
    /// The failure of the lowest unsent tag, if any.
    pub error: Option<TransportError>,
}

impl WriteResult {
    pub fn is_delivered(&self) -> bool {
        self.unsent.is_empty()
    }
}

/// Hands one flush cycle's snapshot to a transport and works out what to retry.
pub struct LogstashWriter {
    transport: Arc<dyn LogTransport>,
    transform: Transform,
    log_activity: bool,
}

impl LogstashWriter {
    pub fn new(transport: Arc<dyn LogTransport>, transform: Transform, log_activity: bool) -> Self {
        Self {
            transport,
            transform,
            log_activity,
        }
    }

    pub fn cancel(&self) {
        self.transport.cancel();
    }

    pub async fn write(&self, logs: BTreeMap<LogTag, LogEntry>) -> WriteResult {
        if logs.is_empty() {
            if self.log_activity {
                debug!("Nothing to write");
            }
            return WriteResult::default();
        }

        let outcome = self.transport.send_logs(&logs, &self.transform).await;
        if outcome.is_empty() {
            if self.log_activity {
                debug!("Wrote tags {:?}", logs.keys().collect::<Vec<_>>());
            }
            return WriteResult::default();
        }

        if self.log_activity {
            for (tag, error) in &outcome {
                debug!("Tag {} failed: {}", tag, error);
            }
        }

        // Tags the transport reports outside the batch are ignored.
        let unsent: BTreeMap<_, _> = logs
            .into_iter()
            .filter(|(tag, _)| outcome.contains_key(tag))
            .collect();
        let error = unsent
            .keys()
            .next()
            .and_then(|tag| outcome.get(tag))
            .cloned();

        WriteResult { unsent, error }
    }
}
