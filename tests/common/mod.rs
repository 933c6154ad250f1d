#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rask_log_shipper::sender::{Transform, TransportFactory};
use rask_log_shipper::{DeliveryOutcome, LogEntry, LogTag, LogTransport, TransportError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// State shared by every transport a [`MockTransport::factory`] creates.
#[derive(Default)]
pub struct MockState {
    pub send_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub created: AtomicUsize,
    pub batches: Mutex<Vec<Vec<LogTag>>>,
    pub entries: Mutex<Vec<LogEntry>>,
    pub fail_tags: Mutex<BTreeSet<LogTag>>,
    /// When set, `send_logs` waits for a notification before answering.
    pub gate: Mutex<Option<Arc<Notify>>>,
    /// Notified once a batch has been received.
    pub received: Notify,
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> Vec<Vec<LogTag>> {
        self.batches.lock().clone()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn fail(&self, tags: &[LogTag]) {
        self.fail_tags.lock().extend(tags.iter().copied());
    }

    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }
}

pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn factory(state: Arc<MockState>) -> TransportFactory {
        Arc::new(move || {
            state.created.fetch_add(1, Ordering::SeqCst);
            Arc::new(MockTransport {
                state: state.clone(),
            }) as Arc<dyn LogTransport>
        })
    }
}

#[async_trait]
impl LogTransport for MockTransport {
    fn cancel(&self) {
        self.state.cancel_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn send_logs(
        &self,
        logs: &BTreeMap<LogTag, LogEntry>,
        transform: &Transform,
    ) -> DeliveryOutcome {
        self.state.send_calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .batches
            .lock()
            .push(logs.keys().copied().collect());
        self.state.entries.lock().extend(logs.values().cloned());
        for entry in logs.values() {
            assert!(transform(entry).is_ok());
        }
        self.state.received.notify_one();

        let gate = self.state.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let fail_tags = self.state.fail_tags.lock().clone();
        logs.keys()
            .filter(|tag| fail_tags.contains(tag))
            .map(|tag| (*tag, TransportError::Write(format!("tag {tag} rejected"))))
            .collect()
    }
}

pub fn message_entry(message: &str) -> LogEntry {
    let mut entry = LogEntry::new();
    entry.insert("message", message);
    entry
}
