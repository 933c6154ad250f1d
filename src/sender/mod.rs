pub mod http;
pub mod scheduler;
pub mod serialization;
pub mod socket;
pub mod tls;

use crate::domain::{LogEntry, LogTag};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use http::{HttpTransport, HttpTransportConfig, INGEST_PATH};
pub use scheduler::{FanOutScheduler, SendFn, SendScheduling};
pub use serialization::ndjson_transform;
pub use socket::{SocketTransport, SocketTransportConfig};
pub use tls::{ClientIdentity, TlsError, TlsSettings, build_connector};

/// Failure to deliver one entry. Always recoverable: the entry is put back
/// into the buffer and retried on the next flush.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("TLS handshake failed: {0}")]
    Handshake(String),
    #[error("Write failed: {0}")]
    Write(String),
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error: status {status}")]
    HttpStatus { status: u16 },
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Send cancelled")]
    Cancelled,
    #[error("Send task failed: {0}")]
    TaskFailed(String),
}

/// Per-tag failures of one transport call. A tag that is absent was delivered.
pub type DeliveryOutcome = BTreeMap<LogTag, TransportError>;

/// Serializes one entry to its wire representation.
pub type Transform = Arc<dyn Fn(&LogEntry) -> Result<Bytes, TransportError> + Send + Sync>;

/// Builds a fresh transport. Used by the destination to replace a cancelled one.
pub type TransportFactory = Arc<dyn Fn() -> Arc<dyn LogTransport> + Send + Sync>;

/// Delivers batches of entries to the collector.
#[async_trait]
pub trait LogTransport: Send + Sync {
    /// Abandons outstanding work. A cancelled transport is discarded by its owner.
    fn cancel(&self);

    /// Delivers every entry of `logs` and reports the ones that failed.
    ///
    /// Entries are submitted in ascending tag order. Every tag of `logs` that
    /// was not delivered appears in the returned outcome.
    async fn send_logs(
        &self,
        logs: &BTreeMap<LogTag, LogEntry>,
        transform: &Transform,
    ) -> DeliveryOutcome;
}
