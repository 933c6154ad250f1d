use super::{DeliveryOutcome, LogTransport, Transform, TransportError};
use crate::domain::{LogEntry, LogTag};
use async_trait::async_trait;
use futures::FutureExt;
use rustls::pki_types::ServerName;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

trait Stream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Stream for T {}

type Connection = Box<dyn Stream>;

#[derive(Debug, Clone)]
pub struct SocketTransportConfig {
    pub host: String,
    pub port: u16,
    /// Applies to connecting, the TLS handshake and every single write.
    pub timeout: Duration,
    pub log_activity: bool,
}

/// Streams newline-delimited JSON to the collector.
///
/// Every batch gets its own connection, shut down once the batch is written.
/// Within a batch the connection is reopened after a failed write or when the
/// collector has closed it.
pub struct SocketTransport {
    config: SocketTransportConfig,
    connector: Option<TlsConnector>,
    cancel: CancellationToken,
}

impl SocketTransport {
    /// Plain TCP when `connector` is `None`.
    pub fn new(config: SocketTransportConfig, connector: Option<TlsConnector>) -> Self {
        Self {
            config,
            connector,
            cancel: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn connect(&self) -> Result<Connection, TransportError> {
        if self.cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.open() => result,
        }
    }

    async fn open(&self) -> Result<Connection, TransportError> {
        let limit = self.config.timeout;
        let address = format!("{}:{}", self.config.host, self.config.port);

        let tcp = timeout(limit, TcpStream::connect(&address))
            .await
            .map_err(|_| TransportError::Timeout(limit))?
            .map_err(|e| TransportError::Connection(format!("{address}: {e}")))?;
        if let Err(e) = tcp.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY on {}: {}", address, e);
        }

        let Some(connector) = &self.connector else {
            debug!("Connected to {}", address);
            return Ok(Box::new(tcp));
        };

        let server_name = ServerName::try_from(self.config.host.clone())
            .map_err(|e| TransportError::Handshake(format!("invalid server name: {e}")))?;
        let tls = timeout(limit, connector.connect(server_name, tcp))
            .await
            .map_err(|_| TransportError::Timeout(limit))?
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        debug!("Connected to {} over TLS", address);
        Ok(Box::new(tls))
    }

    async fn write(&self, stream: &mut Connection, payload: &[u8]) -> Result<(), TransportError> {
        let limit = self.config.timeout;
        let io = async {
            stream.write_all(payload).await?;
            stream.flush().await
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Err(TransportError::Cancelled),
            result = timeout(limit, io) => match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(TransportError::Write(e.to_string())),
                Err(_) => Err(TransportError::Timeout(limit)),
            },
        }
    }

    async fn close(&self, mut stream: Connection) {
        if let Ok(Err(e)) = timeout(self.config.timeout, stream.shutdown()).await {
            debug!("Socket shutdown failed: {}", e);
        }
    }
}

/// True once the collector has closed or reset the connection. Data sent by
/// the collector is discarded.
fn peer_closed(stream: &mut Connection) -> bool {
    let mut byte = [0u8; 1];
    match stream.read(&mut byte).now_or_never() {
        None | Some(Ok(1..)) => false,
        Some(Ok(0) | Err(_)) => true,
    }
}

#[async_trait]
impl LogTransport for SocketTransport {
    fn cancel(&self) {
        // A write in progress sees the token and drops its connection.
        self.cancel.cancel();
    }

    async fn send_logs(
        &self,
        logs: &BTreeMap<LogTag, LogEntry>,
        transform: &Transform,
    ) -> DeliveryOutcome {
        let mut outcome = DeliveryOutcome::new();
        let mut connection: Option<Connection> = None;

        let mut remaining = logs.iter();
        while let Some((tag, entry)) = remaining.next() {
            let payload = match transform(entry) {
                Ok(payload) => payload,
                Err(e) => {
                    outcome.insert(*tag, e);
                    continue;
                }
            };

            if connection.as_mut().is_some_and(peer_closed) {
                debug!("Logstash closed the connection, reconnecting");
                connection = None;
            }

            if connection.is_none() {
                match self.connect().await {
                    Ok(stream) => connection = Some(stream),
                    Err(e) => {
                        warn!(
                            "Logstash connection to {}:{} failed: {}",
                            self.config.host, self.config.port, e
                        );
                        outcome.insert(*tag, e.clone());
                        for (tag, _) in remaining.by_ref() {
                            outcome.insert(*tag, e.clone());
                        }
                        break;
                    }
                }
            }

            let Some(stream) = connection.as_mut() else {
                outcome.insert(*tag, TransportError::Connection("connection closed".to_string()));
                continue;
            };
            match self.write(stream, &payload).await {
                Ok(()) => {
                    if self.config.log_activity {
                        debug!("Logstash socket wrote tag {} ({} bytes)", tag, payload.len());
                    }
                }
                Err(e) => {
                    if self.config.log_activity {
                        debug!("Logstash socket write for tag {} failed: {}", tag, e);
                    }
                    connection = None;
                    outcome.insert(*tag, e);
                }
            }
        }

        if let Some(stream) = connection {
            self.close(stream).await;
        }
        if !outcome.is_empty() {
            debug!("{} of {} entries not delivered over socket", outcome.len(), logs.len());
        }
        outcome
    }
}
