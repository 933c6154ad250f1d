use super::scheduler::{FanOutScheduler, SendFn, SendScheduling};
use super::{DeliveryOutcome, LogTransport, Transform, TransportError};
use crate::domain::{LogEntry, LogTag};
use async_trait::async_trait;
use futures::FutureExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Path every entry is POSTed to, relative to the configured endpoint.
pub const INGEST_PATH: &str = "/applications/logging";

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL of the collector, e.g. `https://logs.example.com`.
    pub endpoint: String,
    pub timeout: Duration,
    pub allow_untrusted_server: bool,
    pub log_activity: bool,
}

/// Sends each entry as its own JSON POST request, concurrently.
pub struct HttpTransport {
    client: Client,
    url: Url,
    timeout: Duration,
    log_activity: bool,
    scheduler: Arc<dyn SendScheduling>,
    cancel: CancellationToken,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Self::build_client(config)?;
        let url = Self::ingest_url(&config.endpoint)?;
        Ok(Self::with_client(client, url, config))
    }

    /// Builds a transport around an existing client, so that a replacement
    /// transport can reuse the connection pool.
    pub fn with_client(client: Client, url: Url, config: &HttpTransportConfig) -> Self {
        Self {
            client,
            url,
            timeout: config.timeout,
            log_activity: config.log_activity,
            scheduler: Arc::new(FanOutScheduler::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn SendScheduling>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn build_client(config: &HttpTransportConfig) -> Result<Client, TransportError> {
        let mut builder = ClientBuilder::new()
            .use_rustls_tls()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .user_agent(concat!("rask-log-shipper/", env!("CARGO_PKG_VERSION")));

        if config.allow_untrusted_server {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| TransportError::Request(format!("Failed to build HTTP client: {e}")))
    }

    /// Appends [`INGEST_PATH`] to the endpoint unless it already ends with it.
    pub fn ingest_url(endpoint: &str) -> Result<Url, TransportError> {
        let mut url: Url = endpoint
            .parse()
            .map_err(|e| TransportError::Request(format!("Invalid endpoint URL '{endpoint}': {e}")))?;

        if !url.path().ends_with(INGEST_PATH) {
            let base = url.path().trim_end_matches('/').to_string();
            url.set_path(&format!("{base}{INGEST_PATH}"));
        }
        Ok(url)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

fn map_request_error(error: &reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else if error.is_connect() {
        TransportError::Connection(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}

#[async_trait]
impl LogTransport for HttpTransport {
    fn cancel(&self) {
        self.cancel.cancel();
    }

    async fn send_logs(
        &self,
        logs: &BTreeMap<LogTag, LogEntry>,
        transform: &Transform,
    ) -> DeliveryOutcome {
        let client = self.client.clone();
        let url = self.url.clone();
        let transform = transform.clone();
        let cancel = self.cancel.clone();
        let timeout = self.timeout;

        let send: SendFn = Arc::new(move |entry: LogEntry| {
            let client = client.clone();
            let url = url.clone();
            let transform = transform.clone();
            let cancel = cancel.clone();
            async move {
                let body = transform(&entry)?;
                let request = client
                    .post(url)
                    .header(CONTENT_TYPE, "application/json")
                    .body(body)
                    .send();

                let response = tokio::select! {
                    _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                    response = request => response,
                };

                match response {
                    Ok(response) if response.status().is_success() => Ok(()),
                    Ok(response) => Err(TransportError::HttpStatus {
                        status: response.status().as_u16(),
                    }),
                    Err(e) => Err(map_request_error(&e, timeout)),
                }
            }
            .boxed()
        });

        let outcome = self.scheduler.schedule_send(logs, send).await;

        if self.log_activity {
            for (tag, error) in &outcome {
                debug!("Logstash HTTP send for tag {} failed: {}", tag, error);
            }
            debug!(
                "Logstash HTTP sent {} of {} entries to {}",
                logs.len() - outcome.len(),
                logs.len(),
                self.url
            );
        }
        outcome
    }
}
