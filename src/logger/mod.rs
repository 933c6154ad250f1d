//! Logger facade: sanitizes, formats and dispatches logs to the sinks.

pub mod formatter;
pub mod log;
pub mod sanitizer;

use crate::app::Configuration;
use crate::destination::{FlushReceipt, LogstashDestination};
use crate::domain::{LogType, ShipperError};
use crate::sender::{
    HttpTransport, LogTransport, SocketTransport, TransportFactory, build_connector,
};
use crate::sinks::{
    ConsoleDestination, CustomDestination, CustomDestinationSender, FileDestination,
    LogDestination, LogstashSink,
};
use crate::timer::RepeatingTimer;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info};

pub use formatter::{FormatterKeys, JsonStringLogMessageFormatter, LogMessageFormatter};
pub use log::Log;
pub use sanitizer::{RedactionRule, RedactionSanitizer, SanitizerError};

/// Rewrites a message before it is formatted, e.g. to redact secrets.
pub type SanitizeFn = Arc<dyn Fn(&str, LogType) -> String + Send + Sync>;

type Destinations = Arc<Vec<Box<dyn LogDestination>>>;

#[derive(Default, Clone, Copy, PartialEq, Eq)]
enum Phase {
    #[default]
    Queueing,
    /// Sinks exist but the queue is still draining; new logs join the queue.
    Replaying,
    Ready,
}

#[derive(Default)]
struct FacadeState {
    destinations: Destinations,
    queued_logs: Vec<Log>,
    phase: Phase,
}

/// Entry point for application code.
///
/// Logs sent before [`setup`](Logger::setup) are queued and replayed, in
/// order, once the sinks exist. Sinks run outside the facade lock, so a
/// sink may log through the same `Logger`.
pub struct Logger {
    configuration: Configuration,
    formatter: Arc<dyn LogMessageFormatter>,
    sanitize: RwLock<SanitizeFn>,
    state: RwLock<FacadeState>,
    logstash: Mutex<Option<LogstashDestination>>,
    timer: Mutex<Option<RepeatingTimer>>,
    custom_sender: Mutex<Option<Arc<dyn CustomDestinationSender>>>,
    transport_factory: Mutex<Option<TransportFactory>>,
}

impl Logger {
    pub fn new(configuration: Configuration, formatter: Arc<dyn LogMessageFormatter>) -> Self {
        Self {
            configuration,
            formatter,
            sanitize: RwLock::new(Arc::new(|message: &str, _: LogType| message.to_string())),
            state: RwLock::new(FacadeState::default()),
            logstash: Mutex::new(None),
            timer: Mutex::new(None),
            custom_sender: Mutex::new(None),
            transport_factory: Mutex::new(None),
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Receiver for the custom sink. Takes effect at setup.
    pub fn set_custom_sender(&self, sender: Arc<dyn CustomDestinationSender>) {
        *self.custom_sender.lock() = Some(sender);
    }

    /// Replaces the transport built from the configuration. Takes effect at setup.
    pub fn set_transport_factory(&self, factory: TransportFactory) {
        *self.transport_factory.lock() = Some(factory);
    }

    /// Creates the enabled sinks, starts the periodic flush and replays the
    /// queued logs. Must run inside a Tokio runtime when logstash is enabled.
    pub fn setup(&self) -> Result<(), ShipperError> {
        let mut state = self.state.write();
        if state.phase != Phase::Queueing {
            return Err(ShipperError::AlreadySetUp);
        }
        self.configuration.validate()?;

        let config = &self.configuration;
        let mut destinations: Vec<Box<dyn LogDestination>> = Vec::new();

        if config.console_logging_enabled {
            destinations.push(Box::new(ConsoleDestination::new(self.formatter.message_key())));
        }

        if config.file_logging_enabled {
            destinations.push(Box::new(FileDestination::new(config.log_file_path())));
        }

        if config.logstash_logging_enabled {
            let factory = match self.transport_factory.lock().clone() {
                Some(factory) => factory,
                None => transport_factory(config)?,
            };
            let destination =
                LogstashDestination::new(factory, config.log_logstash_socket_activity)?;

            let timer = RepeatingTimer::new(config.sending_interval)?;
            let flush_target = destination.clone();
            timer.set_event_handler(move || {
                let _ = flush_target.flush();
            });
            let cancel_target = destination.clone();
            timer.set_cancel_handler(move || cancel_target.cancel());
            timer.run();

            destinations.push(Box::new(LogstashSink::new(
                destination.clone(),
                config.logzio_token.clone(),
            )));
            *self.logstash.lock() = Some(destination);
            *self.timer.lock() = Some(timer);
        }

        if config.custom_logging_enabled {
            if let Some(sender) = self.custom_sender.lock().clone() {
                destinations.push(Box::new(CustomDestination::new(sender)));
            }
        }

        info!(
            "Logger set up with sinks: {}",
            destinations
                .iter()
                .map(|d| d.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let destinations: Destinations = Arc::new(destinations);
        state.destinations = destinations.clone();
        state.phase = Phase::Replaying;
        let mut queued = std::mem::take(&mut state.queued_logs);
        drop(state);

        if !queued.is_empty() {
            debug!("Replaying {} queued logs", queued.len());
        }
        // Logs sent meanwhile keep queueing until the queue is seen empty.
        loop {
            for log in queued {
                self.dispatch(&destinations, log);
            }
            let mut state = self.state.write();
            queued = std::mem::take(&mut state.queued_logs);
            if queued.is_empty() {
                state.phase = Phase::Ready;
                return Ok(());
            }
        }
    }

    pub fn send(&self, log: Log) {
        let destinations = {
            let state = self.state.read();
            (state.phase == Phase::Ready).then(|| state.destinations.clone())
        };
        let destinations = match destinations {
            Some(destinations) => destinations,
            None => {
                let mut state = self.state.write();
                if state.phase != Phase::Ready {
                    state.queued_logs.push(log);
                    return;
                }
                state.destinations.clone()
            }
        };
        self.dispatch(&destinations, log);
    }

    pub fn verbose(&self, message: impl Into<String>) {
        self.send(Log::new(LogType::Verbose, message));
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.send(Log::new(LogType::Debug, message));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(Log::new(LogType::Info, message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.send(Log::new(LogType::Warning, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(Log::new(LogType::Error, message));
    }

    /// Flushes the logstash buffer now. Resolves immediately when logstash
    /// logging is disabled.
    pub fn force_send(&self) -> Result<FlushReceipt, ShipperError> {
        if !self.is_set_up() {
            return Err(ShipperError::NotSetUp("force_send".to_string()));
        }
        Ok(match self.logstash.lock().as_ref() {
            Some(destination) => destination.flush(),
            None => FlushReceipt::ready(Ok(())),
        })
    }

    /// Drops every log not yet delivered to the collector.
    pub fn cancel_sending(&self) {
        if let Some(destination) = self.logstash.lock().as_ref() {
            destination.cancel();
        }
    }

    pub fn pause_periodic_flush(&self) {
        if let Some(timer) = self.timer.lock().as_ref() {
            timer.suspend();
        }
    }

    pub fn resume_periodic_flush(&self) {
        if let Some(timer) = self.timer.lock().as_ref() {
            timer.run();
        }
    }

    /// Handle to the delivery coordinator, once set up with logstash enabled.
    pub fn logstash(&self) -> Option<LogstashDestination> {
        self.logstash.lock().clone()
    }

    pub fn queued_logs(&self) -> Vec<Log> {
        self.state.read().queued_logs.clone()
    }

    pub fn is_set_up(&self) -> bool {
        self.state.read().phase == Phase::Ready
    }

    /// Applies the installed sanitize function.
    pub fn sanitize(&self, message: &str, log_type: LogType) -> String {
        let sanitize = self.sanitize.read().clone();
        sanitize(message, log_type)
    }

    pub fn set_sanitize(&self, sanitize: impl Fn(&str, LogType) -> String + Send + Sync + 'static) {
        self.set_sanitize_fn(Arc::new(sanitize));
    }

    pub fn set_sanitize_fn(&self, sanitize: SanitizeFn) {
        *self.sanitize.write() = sanitize;
    }

    fn dispatch(&self, destinations: &[Box<dyn LogDestination>], mut log: Log) {
        log.message = self.sanitize(&log.message, log.log_type);
        let formatted = self.formatter.format(&log);
        for destination in destinations {
            destination.send(log.log_type, &formatted);
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        // Dropping the timer cancels the destination through its cancel hook.
        self.timer.lock().take();
    }
}

/// Builds the transport factory selected by the configuration.
fn transport_factory(config: &Configuration) -> Result<TransportFactory, ShipperError> {
    if config.logstash_over_http {
        let http_config = config.http_config();
        let client = HttpTransport::build_client(&http_config)
            .map_err(|e| ShipperError::TransportInit(e.to_string()))?;
        let url = HttpTransport::ingest_url(&http_config.endpoint)
            .map_err(|e| ShipperError::TransportInit(e.to_string()))?;

        return Ok(Arc::new(move || {
            Arc::new(HttpTransport::with_client(client.clone(), url.clone(), &http_config))
                as Arc<dyn LogTransport>
        }));
    }

    let connector = if config.use_tls {
        Some(build_connector(&config.tls_settings())?)
    } else {
        None
    };
    let socket_config = config.socket_config();

    Ok(Arc::new(move || {
        Arc::new(SocketTransport::new(socket_config.clone(), connector.clone()))
            as Arc<dyn LogTransport>
    }))
}
