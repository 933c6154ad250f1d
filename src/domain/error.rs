use thiserror::Error;

/// Top-level error type for misuse of the shipping pipeline.
///
/// Transport failures never surface here: they are reported per entry through
/// the delivery outcome and retried by the destination.
#[derive(Error, Debug)]
pub enum ShipperError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("TLS setup error: {0}")]
    Tls(#[from] crate::sender::TlsError),

    #[error("Logger used before setup: {0}")]
    NotSetUp(String),

    #[error("Logger already set up")]
    AlreadySetUp,

    #[error("Transport initialization failed: {0}")]
    TransportInit(String),

    #[error("No Tokio runtime available: {0}")]
    Runtime(String),
}
