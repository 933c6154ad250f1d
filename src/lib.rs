#![warn(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Durations in milliseconds fit in u64
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. TransportError in sender module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod buffer;
pub mod destination;
pub mod domain;
pub mod logger;
pub mod sender;
pub mod sinks;
pub mod timer;

// Re-export main types for easy access
pub use app::Configuration;
pub use destination::{FlushReceipt, LogstashDestination};
pub use domain::{LogEntry, LogError, LogTag, LogType, ShipperError};
pub use logger::{
    FormatterKeys, JsonStringLogMessageFormatter, Log, LogMessageFormatter, Logger,
    RedactionRule, RedactionSanitizer,
};
pub use sender::{DeliveryOutcome, LogTransport, TransportError, TransportFactory};
pub use sinks::{CustomDestinationSender, LogDestination};
pub use timer::{RepeatingTimer, TimerState};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
