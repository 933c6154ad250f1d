//! Domain layer for rask-log-shipper.
//!
//! Contains the canonical types shared across all modules:
//! - `LogEntry`: a flattened key-value log payload, immutable once buffered
//! - `LogTag`: the identifier correlating a buffered entry with its delivery outcome
//! - `LogType`: log severity (verbose/debug/info/warning/error)
//! - `LogError`: an error chain rendered for shipping
//! - `ShipperError`: top-level contract violations

pub mod error;
pub mod log_entry;
pub mod log_error;
pub mod log_type;

pub use error::ShipperError;
pub use log_entry::{LogEntry, LogTag};
pub use log_error::LogError;
pub use log_type::LogType;
