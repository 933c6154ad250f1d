pub mod cli;
pub mod config;
pub mod logging_system;

pub use cli::Args;
pub use config::{ConfigError, Configuration};
pub use logging_system::{DiagnosticsFormat, init_diagnostics};
