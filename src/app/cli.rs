use super::config::{ConfigError, Configuration};
use super::logging_system::DiagnosticsFormat;
use clap::Parser;
use std::path::PathBuf;

/// Ships lines read from stdin to a Logstash-compatible collector.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (TOML). Environment variables are used when absent.
    #[arg(long, env = "RASK_LOGSTASH_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Collector host
    #[arg(long)]
    pub host: Option<String>,

    /// Collector port
    #[arg(long)]
    pub port: Option<u16>,

    /// Send each entry as an HTTP POST instead of over a socket
    #[arg(long)]
    pub over_http: bool,

    /// Use a plain TCP socket instead of TLS
    #[arg(long)]
    pub plain: bool,

    /// Accept self-signed or otherwise untrusted collector certificates
    #[arg(long)]
    pub allow_untrusted: bool,

    /// Token injected into every entry
    #[arg(long, env = "RASK_LOGSTASH_TOKEN")]
    pub token: Option<String>,

    /// Do not echo logs to stdout
    #[arg(long)]
    pub quiet: bool,

    /// Level of the shipper's own diagnostics
    #[arg(long, env = "RASK_LOGSTASH_DIAGNOSTICS_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Format of the shipper's own diagnostics
    #[arg(long, value_enum, default_value_t = DiagnosticsFormat::Compact)]
    pub log_format: DiagnosticsFormat,
}

impl Args {
    /// Configuration file or environment, overridden by the flags given.
    pub fn configuration(&self) -> Result<Configuration, ConfigError> {
        let mut config = match &self.config_file {
            Some(path) => Configuration::from_file(path)?,
            None => Configuration::from_env()?,
        };

        if let Some(host) = &self.host {
            config.logstash_host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.logstash_port = port;
        }
        if self.over_http {
            config.logstash_over_http = true;
        }
        if self.plain {
            config.use_tls = false;
        }
        if self.allow_untrusted {
            config.allow_untrusted_server = true;
        }
        if self.token.is_some() {
            config.logzio_token.clone_from(&self.token);
        }
        if self.quiet {
            config.console_logging_enabled = false;
        }
        // The demo has no custom sender and keeps no log file.
        config.custom_logging_enabled = false;
        config.file_logging_enabled = false;

        config.validate()?;
        Ok(config)
    }
}
