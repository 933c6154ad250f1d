pub mod serde_helpers;
mod validation;

use crate::sender::{ClientIdentity, HttpTransportConfig, SocketTransportConfig, TlsSettings};
use serde::{Deserialize, Serialize};
use serde_helpers::{load_env_flag, load_env_millis, load_env_opt, load_env_var};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

pub const DEFAULT_LOG_FILE_NAME: &str = "rask-log-shipper.log";

/// Settings of a [`Logger`](crate::Logger) and its sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Period of the automatic flush.
    #[serde(with = "serde_helpers")]
    pub sending_interval: Duration,

    // file
    pub log_file_name: String,
    pub log_file_directory: PathBuf,

    // logstash
    pub allow_untrusted_server: bool,
    pub logstash_host: String,
    pub logstash_port: u16,
    /// Connect, handshake and per-write timeout.
    #[serde(with = "serde_helpers")]
    pub logstash_timeout: Duration,
    pub log_logstash_socket_activity: bool,
    /// Injected as `token` into every shipped entry.
    pub logzio_token: Option<String>,
    pub logstash_over_http: bool,
    /// Base URL for the HTTP transport. Defaults to `https://<logstash_host>`.
    pub logstash_http_endpoint: Option<String>,
    /// Socket transport only; HTTP follows the endpoint scheme.
    pub use_tls: bool,
    pub ca_certificate_path: Option<PathBuf>,
    pub client_certificate: Option<ClientIdentity>,

    // destinations
    pub console_logging_enabled: bool,
    pub file_logging_enabled: bool,
    pub logstash_logging_enabled: bool,
    pub custom_logging_enabled: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            sending_interval: Duration::from_secs(5),
            log_file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            log_file_directory: std::env::temp_dir(),
            allow_untrusted_server: false,
            logstash_host: String::new(),
            logstash_port: 9300,
            logstash_timeout: Duration::from_secs(20),
            log_logstash_socket_activity: false,
            logzio_token: None,
            logstash_over_http: false,
            logstash_http_endpoint: None,
            use_tls: true,
            ca_certificate_path: None,
            client_certificate: None,
            console_logging_enabled: true,
            file_logging_enabled: true,
            logstash_logging_enabled: true,
            custom_logging_enabled: true,
        }
    }
}

impl Configuration {
    /// Loads a TOML file. Missing keys take their default value.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Defaults overridden by `RASK_LOGSTASH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        load_env_millis("RASK_LOGSTASH_SENDING_INTERVAL_MS", &mut self.sending_interval)?;
        load_env_var("RASK_LOGSTASH_LOG_FILE", &mut self.log_file_name)?;
        load_env_var("RASK_LOGSTASH_LOG_DIR", &mut self.log_file_directory)?;

        load_env_flag("RASK_LOGSTASH_ALLOW_UNTRUSTED", &mut self.allow_untrusted_server)?;
        load_env_var("RASK_LOGSTASH_HOST", &mut self.logstash_host)?;
        load_env_var("RASK_LOGSTASH_PORT", &mut self.logstash_port)?;
        load_env_millis("RASK_LOGSTASH_TIMEOUT_MS", &mut self.logstash_timeout)?;
        load_env_flag("RASK_LOGSTASH_LOG_ACTIVITY", &mut self.log_logstash_socket_activity)?;
        load_env_opt("RASK_LOGSTASH_TOKEN", &mut self.logzio_token)?;
        load_env_flag("RASK_LOGSTASH_OVER_HTTP", &mut self.logstash_over_http)?;
        load_env_opt("RASK_LOGSTASH_HTTP_ENDPOINT", &mut self.logstash_http_endpoint)?;
        load_env_flag("RASK_LOGSTASH_USE_TLS", &mut self.use_tls)?;
        load_env_opt("RASK_LOGSTASH_CA_CERT", &mut self.ca_certificate_path)?;

        let mut cert_path = None;
        let mut key_path = None;
        load_env_opt("RASK_LOGSTASH_CLIENT_CERT", &mut cert_path)?;
        load_env_opt("RASK_LOGSTASH_CLIENT_KEY", &mut key_path)?;
        match (cert_path, key_path) {
            (Some(cert_path), Some(key_path)) => {
                self.client_certificate = Some(ClientIdentity {
                    cert_path,
                    key_path,
                });
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::EnvError(
                    "RASK_LOGSTASH_CLIENT_CERT and RASK_LOGSTASH_CLIENT_KEY must be set together"
                        .to_string(),
                ));
            }
        }

        load_env_flag("RASK_LOGSTASH_CONSOLE", &mut self.console_logging_enabled)?;
        load_env_flag("RASK_LOGSTASH_FILE", &mut self.file_logging_enabled)?;
        load_env_flag("RASK_LOGSTASH_ENABLED", &mut self.logstash_logging_enabled)?;
        load_env_flag("RASK_LOGSTASH_CUSTOM", &mut self.custom_logging_enabled)?;
        Ok(())
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.log_file_directory.join(&self.log_file_name)
    }

    pub fn http_endpoint(&self) -> String {
        self.logstash_http_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.logstash_host))
    }

    pub fn tls_settings(&self) -> TlsSettings {
        TlsSettings {
            allow_untrusted_server: self.allow_untrusted_server,
            ca_certificate_path: self.ca_certificate_path.clone(),
            client_identity: self.client_certificate.clone(),
        }
    }

    pub fn socket_config(&self) -> SocketTransportConfig {
        SocketTransportConfig {
            host: self.logstash_host.clone(),
            port: self.logstash_port,
            timeout: self.logstash_timeout,
            log_activity: self.log_logstash_socket_activity,
        }
    }

    pub fn http_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            endpoint: self.http_endpoint(),
            timeout: self.logstash_timeout,
            allow_untrusted_server: self.allow_untrusted_server,
            log_activity: self.log_logstash_socket_activity,
        }
    }
}
