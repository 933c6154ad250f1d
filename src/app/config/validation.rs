use super::{ConfigError, Configuration};
use url::Url;

impl Configuration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sending_interval.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Sending interval must be greater than 0".to_string(),
            ));
        }

        if !self.logstash_logging_enabled {
            return Ok(());
        }

        if self.logstash_timeout.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Logstash timeout must be greater than 0".to_string(),
            ));
        }

        if self.logstash_over_http {
            let endpoint = self.http_endpoint();
            let url = Url::parse(&endpoint).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid HTTP endpoint '{endpoint}': {e}"))
            })?;
            if url.host_str().is_none_or(str::is_empty) {
                return Err(ConfigError::InvalidUrl(format!(
                    "HTTP endpoint '{endpoint}' has no host"
                )));
            }
        } else if self.logstash_host.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Logstash host must be set when logstash logging is enabled".to_string(),
            ));
        }

        if let Some(identity) = &self.client_certificate {
            if identity.cert_path.as_os_str().is_empty() || identity.key_path.as_os_str().is_empty()
            {
                return Err(ConfigError::InvalidConfig(
                    "Client certificate requires both a certificate and a key path".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::ClientIdentity;
    use std::path::PathBuf;
    use std::time::Duration;

    fn socket_config() -> Configuration {
        Configuration {
            logstash_host: "logs.example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_socket_config() {
        assert!(socket_config().validate().is_ok());
    }

    #[test]
    fn test_empty_host_is_rejected() {
        let config = Configuration::default();

        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_host_allowed_without_logstash() {
        let config = Configuration {
            logstash_logging_enabled: false,
            ..Default::default()
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_durations_are_rejected() {
        let config = Configuration {
            sending_interval: Duration::ZERO,
            ..socket_config()
        };
        assert!(config.validate().is_err());

        let config = Configuration {
            logstash_timeout: Duration::ZERO,
            ..socket_config()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_http_endpoint_is_rejected() {
        let config = Configuration {
            logstash_over_http: true,
            logstash_http_endpoint: Some("not a url".to_string()),
            ..socket_config()
        };

        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_http_without_host_is_rejected() {
        let config = Configuration {
            logstash_over_http: true,
            ..Default::default()
        };

        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_client_certificate_without_key_is_rejected() {
        let config = Configuration {
            client_certificate: Some(ClientIdentity {
                cert_path: PathBuf::from("/etc/rask/client.pem"),
                key_path: PathBuf::new(),
            }),
            ..socket_config()
        };

        assert!(config.validate().is_err());
    }
}
