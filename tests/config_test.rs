use rask_log_shipper::Configuration;
use rask_log_shipper::app::ConfigError;
use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

const ENV_VARS: &[&str] = &[
    "RASK_LOGSTASH_SENDING_INTERVAL_MS",
    "RASK_LOGSTASH_HOST",
    "RASK_LOGSTASH_PORT",
    "RASK_LOGSTASH_TIMEOUT_MS",
    "RASK_LOGSTASH_TOKEN",
    "RASK_LOGSTASH_OVER_HTTP",
    "RASK_LOGSTASH_HTTP_ENDPOINT",
    "RASK_LOGSTASH_CLIENT_CERT",
    "RASK_LOGSTASH_CLIENT_KEY",
    "RASK_LOGSTASH_CONSOLE",
];

fn clear_env() {
    for name in ENV_VARS {
        // SAFETY: env tests are serialized with #[serial]
        unsafe { std::env::remove_var(name) };
    }
}

fn set_env(name: &str, value: &str) {
    // SAFETY: env tests are serialized with #[serial]
    unsafe { std::env::set_var(name, value) };
}

#[test]
fn test_file_overrides_only_given_keys() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
sending_interval = 2500
logstash_host = "collector.internal"
logstash_port = 5044
logzio_token = "abc"
file_logging_enabled = false

[client_certificate]
cert_path = "/etc/rask/client.pem"
key_path = "/etc/rask/client.key"
"#
    )
    .unwrap();

    let config = Configuration::from_file(file.path()).unwrap();

    assert_eq!(config.sending_interval, Duration::from_millis(2500));
    assert_eq!(config.logstash_host, "collector.internal");
    assert_eq!(config.logstash_port, 5044);
    assert_eq!(config.logzio_token.as_deref(), Some("abc"));
    assert!(!config.file_logging_enabled);
    assert_eq!(
        config.client_certificate.unwrap().key_path,
        PathBuf::from("/etc/rask/client.key")
    );
    // untouched defaults
    assert_eq!(config.logstash_timeout, Duration::from_secs(20));
    assert!(config.use_tls);
}

#[test]
fn test_malformed_file_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "logstash_port = \"not a port\"").unwrap();

    let result = Configuration::from_file(file.path());

    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_missing_file_is_rejected() {
    let result = Configuration::from_file(std::path::Path::new("/nonexistent/rask.toml"));

    assert!(matches!(result, Err(ConfigError::FileError(_))));
}

#[test]
#[serial]
fn test_env_overrides_defaults() {
    clear_env();
    set_env("RASK_LOGSTASH_HOST", "env-host");
    set_env("RASK_LOGSTASH_PORT", "6514");
    set_env("RASK_LOGSTASH_TIMEOUT_MS", "1500");
    set_env("RASK_LOGSTASH_OVER_HTTP", "true");
    set_env("RASK_LOGSTASH_CONSOLE", "false");

    let config = Configuration::from_env().unwrap();
    clear_env();

    assert_eq!(config.logstash_host, "env-host");
    assert_eq!(config.logstash_port, 6514);
    assert_eq!(config.logstash_timeout, Duration::from_millis(1500));
    assert!(config.logstash_over_http);
    assert!(!config.console_logging_enabled);
    assert_eq!(config.http_endpoint(), "https://env-host");
}

#[test]
#[serial]
fn test_invalid_env_value_is_rejected() {
    clear_env();
    set_env("RASK_LOGSTASH_PORT", "ninety");

    let result = Configuration::from_env();
    clear_env();

    assert!(matches!(result, Err(ConfigError::EnvError(_))));
}

#[test]
#[serial]
fn test_client_cert_requires_key() {
    clear_env();
    set_env("RASK_LOGSTASH_CLIENT_CERT", "/etc/rask/client.pem");

    let result = Configuration::from_env();
    clear_env();

    assert!(matches!(result, Err(ConfigError::EnvError(_))));
}
