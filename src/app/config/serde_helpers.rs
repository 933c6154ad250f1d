//! Millisecond durations for serde, and `RASK_LOGSTASH_*` loaders.
//!
//! Every loader leaves its target untouched when the variable is unset.

use super::ConfigError;
use serde::{Deserialize, Deserializer, Serializer};
use std::str::FromStr;
use std::time::Duration;

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

fn parse_env<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::EnvError(format!("Invalid {name}={value:?}: {e}")))
}

/// Ports, hosts, paths: anything with a `FromStr`.
pub fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = parse_env(name, &value)?;
    }
    Ok(())
}

pub fn load_env_opt<T>(name: &str, target: &mut Option<T>) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = Some(parse_env(name, &value)?);
    }
    Ok(())
}

pub fn load_env_millis(name: &str, target: &mut Duration) -> Result<(), ConfigError> {
    if let Ok(value) = std::env::var(name) {
        *target = Duration::from_millis(parse_env(name, &value)?);
    }
    Ok(())
}

/// Accepts `true/false`, `1/0`, `yes/no` and `on/off`.
pub fn load_env_flag(name: &str, target: &mut bool) -> Result<(), ConfigError> {
    let Ok(value) = std::env::var(name) else {
        return Ok(());
    };
    *target = match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => {
            return Err(ConfigError::EnvError(format!(
                "Invalid {name}={value:?}: expected a boolean"
            )));
        }
    };
    Ok(())
}
