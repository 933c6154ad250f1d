use super::Log;
use crate::domain::LogError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Turns a [`Log`] into the string handed to every sink.
pub trait LogMessageFormatter: Send + Sync {
    fn format(&self, log: &Log) -> String;

    /// Key under which the plain message is stored, for sinks that print it alone.
    fn message_key(&self) -> &str {
        "message"
    }
}

/// Field names used by [`JsonStringLogMessageFormatter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterKeys {
    pub log_type: String,
    pub app_bundle_id: String,
    pub app_version: String,
    pub device_timestamp: String,
    pub device_type: String,
    pub error_code: String,
    pub error_domain: String,
    pub errors: String,
    pub file: String,
    pub function: String,
    pub os_version: String,
    pub line: String,
    pub message: String,
    pub metadata: String,
    pub user_info: String,
}

impl Default for FormatterKeys {
    fn default() -> Self {
        Self {
            log_type: "log_type".to_string(),
            app_bundle_id: "app_bundle_ID".to_string(),
            app_version: "app_version".to_string(),
            device_timestamp: "device_timestamp".to_string(),
            device_type: "device".to_string(),
            error_code: "error_code".to_string(),
            error_domain: "error_domain".to_string(),
            errors: "errors".to_string(),
            file: "file".to_string(),
            function: "function".to_string(),
            os_version: "os_version".to_string(),
            line: "line".to_string(),
            message: "message".to_string(),
            metadata: "metadata".to_string(),
            user_info: "user_info".to_string(),
        }
    }
}

/// Formats logs as a JSON object string.
///
/// Layout: `message`, a `metadata` object describing the call site and the
/// host, `user_info` (default metadata merged with the log's custom data,
/// only when custom data is present) and `errors` (the error chain).
#[derive(Debug, Clone, Default)]
pub struct JsonStringLogMessageFormatter {
    keys: FormatterKeys,
    default_metadata: Option<Map<String, Value>>,
    app_version: Option<String>,
    app_bundle_id: Option<String>,
}

impl JsonStringLogMessageFormatter {
    pub fn new(keys: FormatterKeys) -> Self {
        Self {
            keys,
            ..Default::default()
        }
    }

    pub fn with_default_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.default_metadata = Some(metadata);
        self
    }

    pub fn with_app_info(mut self, version: Option<String>, bundle_id: Option<String>) -> Self {
        self.app_version = version;
        self.app_bundle_id = bundle_id;
        self
    }

    pub fn keys(&self) -> &FormatterKeys {
        &self.keys
    }

    /// Formats with a fixed device timestamp.
    pub fn format_at(&self, log: &Log, now: DateTime<Utc>) -> String {
        let mut object = Map::new();
        object.insert(self.keys.message.clone(), Value::from(log.message.as_str()));
        object.insert(
            self.keys.metadata.clone(),
            Value::Object(self.metadata(log, now)),
        );

        if let Some(custom_data) = &log.custom_data {
            let mut user_info = self.default_metadata.clone().unwrap_or_default();
            user_info.insert(self.keys.log_type.clone(), Value::from(log.log_type.as_str()));
            for (key, value) in custom_data {
                user_info.insert(key.clone(), value.clone());
            }
            object.insert(self.keys.user_info.clone(), Value::Object(user_info));
        }

        if let Some(error) = &log.error {
            let errors = error
                .disassociated_chain()
                .iter()
                .map(|e| self.error_object(e))
                .collect();
            object.insert(self.keys.errors.clone(), Value::Array(errors));
        }

        Value::Object(object).to_string()
    }

    fn metadata(&self, log: &Log, now: DateTime<Utc>) -> Map<String, Value> {
        let mut metadata = Map::new();

        let file = Path::new(&log.file)
            .file_name()
            .map_or_else(|| log.file.clone(), |name| name.to_string_lossy().into_owned());
        metadata.insert(self.keys.file.clone(), Value::from(file));
        metadata.insert(self.keys.function.clone(), Value::from(log.function.as_str()));
        metadata.insert(self.keys.line.clone(), Value::from(log.line.to_string()));

        if let Some(version) = &self.app_version {
            metadata.insert(self.keys.app_version.clone(), Value::from(version.as_str()));
        }
        metadata.insert(
            self.keys.os_version.clone(),
            Value::from(format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)),
        );
        if let Ok(host) = hostname::get() {
            metadata.insert(
                self.keys.device_type.clone(),
                Value::from(host.to_string_lossy().into_owned()),
            );
        }
        if let Some(bundle_id) = &self.app_bundle_id {
            metadata.insert(self.keys.app_bundle_id.clone(), Value::from(bundle_id.as_str()));
        }
        let seconds = now.timestamp_millis() as f64 / 1000.0;
        metadata.insert(
            self.keys.device_timestamp.clone(),
            Value::from(seconds.to_string()),
        );

        metadata
    }

    fn error_object(&self, error: &LogError) -> Value {
        let mut object = Map::new();
        object.insert(self.keys.error_domain.clone(), Value::from(error.domain.as_str()));
        object.insert(self.keys.error_code.clone(), Value::from(error.code));
        object.insert(
            self.keys.user_info.clone(),
            Value::Object(error.user_info.clone()),
        );
        Value::Object(object)
    }
}

impl LogMessageFormatter for JsonStringLogMessageFormatter {
    fn format(&self, log: &Log) -> String {
        self.format_at(log, Utc::now())
    }

    fn message_key(&self) -> &str {
        &self.keys.message
    }
}
