use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier assigned to an entry when it enters the buffer.
///
/// Correlates a buffered entry with its slot in a [`DeliveryOutcome`](crate::DeliveryOutcome).
pub type LogTag = u64;

/// Key under which the upstream authentication token is injected.
pub const TOKEN_KEY: &str = "token";

/// A flattened key-value log payload, ready to be shipped to the collector.
///
/// Values are scalars (string, number, bool) or strings holding a serialized
/// array. Entries are never mutated once handed to the destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogEntry(Map<String, Value>);

impl LogEntry {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps an already-flat map without touching its values.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Builds an entry from an arbitrary JSON object.
    ///
    /// Nested objects are merged into the top level (inner keys win on
    /// conflict), arrays are stored as their JSON text and nulls are dropped.
    pub fn flattened(map: Map<String, Value>) -> Self {
        let mut flat = Map::new();
        flatten_into(&mut flat, map);
        Self(flat)
    }

    /// Sets the `token` field when a token is configured.
    pub fn with_token(mut self, token: Option<&str>) -> Self {
        if let Some(token) = token {
            self.0
                .insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        }
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for LogEntry {
    fn from(map: Map<String, Value>) -> Self {
        Self::flattened(map)
    }
}

fn flatten_into(target: &mut Map<String, Value>, source: Map<String, Value>) {
    let mut nested = Vec::new();
    for (key, value) in source {
        match value {
            Value::Object(inner) => nested.push(inner),
            Value::Array(items) => {
                let text = Value::Array(items).to_string();
                target.insert(key, Value::String(text));
            }
            Value::Null => {}
            scalar => {
                target.insert(key, scalar);
            }
        }
    }
    // Merged after the scalars so that inner keys win.
    for inner in nested {
        flatten_into(target, inner);
    }
}
