use super::{Transform, TransportError};
use crate::domain::LogEntry;
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;

/// Serializes an entry as one line of newline-delimited JSON.
pub fn serialize_ndjson(entry: &LogEntry) -> Result<Bytes, TransportError> {
    let json = serde_json::to_vec(entry)
        .map_err(|e| TransportError::Serialization(e.to_string()))?;

    let mut buf = BytesMut::with_capacity(json.len() + 1);
    buf.put_slice(&json);
    buf.put_u8(b'\n');
    Ok(buf.freeze())
}

/// The transform used for both the socket and the HTTP transports.
pub fn ndjson_transform() -> Transform {
    Arc::new(serialize_ndjson)
}
