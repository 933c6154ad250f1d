// Socket transport against a local plain-TCP listener
mod common;

use bytes::Bytes;
use common::message_entry;
use rask_log_shipper::sender::{SocketTransport, SocketTransportConfig, Transform, ndjson_transform};
use rask_log_shipper::{LogEntry, LogTag, LogTransport, TransportError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;

fn config(port: u16) -> SocketTransportConfig {
    SocketTransportConfig {
        host: "127.0.0.1".to_string(),
        port,
        timeout: Duration::from_secs(2),
        log_activity: true,
    }
}

fn logs(messages: &[&str]) -> BTreeMap<LogTag, LogEntry> {
    messages
        .iter()
        .enumerate()
        .map(|(i, message)| (i as LogTag + 1, message_entry(message)))
        .collect()
}

#[tokio::test]
async fn test_entries_arrive_as_ndjson_in_tag_order() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        let mut received = Vec::new();
        while received.len() < 3 {
            match lines.next_line().await.unwrap() {
                Some(line) => received.push(line),
                None => break,
            }
        }
        received
    });

    let transport = SocketTransport::new(config(port), None);
    let outcome = transport
        .send_logs(&logs(&["first", "second", "third"]), &ndjson_transform())
        .await;
    assert!(outcome.is_empty());

    let received = server.await.unwrap();
    let messages: Vec<String> = received
        .iter()
        .map(|line| {
            let value: Value = serde_json::from_str(line).unwrap();
            value["message"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(messages, vec!["first", "second", "third"]);
}

/// Accepts one connection, reads its first line and closes it.
async fn first_line(listener: &TcpListener) -> String {
    let (stream, _) = listener.accept().await.unwrap();
    let mut lines = BufReader::new(stream).lines();
    lines.next_line().await.unwrap().unwrap_or_default()
}

fn message(line: &str) -> String {
    let value: Value = serde_json::from_str(line).unwrap();
    value["message"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_each_batch_opens_a_new_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    // The collector closes every connection after one line.
    let server = tokio::spawn(async move {
        vec![first_line(&listener).await, first_line(&listener).await]
    });

    let transport = SocketTransport::new(config(port), None);
    let transform = ndjson_transform();
    assert!(transport.send_logs(&logs(&["a"]), &transform).await.is_empty());
    tokio::time::sleep(Duration::from_millis(200)).await;
    let second: BTreeMap<LogTag, LogEntry> = [(2, message_entry("b"))].into();
    assert!(transport.send_logs(&second, &transform).await.is_empty());

    let received = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("second batch never reached the collector")
        .unwrap();
    let messages: Vec<String> = received.iter().map(|line| message(line)).collect();
    assert_eq!(messages, vec!["a", "b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reconnects_when_collector_closes_mid_batch() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let mut received = vec![first_line(&listener).await];
        let (stream, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        while let Some(line) = lines.next_line().await.unwrap() {
            received.push(line);
        }
        received
    });

    // Gives the collector time to close before the second entry is written.
    let slow: Transform = {
        let ndjson = ndjson_transform();
        Arc::new(move |entry: &LogEntry| {
            if entry.get("message").and_then(Value::as_str) == Some("b") {
                std::thread::sleep(Duration::from_millis(300));
            }
            ndjson(entry)
        })
    };

    let transport = SocketTransport::new(config(port), None);
    let outcome = transport.send_logs(&logs(&["a", "b", "c"]), &slow).await;
    assert!(outcome.is_empty());

    let received = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    let messages: Vec<String> = received.iter().map(|line| message(line)).collect();
    assert_eq!(messages, vec!["a", "b", "c"]);
}

/// Serializes entries whose message is `huge` to a payload larger than any
/// socket buffer.
fn oversized_transform() -> Transform {
    let ndjson = ndjson_transform();
    Arc::new(move |entry: &LogEntry| {
        if entry.get("message").and_then(Value::as_str) == Some("huge") {
            return Ok(Bytes::from(vec![b'x'; 64 * 1024 * 1024]));
        }
        ndjson(entry)
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_write_to_stalled_collector_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    // Accepts but never reads.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(stream);
    });

    let transport = SocketTransport::new(
        SocketTransportConfig {
            timeout: Duration::from_millis(500),
            ..config(port)
        },
        None,
    );
    let outcome = transport
        .send_logs(&logs(&["huge"]), &oversized_transform())
        .await;

    assert_eq!(
        outcome.get(&1),
        Some(&TransportError::Timeout(Duration::from_millis(500)))
    );
    server.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_write_only_fails_its_own_entry() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        // Reads the first line, then stalls that connection.
        let (stalled, _) = listener.accept().await.unwrap();
        let mut stalled = BufReader::new(stalled);
        let mut first = String::new();
        stalled.read_line(&mut first).await.unwrap();

        let (stream, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        let mut received = vec![first.trim_end().to_string()];
        while let Some(line) = lines.next_line().await.unwrap() {
            received.push(line);
        }
        drop(stalled);
        received
    });

    let transport = SocketTransport::new(
        SocketTransportConfig {
            timeout: Duration::from_millis(500),
            ..config(port)
        },
        None,
    );
    let outcome = transport
        .send_logs(&logs(&["a", "huge", "c"]), &oversized_transform())
        .await;

    assert_eq!(outcome.keys().copied().collect::<Vec<_>>(), vec![2]);
    assert!(matches!(outcome[&2], TransportError::Timeout(_)));

    let received = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    let messages: Vec<String> = received.iter().map(|line| message(line)).collect();
    assert_eq!(messages, vec!["a", "c"]);
}

#[tokio::test]
async fn test_refused_connection_fails_every_entry() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let transport = SocketTransport::new(config(port), None);
    let outcome = transport
        .send_logs(&logs(&["a", "b", "c"]), &ndjson_transform())
        .await;

    assert_eq!(outcome.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(
        outcome
            .values()
            .all(|e| matches!(e, TransportError::Connection(_) | TransportError::Timeout(_)))
    );
}

#[tokio::test]
async fn test_cancelled_transport_sends_nothing() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let transport = SocketTransport::new(config(port), None);
    transport.cancel();
    let outcome = transport
        .send_logs(&logs(&["a", "b"]), &ndjson_transform())
        .await;

    assert!(transport.is_cancelled());
    assert_eq!(outcome.len(), 2);
    assert!(outcome.values().all(|e| *e == TransportError::Cancelled));
}
