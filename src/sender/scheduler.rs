use super::{DeliveryOutcome, TransportError};
use crate::domain::{LogEntry, LogTag};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

/// Delivers a single entry.
pub type SendFn =
    Arc<dyn Fn(LogEntry) -> BoxFuture<'static, Result<(), TransportError>> + Send + Sync>;

/// Runs one send per entry and collects the failures.
#[async_trait]
pub trait SendScheduling: Send + Sync {
    /// Resolves once every send has finished. Every tag whose send failed,
    /// for whatever reason, is in the outcome.
    async fn schedule_send(
        &self,
        logs: &BTreeMap<LogTag, LogEntry>,
        send: SendFn,
    ) -> DeliveryOutcome;
}

/// Spawns every send as its own task and waits for all of them.
#[derive(Debug, Default, Clone, Copy)]
pub struct FanOutScheduler;

impl FanOutScheduler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SendScheduling for FanOutScheduler {
    async fn schedule_send(
        &self,
        logs: &BTreeMap<LogTag, LogEntry>,
        send: SendFn,
    ) -> DeliveryOutcome {
        let mut tasks = JoinSet::new();
        let mut pending: BTreeSet<LogTag> = logs.keys().copied().collect();

        // Spawned in ascending tag order.
        for (tag, entry) in logs {
            let tag = *tag;
            let delivery = send(entry.clone());
            tasks.spawn(async move { (tag, AssertUnwindSafe(delivery).catch_unwind().await) });
        }

        let mut outcome = DeliveryOutcome::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((tag, result)) => {
                    pending.remove(&tag);
                    match result {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            outcome.insert(tag, e);
                        }
                        Err(_) => {
                            outcome.insert(
                                tag,
                                TransportError::TaskFailed("send task panicked".to_string()),
                            );
                        }
                    }
                }
                Err(e) => warn!("Send task could not be joined: {}", e),
            }
        }

        for tag in pending {
            outcome.insert(tag, TransportError::TaskFailed("send task aborted".to_string()));
        }
        outcome
    }
}
