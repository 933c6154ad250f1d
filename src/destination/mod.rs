//! Delivery coordinator.
//!
//! A single actor task owns the buffer. Appends, flushes, cancels and the
//! merge-back of failed entries are all messages to that task, so they never
//! interleave. Network work runs in tasks spawned per flush cycle.

pub mod writer;

use crate::buffer::{LogBuffer, TagAllocator};
use crate::domain::{LogEntry, LogTag, ShipperError};
use crate::sender::{Transform, TransportError, TransportFactory, ndjson_transform};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub use writer::{LogstashWriter, WriteResult};

type FlushReply = oneshot::Sender<Result<(), TransportError>>;

enum Command {
    Append { tag: LogTag, entry: LogEntry },
    Flush { reply: FlushReply },
    Cancel,
    Inspect { reply: oneshot::Sender<BTreeMap<LogTag, LogEntry>> },
}

struct Completion {
    generation: u64,
    result: WriteResult,
    reply: FlushReply,
}

/// Resolves exactly once with the outcome of one flush cycle.
///
/// Dropping the receipt does not stop the flush.
#[derive(Debug)]
#[must_use = "a flush runs regardless; await the receipt to observe its outcome"]
pub struct FlushReceipt {
    inner: oneshot::Receiver<Result<(), TransportError>>,
}

impl FlushReceipt {
    /// A receipt that is already resolved.
    pub fn ready(result: Result<(), TransportError>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { inner: rx }
    }
}

impl Future for FlushReceipt {
    type Output = Result<(), TransportError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(TransportError::Cancelled)))
    }
}

/// Handle to the delivery coordinator. Cheap to clone; the actor stops once
/// every handle is dropped.
#[derive(Clone)]
pub struct LogstashDestination {
    commands: mpsc::UnboundedSender<Command>,
    tags: Arc<TagAllocator>,
}

impl LogstashDestination {
    /// Spawns the coordinator on the current Tokio runtime, serializing
    /// entries as newline-delimited JSON.
    pub fn new(factory: TransportFactory, log_activity: bool) -> Result<Self, ShipperError> {
        Self::with_transform(factory, ndjson_transform(), log_activity)
    }

    pub fn with_transform(
        factory: TransportFactory,
        transform: Transform,
        log_activity: bool,
    ) -> Result<Self, ShipperError> {
        let handle = Handle::try_current().map_err(|e| ShipperError::Runtime(e.to_string()))?;

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (completions, completion_rx) = mpsc::unbounded_channel();
        let writer = Arc::new(LogstashWriter::new(factory(), transform.clone(), log_activity));

        let actor = DestinationActor {
            buffer: LogBuffer::new(),
            writer,
            factory,
            transform,
            generation: 0,
            completions,
            log_activity,
        };
        handle.spawn(actor.run(command_rx, completion_rx));

        Ok(Self {
            commands,
            tags: Arc::new(TagAllocator::new()),
        })
    }

    /// Buffers an entry for the next flush and returns its tag.
    pub fn append(&self, entry: LogEntry) -> LogTag {
        let tag = self.tags.next_tag();
        if self.commands.send(Command::Append { tag, entry }).is_err() {
            warn!("Logstash destination stopped, dropping entry {}", tag);
        }
        tag
    }

    /// Sends everything currently buffered.
    pub fn flush(&self) -> FlushReceipt {
        let (reply, inner) = oneshot::channel();
        // A closed channel drops the reply, which resolves the receipt as cancelled.
        let _ = self.commands.send(Command::Flush { reply });
        FlushReceipt { inner }
    }

    /// Drops every buffered and in-flight entry and replaces the transport.
    pub fn cancel(&self) {
        let _ = self.commands.send(Command::Cancel);
    }

    /// Entries waiting in the buffer, in tag order. Entries of an in-flight
    /// cycle are not included.
    pub async fn pending_logs(&self) -> BTreeMap<LogTag, LogEntry> {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Inspect { reply }).is_err() {
            return BTreeMap::new();
        }
        rx.await.unwrap_or_default()
    }
}

struct DestinationActor {
    buffer: LogBuffer,
    writer: Arc<LogstashWriter>,
    factory: TransportFactory,
    transform: Transform,
    /// Bumped on cancel so that late completions are not merged back.
    generation: u64,
    completions: mpsc::UnboundedSender<Completion>,
    log_activity: bool,
}

impl DestinationActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(completion) = completions.recv() => self.complete(completion),
            }
        }

        debug!("Logstash destination stopped with {} unsent entries", self.buffer.len());
        self.writer.cancel();
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Append { tag, entry } => self.buffer.insert(tag, entry),
            Command::Flush { reply } => self.flush(reply),
            Command::Cancel => self.cancel(),
            Command::Inspect { reply } => {
                let _ = reply.send(self.buffer.entries().clone());
            }
        }
    }

    fn flush(&mut self, reply: FlushReply) {
        let snapshot = self.buffer.snapshot_and_clear();
        if snapshot.is_empty() {
            if self.log_activity {
                debug!("Flush requested with an empty buffer");
            }
            let _ = reply.send(Ok(()));
            return;
        }

        debug!("Flushing {} entries", snapshot.len());
        let writer = self.writer.clone();
        let completions = self.completions.clone();
        let generation = self.generation;

        tokio::spawn(async move {
            let result = writer.write(snapshot).await;
            if let Err(mpsc::error::SendError(completion)) = completions.send(Completion {
                generation,
                result,
                reply,
            }) {
                // The coordinator is gone; nothing left to merge into.
                let _ = completion.reply.send(into_flush_result(completion.result));
            }
        });
    }

    fn complete(&mut self, completion: Completion) {
        let Completion {
            generation,
            result,
            reply,
        } = completion;
        let WriteResult { unsent, error } = result;

        if generation != self.generation {
            debug!("Discarding {} unsent entries from a cancelled cycle", unsent.len());
        } else if !unsent.is_empty() {
            warn!("{} entries failed to send and will be retried", unsent.len());
            self.buffer.merge_back(unsent);
        }

        let _ = reply.send(error.map_or(Ok(()), Err));
    }

    fn cancel(&mut self) {
        debug!("Cancelling sending, discarding {} buffered entries", self.buffer.len());
        self.buffer.clear();
        self.generation += 1;
        self.writer.cancel();
        self.writer = Arc::new(LogstashWriter::new(
            (self.factory)(),
            self.transform.clone(),
            self.log_activity,
        ));
    }
}

fn into_flush_result(result: WriteResult) -> Result<(), TransportError> {
    result.error.map_or(Ok(()), Err)
}
