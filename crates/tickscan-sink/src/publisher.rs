//! Bounded fan-out of stream messages to a sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{StreamMessage, StreamSink};

/// Publisher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    /// Messages accepted into the queue.
    pub queued: u64,
    /// Messages dropped because the queue was full or closed.
    pub dropped: u64,
    /// Messages the sink accepted.
    pub published: u64,
    /// Messages the sink rejected.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    dropped: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PublisherStats {
        PublisherStats {
            queued: self.queued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Fixed-capacity queue drained by a fixed pool of worker tasks.
///
/// [`StreamPublisher::offer`] never waits: when the queue is full the
/// message is dropped and counted, so a slow sink cannot grow memory.
#[derive(Debug)]
pub struct StreamPublisher {
    sender: Option<mpsc::Sender<StreamMessage>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl StreamPublisher {
    /// Spawns `workers` tasks draining a queue of `capacity` messages into `sink`.
    ///
    /// Both sizes are raised to at least one. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn spawn(sink: Arc<dyn StreamSink>, capacity: usize, workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let workers = (0..workers.max(1))
            .map(|worker| {
                let sink = Arc::clone(&sink);
                let receiver = Arc::clone(&receiver);
                let counters = Arc::clone(&counters);
                tokio::spawn(async move {
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(message) = next else {
                            break;
                        };
                        match sink.publish(&message).await {
                            Ok(()) => {
                                counters.published.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                counters.failed.fetch_add(1, Ordering::Relaxed);
                                warn!(sink = sink.name(), symbol = %message.symbol, error = %e, "stream publish failed");
                            }
                        }
                    }
                    debug!(worker, "stream worker stopped");
                })
            })
            .collect();

        Self {
            sender: Some(sender),
            workers,
            counters,
        }
    }

    /// Queues a message without waiting.
    ///
    /// Returns `false` if the message was dropped.
    pub fn offer(&self, message: StreamMessage) -> bool {
        let accepted = self
            .sender
            .as_ref()
            .is_some_and(|sender| sender.try_send(message).is_ok());
        let counter = if accepted {
            &self.counters.queued
        } else {
            &self.counters.dropped
        };
        counter.fetch_add(1, Ordering::Relaxed);
        accepted
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> PublisherStats {
        self.counters.snapshot()
    }

    /// Closes the queue, lets the workers drain it, and waits for them.
    pub async fn shutdown(mut self) -> PublisherStats {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if let Err(e) = worker.await {
                warn!(error = %e, "stream worker panicked");
            }
        }
        let stats = self.counters.snapshot();
        debug!(?stats, "stream publisher shut down");
        stats
    }
}
