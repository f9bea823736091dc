//! Output batching for high-throughput byte streams.

use std::time::Duration;

use tokio::time::Instant;

/// Buffers output chunks and releases them as one batch per flush window.
///
/// The first chunk after a flush arms the timer; later chunks join the same
/// batch. Chunks are concatenated in enqueue order and nothing is dropped.
#[derive(Debug)]
pub struct OutputCoalescer {
    interval: Duration,
    buffer: String,
    deadline: Option<Instant>,
}

impl OutputCoalescer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            buffer: String::new(),
            deadline: None,
        }
    }

    /// Add a chunk, scheduling a flush if none is pending.
    pub fn enqueue(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.buffer.push_str(chunk);
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.interval);
        }
    }

    /// Whether a flush is scheduled.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Take the buffered batch immediately, clearing the pending flush.
    pub fn take(&mut self) -> Option<String> {
        self.deadline = None;
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    /// Wait for the scheduled flush and return its batch.
    ///
    /// Never resolves while nothing is pending, so it can sit in a `select!`
    /// next to the read loop. Cancel-safe: dropping the future loses nothing.
    pub async fn ready(&mut self) -> String {
        loop {
            match self.deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(deadline).await;
                    if let Some(batch) = self.take() {
                        return batch;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        }
    }
}
