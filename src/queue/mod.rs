//! Handoff queues between pipeline stages.
//!
//! This module provides the [`HandoffQueue`] trait: an unbounded FIFO with a
//! blocking pop and a shutdown flag. Once a queue is shut down and empty,
//! [`HandoffQueue::pop_blocking`] returns [`Pop::Exhausted`] instead of
//! blocking, which is how worker loops learn that they are done.
//!
//! # Built-in Implementations
//!
//! - [`StageQueue`]: mutex + condition variable monitor (default)
//! - [`ChannelStageQueue`]: crossbeam channel with a shutdown broadcast
//!
//! Pick one at runtime with [`QueueBackend::create`].
//!
//! # Example
//!
//! ```rust
//! use kitchen_pipeline::queue::{HandoffQueue, Pop, StageQueue};
//!
//! let queue = StageQueue::new();
//! queue.push("margarita");
//! queue.shutdown();
//!
//! // Items pushed before shutdown still drain
//! assert_eq!(queue.pop_blocking(), Pop::Item("margarita"));
//! assert_eq!(queue.pop_blocking(), Pop::Exhausted);
//! ```

mod channel;
mod stage;

pub use channel::ChannelStageQueue;
pub use stage::StageQueue;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::{PipelineError, Result};

/// Outcome of a blocking pop.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Pop<T> {
    /// The head of the queue
    Item(T),
    /// The queue is shut down and empty; it will never yield again
    Exhausted,
}

impl<T> Pop<T> {
    /// Convert into an `Option`, mapping `Exhausted` to `None`.
    pub fn into_item(self) -> Option<T> {
        match self {
            Pop::Item(item) => Some(item),
            Pop::Exhausted => None,
        }
    }

    /// Whether this is the terminal signal
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Pop::Exhausted)
    }
}

/// A FIFO handoff between two pipeline stages.
///
/// # Contract
///
/// - `push` never blocks on capacity and always succeeds, including after
///   `shutdown`.
/// - `pop_blocking` parks the caller until an item is available or the queue
///   is shut down and empty.
/// - `shutdown` is idempotent and wakes every blocked consumer.
///
/// All implementations must be `Send + Sync` to allow sharing across threads.
pub trait HandoffQueue<T: Send>: Send + Sync {
    /// Append an item at the tail and wake one waiting consumer.
    fn push(&self, item: T);

    /// Remove the head, blocking until one exists or the queue is exhausted.
    fn pop_blocking(&self) -> Pop<T>;

    /// Remove the head if one is present, without blocking.
    fn try_pop(&self) -> Option<T>;

    /// Stop accepting and wake every waiter.
    fn shutdown(&self);

    /// `false` once `shutdown` has been called
    fn is_accepting(&self) -> bool;

    /// Number of queued items
    fn len(&self) -> usize;

    /// Whether no items are queued
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Which implementation backs this queue
    fn backend(&self) -> QueueBackend;
}

/// Selects the [`HandoffQueue`] implementation used by the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// [`StageQueue`]
    #[default]
    Monitor,
    /// [`ChannelStageQueue`]
    Channel,
}

impl QueueBackend {
    /// Build an empty queue of this kind.
    pub fn create<T: Send + 'static>(self) -> Arc<dyn HandoffQueue<T>> {
        match self {
            QueueBackend::Monitor => Arc::new(StageQueue::new()),
            QueueBackend::Channel => Arc::new(ChannelStageQueue::new()),
        }
    }
}

impl fmt::Display for QueueBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueBackend::Monitor => write!(f, "monitor"),
            QueueBackend::Channel => write!(f, "channel"),
        }
    }
}

impl FromStr for QueueBackend {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monitor" => Ok(QueueBackend::Monitor),
            "channel" => Ok(QueueBackend::Channel),
            other => Err(PipelineError::invalid_config(
                "queue_backend",
                format!("unknown backend '{}', expected 'monitor' or 'channel'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn backends() -> [QueueBackend; 2] {
        [QueueBackend::Monitor, QueueBackend::Channel]
    }

    #[test]
    fn test_factory_reports_backend() {
        for backend in backends() {
            let queue = backend.create::<u32>();
            assert_eq!(queue.backend(), backend);
            assert!(queue.is_accepting());
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn test_fifo_for_every_backend() {
        for backend in backends() {
            let queue = backend.create::<u32>();
            for i in 0..50 {
                queue.push(i);
            }
            queue.shutdown();

            let drained: Vec<u32> = std::iter::from_fn(|| queue.pop_blocking().into_item()).collect();
            assert_eq!(drained, (0..50).collect::<Vec<_>>(), "backend {}", backend);
        }
    }

    #[test]
    fn test_shutdown_wakes_blocked_consumer() {
        for backend in backends() {
            let queue = backend.create::<u32>();
            let consumer = {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.pop_blocking())
            };

            thread::sleep(Duration::from_millis(20));
            queue.shutdown();

            assert_eq!(consumer.join().unwrap(), Pop::Exhausted, "backend {}", backend);
        }
    }

    #[test]
    fn test_push_after_shutdown_still_drains() {
        for backend in backends() {
            let queue = backend.create::<&'static str>();
            queue.shutdown();
            queue.push("late");

            assert!(!queue.is_accepting());
            assert_eq!(queue.len(), 1);
            assert_eq!(queue.pop_blocking(), Pop::Item("late"));
            assert_eq!(queue.pop_blocking(), Pop::Exhausted);
        }
    }

    #[test]
    fn test_parse_backend() {
        assert_eq!("Monitor".parse::<QueueBackend>().unwrap(), QueueBackend::Monitor);
        assert_eq!("channel".parse::<QueueBackend>().unwrap(), QueueBackend::Channel);
        assert!("ring".parse::<QueueBackend>().is_err());
    }

    #[test]
    fn test_pop_helpers() {
        assert_eq!(Pop::Item(3).into_item(), Some(3));
        assert!(Pop::<u8>::Exhausted.is_exhausted());
        assert_eq!(Pop::<u8>::Exhausted.into_item(), None);
    }
}
