//! Unbounded FIFO queue using crossbeam channels.

use super::{HandoffQueue, Pop, QueueBackend};
use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use crossbeam::select;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// An unbounded FIFO queue using crossbeam channels.
///
/// Items travel over one unbounded channel. Shutdown is broadcast by dropping
/// the only sender of a second, never-written channel: every receiver of it
/// observes the disconnect at once, so all blocked consumers wake together.
///
/// # Example
///
/// ```rust
/// use kitchen_pipeline::queue::{ChannelStageQueue, HandoffQueue, Pop};
///
/// let queue = ChannelStageQueue::new();
/// queue.push(1);
/// queue.shutdown();
/// assert_eq!(queue.pop_blocking(), Pop::Item(1));
/// assert_eq!(queue.pop_blocking(), Pop::Exhausted);
/// ```
pub struct ChannelStageQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
    accepting: AtomicBool,
}

impl<T> ChannelStageQueue<T> {
    /// Creates a new unbounded channel queue.
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        let (shutdown_tx, shutdown_rx) = channel::bounded(0);
        Self {
            sender,
            receiver,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            shutdown_rx,
            accepting: AtomicBool::new(true),
        }
    }

    /// After shutdown: hand out what is left, then report exhaustion.
    fn drain_one(&self) -> Pop<T> {
        match self.receiver.try_recv() {
            Ok(item) => Pop::Item(item),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Pop::Exhausted,
        }
    }
}

impl<T> Default for ChannelStageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ChannelStageQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelStageQueue")
            .field("len", &self.receiver.len())
            .field("accepting", &self.accepting.load(Ordering::Acquire))
            .finish()
    }
}

impl<T: Send> HandoffQueue<T> for ChannelStageQueue<T> {
    fn push(&self, item: T) {
        // The queue owns a receiver, so the channel cannot be disconnected
        if self.sender.send(item).is_err() {
            log::error!("channel queue lost its receiver; item dropped");
        }
    }

    fn pop_blocking(&self) -> Pop<T> {
        if !self.accepting.load(Ordering::Acquire) {
            return self.drain_one();
        }

        select! {
            recv(self.receiver) -> msg => match msg {
                Ok(item) => Pop::Item(item),
                Err(_) => Pop::Exhausted,
            },
            recv(self.shutdown_rx) -> _ => self.drain_one(),
        }
    }

    fn try_pop(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    fn shutdown(&self) {
        self.accepting.store(false, Ordering::Release);
        // Dropping the sender disconnects every shutdown_rx waiter
        self.shutdown_tx.lock().take();
    }

    fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    fn len(&self) -> usize {
        self.receiver.len()
    }

    fn backend(&self) -> QueueBackend {
        QueueBackend::Channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_send_recv() {
        let queue = ChannelStageQueue::new();
        queue.push("pasta");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop_blocking(), Pop::Item("pasta"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_try_pop_empty() {
        let queue: ChannelStageQueue<u8> = ChannelStageQueue::new();
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_shutdown_drains_before_exhausting() {
        let queue = ChannelStageQueue::new();
        for i in 0..5 {
            queue.push(i);
        }
        queue.shutdown();
        queue.shutdown();

        let mut drained = Vec::new();
        while let Pop::Item(i) = queue.pop_blocking() {
            drained.push(i);
        }
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.pop_blocking(), Pop::Exhausted);
    }

    #[test]
    fn test_shutdown_wakes_all_waiters() {
        let queue: Arc<ChannelStageQueue<u8>> = Arc::new(ChannelStageQueue::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.pop_blocking())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        queue.shutdown();

        for w in waiters {
            assert_eq!(w.join().unwrap(), Pop::Exhausted);
        }
    }

    #[test]
    fn test_concurrent_push_then_drain() {
        let queue = Arc::new(ChannelStageQueue::new());
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let q = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..25 {
                        q.push(i);
                    }
                })
            })
            .collect();

        for h in producers {
            h.join().unwrap();
        }
        queue.shutdown();

        let mut received = 0;
        while queue.pop_blocking().into_item().is_some() {
            received += 1;
        }
        assert_eq!(received, 100);
    }
}
