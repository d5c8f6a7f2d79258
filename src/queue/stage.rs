//! Unbounded FIFO monitor: one mutex, one condition variable.

use super::{HandoffQueue, Pop, QueueBackend};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

struct State<T> {
    items: VecDeque<T>,
    accepting: bool,
}

/// An unbounded FIFO queue guarded by a mutex and a condition variable.
///
/// Every mutation happens under the single lock. Consumers wait on the
/// condition variable, which releases the lock while parked, and re-check
/// the queue after every wake so spurious wakeups are harmless.
///
/// # Example
///
/// ```rust
/// use kitchen_pipeline::queue::{HandoffQueue, Pop, StageQueue};
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(StageQueue::new());
/// let consumer = {
///     let queue = Arc::clone(&queue);
///     thread::spawn(move || {
///         let mut seen = Vec::new();
///         while let Pop::Item(n) = queue.pop_blocking() {
///             seen.push(n);
///         }
///         seen
///     })
/// };
///
/// for n in 0..3 {
///     queue.push(n);
/// }
/// queue.shutdown();
/// assert_eq!(consumer.join().unwrap(), vec![0, 1, 2]);
/// ```
pub struct StageQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> StageQueue<T> {
    /// Creates an empty, accepting queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                accepting: true,
            }),
            available: Condvar::new(),
        }
    }
}

impl<T> Default for StageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for StageQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StageQueue")
            .field("len", &state.items.len())
            .field("accepting", &state.accepting)
            .finish()
    }
}

impl<T: Send> HandoffQueue<T> for StageQueue<T> {
    fn push(&self, item: T) {
        {
            let mut state = self.state.lock();
            state.items.push_back(item);
        }
        // Notify outside the lock
        self.available.notify_one();
    }

    fn pop_blocking(&self) -> Pop<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Pop::Item(item);
            }
            if !state.accepting {
                return Pop::Exhausted;
            }
            self.available.wait(&mut state);
        }
    }

    fn try_pop(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            state.accepting = false;
        }
        self.available.notify_all();
    }

    fn is_accepting(&self) -> bool {
        self.state.lock().accepting
    }

    fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    fn backend(&self) -> QueueBackend {
        QueueBackend::Monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_push_pop_fifo() {
        let queue = StageQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push(3);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop_blocking(), Pop::Item(1));
        assert_eq!(queue.pop_blocking(), Pop::Item(2));
        assert_eq!(queue.try_pop(), Some(3));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_exhausted_returns_immediately() {
        let queue: StageQueue<u8> = StageQueue::new();
        queue.shutdown();

        let start = Instant::now();
        assert_eq!(queue.pop_blocking(), Pop::Exhausted);
        assert_eq!(queue.pop_blocking(), Pop::Exhausted);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let queue = StageQueue::new();
        queue.push("a");
        queue.shutdown();
        queue.shutdown();

        assert!(!queue.is_accepting());
        assert_eq!(queue.pop_blocking(), Pop::Item("a"));
        assert_eq!(queue.pop_blocking(), Pop::Exhausted);
    }

    #[test]
    fn test_blocked_consumer_receives_push() {
        let queue = Arc::new(StageQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop_blocking())
        };

        thread::sleep(Duration::from_millis(20));
        queue.push(42);

        assert_eq!(consumer.join().unwrap(), Pop::Item(42));
    }

    #[test]
    fn test_concurrent_producers_preserve_per_producer_order() {
        let queue = Arc::new(StageQueue::new());
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.push((p, i));
                    }
                })
            })
            .collect();

        for h in producers {
            h.join().unwrap();
        }
        queue.shutdown();

        let mut last = [None::<i32>; 4];
        let mut total = 0;
        while let Pop::Item((p, i)) = queue.pop_blocking() {
            if let Some(prev) = last[p] {
                assert!(i > prev, "producer {} out of order: {} after {}", p, i, prev);
            }
            last[p] = Some(i);
            total += 1;
        }
        assert_eq!(total, 1000);
    }

    #[test]
    fn test_debug_shows_state() {
        let queue = StageQueue::new();
        queue.push(1u8);
        let dbg = format!("{:?}", queue);
        assert!(dbg.contains("len: 1"));
        assert!(dbg.contains("accepting: true"));
    }
}
