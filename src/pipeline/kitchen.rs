//! The two-stage pipeline: submit → prepare → serve.

use crate::config::PipelineConfig;
use crate::core::{Event, EventSink, Result, WorkItem};
use crate::queue::{HandoffQueue, Pop};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::{debug_span, Level};

/// What one worker loop did before it reached its terminal state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    /// Items handled
    pub items: u64,
    /// Time spent preparing or serving, in milliseconds
    pub busy_ms: u64,
}

impl StageSummary {
    fn record(&mut self, elapsed: Duration) {
        self.items += 1;
        self.busy_ms += elapsed.as_millis() as u64;
    }
}

/// Point-in-time view of the pipeline counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Whether `close` has not been called yet
    pub open: bool,
    /// Items accepted by `submit`
    pub ordered: u64,
    /// Items that finished preparation
    pub prepared: u64,
    /// Items served
    pub served: u64,
    /// Items waiting for the preparer
    pub awaiting_preparation: usize,
    /// Items waiting for the server
    pub awaiting_service: usize,
}

#[derive(Debug, Default)]
struct Counters {
    ordered: AtomicU64,
    prepared: AtomicU64,
    served: AtomicU64,
}

/// Shuts the wrapped queue down when dropped, including during unwinding.
struct ShutdownOnDrop<'a>(&'a dyn HandoffQueue<WorkItem>);

impl Drop for ShutdownOnDrop<'_> {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

/// Orders flow from [`submit`](Pipeline::submit) through the preparer into
/// the server over two handoff queues.
///
/// # Lifecycle
///
/// The pipeline starts open. [`close`](Pipeline::close) is the only
/// transition out of that state; after it the preparer drains the submitted
/// queue and stops, which in turn lets the server drain the prepared queue
/// and stop. There is no explicit closed state: the pipeline is finished
/// once both loops have returned.
///
/// # Example
///
/// ```rust
/// use kitchen_pipeline::prelude::*;
/// use std::sync::Arc;
/// use std::thread;
///
/// # fn main() -> Result<()> {
/// let sink = Arc::new(RecordingSink::new());
/// let pipeline = Arc::new(Pipeline::new(PipelineConfig::instant(), sink.clone())?);
///
/// let preparer = { let p = Arc::clone(&pipeline); thread::spawn(move || p.run_preparer()) };
/// let server = { let p = Arc::clone(&pipeline); thread::spawn(move || p.run_server()) };
///
/// pipeline.submit(WorkItem::pasta("Plain Pasta"));
/// pipeline.close();
///
/// preparer.join().unwrap();
/// assert_eq!(server.join().unwrap().items, 1);
/// assert_eq!(sink.count(|e| matches!(e, Event::Served { .. })), 1);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    submitted: Arc<dyn HandoffQueue<WorkItem>>,
    prepared: Arc<dyn HandoffQueue<WorkItem>>,
    open: AtomicBool,
    sink: Arc<dyn EventSink>,
    counters: Counters,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Pipeline {
    /// Create an open pipeline reporting to `sink`.
    pub fn new(config: PipelineConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        config.validate()?;

        let submitted = config.queue_backend.create();
        let prepared = config.queue_backend.create();
        log::debug!(
            "pipeline created with {} queues, prep times pasta={} pizza={}",
            config.queue_backend,
            config.prep_times.pasta,
            config.prep_times.pizza
        );

        Ok(Self {
            config,
            submitted,
            prepared,
            open: AtomicBool::new(true),
            sink,
            counters: Counters::default(),
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// `true` until [`close`](Pipeline::close) is called
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Take an order.
    ///
    /// Waits for the configured order latency, emits [`Event::Ordered`] and
    /// pushes the item into the submitted queue. Safe to call from any number
    /// of threads at once; each caller's items keep their relative order.
    ///
    /// Submitting after [`close`](Pipeline::close) breaks its precondition.
    /// The item is still queued, but it is only prepared if the preparer has
    /// not yet drained the queue.
    pub fn submit(&self, item: WorkItem) {
        if !self.is_open() {
            log::warn!(
                "{} ({}) submitted after close; it may never be prepared",
                item.name(),
                item.id()
            );
        }

        let latency = self.config.order_latency();
        if !latency.is_zero() {
            thread::sleep(latency);
        }

        self.sink.emit(Event::Ordered {
            id: item.id(),
            name: item.name().to_string(),
        });
        self.counters.ordered.fetch_add(1, Ordering::Relaxed);
        log::debug!("queued {} ({}) for preparation", item.name(), item.id());

        self.submitted.push(item);
    }

    /// Preparer loop.
    ///
    /// Takes items off the submitted queue in arrival order, prepares each one
    /// without holding any queue lock and hands it to the prepared queue.
    /// Returns after the submitted queue is exhausted, at which point the
    /// prepared queue is shut down so the server can finish.
    pub fn run_preparer(&self) -> StageSummary {
        let _cascade = ShutdownOnDrop(&*self.prepared);
        let mut summary = StageSummary::default();

        while let Pop::Item(item) = self.submitted.pop_blocking() {
            #[cfg(feature = "tracing")]
            let _span = debug_span!("prepare", id = %item.id(), name = item.name()).entered();

            self.sink.emit(Event::ToldToChef {
                id: item.id(),
                name: item.name().to_string(),
            });

            let prep = item.prepare(&self.config.prep_times, &*self.sink);

            self.sink.emit(Event::Ready {
                id: item.id(),
                name: item.name().to_string(),
            });
            summary.record(prep.elapsed);
            self.counters.prepared.fetch_add(1, Ordering::Relaxed);

            self.prepared.push(item);
        }

        self.sink.emit(Event::StoppedTakingOrders);
        log::info!(
            "preparer finished: {} items in {}ms",
            summary.items,
            summary.busy_ms
        );
        summary
    }

    /// Server loop.
    ///
    /// Takes prepared items in order, waits the serving delay and reports
    /// each as served. Returns once the prepared queue is exhausted.
    pub fn run_server(&self) -> StageSummary {
        let mut summary = StageSummary::default();
        let delay = self.config.serve_delay();

        while let Pop::Item(item) = self.prepared.pop_blocking() {
            #[cfg(feature = "tracing")]
            let _span = tracing::span!(Level::DEBUG, "serve", id = %item.id()).entered();

            let start = Instant::now();
            if !delay.is_zero() {
                thread::sleep(delay);
            }

            self.sink.emit(Event::Served {
                id: item.id(),
                name: item.name().to_string(),
            });
            summary.record(start.elapsed());
            self.counters.served.fetch_add(1, Ordering::Relaxed);
        }

        self.sink.emit(Event::KitchenClosed);
        log::info!(
            "server finished: {} items in {}ms",
            summary.items,
            summary.busy_ms
        );
        summary
    }

    /// Stop taking orders and let both stages drain.
    ///
    /// Marks the pipeline closed and shuts down the submitted queue. Nothing
    /// already queued is discarded: the preparer finishes every submitted
    /// item, then shuts down the prepared queue, and the server finishes
    /// every prepared item.
    ///
    /// # Precondition
    ///
    /// No [`submit`](Pipeline::submit) call may be in flight or follow. With
    /// several producers, join all of them first.
    ///
    /// Calling `close` more than once has no further effect.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            log::info!(
                "closing after {} orders; draining",
                self.counters.ordered.load(Ordering::Relaxed)
            );
        } else {
            log::debug!("close called on an already closed pipeline");
        }
        self.submitted.shutdown();
    }

    /// Current counters and queue depths
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            open: self.is_open(),
            ordered: self.counters.ordered.load(Ordering::Relaxed),
            prepared: self.counters.prepared.load(Ordering::Relaxed),
            served: self.counters.served.load(Ordering::Relaxed),
            awaiting_preparation: self.submitted.len(),
            awaiting_service: self.prepared.len(),
        }
    }
}
