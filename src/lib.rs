//! # Kitchen Pipeline
//!
//! A two-stage producer/consumer pipeline on plain OS threads.
//!
//! Orders are submitted into a *submitted* queue, a preparer thread takes
//! them off one at a time and prepares them, and a server thread takes the
//! prepared items off a second queue and serves them. Both queues are
//! unbounded FIFOs with a blocking pop and a shutdown flag; closing the
//! pipeline lets each stage drain what it already has and then stop.
//!
//! ## Features
//!
//! - **Handoff queues**: mutex + condvar monitor or crossbeam channel backend
//! - **Closed work item set**: pizza (baking) and pasta (boiling) with
//!   configurable, jittered durations
//! - **Graceful shutdown**: `close` never discards queued work
//! - **Observable events**: every step is reported to an [`EventSink`]
//! - **Configuration**: builder methods plus JSON config files
//!
//! ## Quick Start
//!
//! ```rust
//! use kitchen_pipeline::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<()> {
//! let sink = Arc::new(RecordingSink::new());
//! let driver = Driver::new(
//!     PipelineConfig::instant(),
//!     DriverConfig::new().with_rounds(2),
//!     sink.clone(),
//! )?;
//!
//! let report = driver.run()?;
//! assert_eq!(report.served, 8);
//! assert_eq!(sink.count(|e| *e == Event::KitchenClosed), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving the Pipeline by Hand
//!
//! ```rust
//! use kitchen_pipeline::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<()> {
//! let pipeline = Arc::new(Pipeline::new(PipelineConfig::instant(), Arc::new(NullSink))?);
//! let preparer = StageWorker::spawn(Role::Preparer, Arc::clone(&pipeline))?;
//! let server = StageWorker::spawn(Role::Server, Arc::clone(&pipeline))?;
//!
//! pipeline.submit(WorkItem::pizza("Margarita Pizza"));
//! pipeline.submit(WorkItem::pasta("Plain Pasta"));
//!
//! // Only after the last submit
//! pipeline.close();
//!
//! preparer.join()?;
//! assert_eq!(server.join()?.items, 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod driver;
pub mod pipeline;
pub mod prelude;
pub mod queue;

pub use crate::config::{DriverConfig, KitchenConfig, MenuEntry, PipelineConfig};
pub use crate::core::{DishKind, Event, EventSink, PipelineError, Result, WorkItem};
pub use crate::driver::{Driver, DriverReport};
pub use crate::pipeline::{Pipeline, StageWorker};
