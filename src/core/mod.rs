//! Core types for the kitchen pipeline

pub mod error;
pub mod event;
pub mod work_item;

pub use error::{PipelineError, Result};
pub use event::{ConsoleSink, Event, EventSink, NullSink, RecordedEvent, RecordingSink};
pub use work_item::{DishKind, DurationRange, PrepAction, PrepTimes, Preparation, WorkItem};
