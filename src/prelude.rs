//! Convenient re-exports for common types and traits

pub use crate::config::{DriverConfig, KitchenConfig, MenuEntry, PipelineConfig};
pub use crate::core::{
    ConsoleSink, DishKind, DurationRange, Event, EventSink, NullSink, PipelineError, PrepAction,
    PrepTimes, RecordingSink, Result, WorkItem,
};
pub use crate::driver::{Driver, DriverReport};
pub use crate::pipeline::{Pipeline, PipelineStats, Role, StageSummary, StageWorker};
pub use crate::queue::{ChannelStageQueue, HandoffQueue, Pop, QueueBackend, StageQueue};
