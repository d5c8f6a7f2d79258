//! Pipeline and stage worker implementations

pub mod kitchen;
pub mod worker;

pub use kitchen::{Pipeline, PipelineStats, StageSummary};
pub use worker::{Role, StageWorker};
