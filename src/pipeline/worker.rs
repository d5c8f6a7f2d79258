//! Worker thread running one pipeline stage

use crate::core::{PipelineError, Result};
use crate::pipeline::kitchen::{Pipeline, StageSummary};
use std::fmt;
use std::sync::Arc;
use std::thread;

#[cfg(feature = "tracing")]
use tracing::{debug, span, Level};

/// Which loop a [`StageWorker`] runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Runs [`Pipeline::run_preparer`]
    Preparer,
    /// Runs [`Pipeline::run_server`]
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Preparer => write!(f, "preparer"),
            Role::Server => write!(f, "server"),
        }
    }
}

/// A dedicated thread running one stage loop until its queue is exhausted.
#[derive(Debug)]
pub struct StageWorker {
    role: Role,
    thread: Option<thread::JoinHandle<StageSummary>>,
}

impl StageWorker {
    /// Spawn a thread named `<prefix>-<role>` running the loop for `role`.
    ///
    /// # Shutdown Behavior
    ///
    /// The thread exits on its own once the pipeline is closed and the
    /// stage's queue has drained; [`join`](StageWorker::join) waits for that.
    pub fn spawn(role: Role, pipeline: Arc<Pipeline>) -> Result<Self> {
        let name = format!("{}-{}", pipeline.config().thread_name_prefix, role);

        let thread = thread::Builder::new()
            .name(name)
            .spawn(move || Self::run(role, &pipeline))
            .map_err(|e| PipelineError::spawn_with_source(role.to_string(), e.to_string(), e))?;

        log::debug!("{} worker started", role);
        Ok(Self {
            role,
            thread: Some(thread),
        })
    }

    /// The stage this worker runs
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether the loop has reached its terminal state
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Wait for the loop to finish and return what it did.
    pub fn join(mut self) -> Result<StageSummary> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|payload| PipelineError::from_panic(self.role.to_string(), payload)),
            None => Ok(StageSummary::default()),
        }
    }

    fn run(role: Role, pipeline: &Pipeline) -> StageSummary {
        #[cfg(feature = "tracing")]
        let stage_span = span!(Level::DEBUG, "stage", role = %role);
        #[cfg(feature = "tracing")]
        let _guard = stage_span.enter();

        #[cfg(feature = "tracing")]
        debug!("stage loop started");

        let summary = match role {
            Role::Preparer => pipeline.run_preparer(),
            Role::Server => pipeline.run_server(),
        };

        #[cfg(feature = "tracing")]
        debug!(items = summary.items, busy_ms = summary.busy_ms, "stage loop finished");

        summary
    }
}

impl Drop for StageWorker {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            if !thread.is_finished() {
                log::warn!(
                    "{} worker dropped without join; thread detached until its queue drains",
                    self.role
                );
            }
        }
    }
}
