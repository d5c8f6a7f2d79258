//! Runs a whole service: workers, submitters and the shutdown sequence.

use crate::config::{DriverConfig, PipelineConfig};
use crate::core::{Event, EventSink, PipelineError, Result};
use crate::pipeline::{Pipeline, Role, StageSummary, StageWorker};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Closes the pipeline when dropped, so every exit path of the submission
/// phase (early return, error, panic) lets the workers drain and stop.
struct CloseGuard<'a>(&'a Pipeline);

impl Drop for CloseGuard<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Outcome of a [`Driver::run`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DriverReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall time of the whole run in milliseconds
    pub elapsed_ms: u64,
    /// Items accepted by `submit`
    pub ordered: u64,
    /// Items that finished preparation
    pub prepared: u64,
    /// Items served
    pub served: u64,
    /// Preparer loop totals
    pub preparer: StageSummary,
    /// Server loop totals
    pub server: StageSummary,
}

impl DriverReport {
    /// Every ordered item was prepared and served exactly once.
    pub fn is_complete(&self) -> bool {
        self.ordered == self.prepared && self.prepared == self.served
    }
}

/// Starts the preparer and server, runs the submitters concurrently, then
/// closes the pipeline and waits for both stages to drain.
///
/// # Example
///
/// ```rust
/// use kitchen_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// # fn main() -> Result<()> {
/// let driver = Driver::new(
///     PipelineConfig::instant(),
///     DriverConfig::new().with_rounds(1),
///     Arc::new(NullSink),
/// )?;
/// let report = driver.run()?;
/// assert_eq!(report.served, 4);
/// assert!(report.is_complete());
/// # Ok(())
/// # }
/// ```
pub struct Driver {
    pipeline_config: PipelineConfig,
    config: DriverConfig,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("pipeline_config", &self.pipeline_config)
            .field("config", &self.config)
            .finish()
    }
}

impl Driver {
    /// Create a driver after validating both configurations
    pub fn new(
        pipeline_config: PipelineConfig,
        config: DriverConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        pipeline_config.validate()?;
        config.validate()?;
        Ok(Self {
            pipeline_config,
            config,
            sink,
        })
    }

    /// Run the service to completion.
    ///
    /// Order of events:
    ///
    /// 1. emit [`Event::Opened`], spawn the preparer and the server;
    /// 2. run every submitter and join all of them;
    /// 3. close the pipeline, guaranteed even if a submitter failed;
    /// 4. join preparer then server, emit [`Event::AllServed`].
    ///
    /// # Errors
    ///
    /// Returns the first spawn or join failure. Workers are always joined
    /// before returning from step 2 onwards.
    pub fn run(&self) -> Result<DriverReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        self.sink.emit(Event::Opened);
        let pipeline = Arc::new(Pipeline::new(
            self.pipeline_config.clone(),
            Arc::clone(&self.sink),
        )?);

        let guard = CloseGuard(&pipeline);
        // Only the preparer shuts down the prepared queue, so it starts first
        let preparer = StageWorker::spawn(Role::Preparer, Arc::clone(&pipeline))?;
        let server = StageWorker::spawn(Role::Server, Arc::clone(&pipeline))?;

        let submitted = self.run_submitters(&pipeline);
        drop(guard);

        let preparer = preparer.join();
        let server = server.join();
        submitted?;
        let (preparer, server) = (preparer?, server?);

        self.sink.emit(Event::AllServed);

        let stats = pipeline.stats();
        let report = DriverReport {
            started_at,
            elapsed_ms: start.elapsed().as_millis() as u64,
            ordered: stats.ordered,
            prepared: stats.prepared,
            served: stats.served,
            preparer,
            server,
        };
        log::info!(
            "run finished in {}ms: {} ordered, {} served",
            report.elapsed_ms,
            report.ordered,
            report.served
        );
        Ok(report)
    }

    /// Spawn one thread per submitter, each walking the menu `rounds` times,
    /// and join them all before returning.
    fn run_submitters(&self, pipeline: &Arc<Pipeline>) -> Result<()> {
        let mut handles = Vec::with_capacity(self.config.submitters);
        let mut first_error = None;

        for id in 0..self.config.submitters {
            let pipeline = Arc::clone(pipeline);
            let menu = self.config.menu.clone();
            let rounds = self.config.rounds;

            let spawned = thread::Builder::new()
                .name(format!(
                    "{}-submitter-{}",
                    self.pipeline_config.thread_name_prefix, id
                ))
                .spawn(move || {
                    for _ in 0..rounds {
                        for entry in &menu {
                            pipeline.submit(entry.order());
                        }
                    }
                });

            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => {
                    first_error = Some(PipelineError::spawn_with_source(
                        format!("submitter-{}", id),
                        e.to_string(),
                        e,
                    ));
                    break;
                }
            }
        }

        for (id, handle) in handles {
            if let Err(payload) = handle.join() {
                let err = PipelineError::from_panic(format!("submitter-{}", id), payload);
                log::error!("{}", err);
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MenuEntry;
    use crate::core::{DishKind, RecordingSink};

    fn run(pipeline: PipelineConfig, driver: DriverConfig) -> (DriverReport, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let report = Driver::new(pipeline, driver, sink.clone())
            .expect("valid config")
            .run()
            .expect("run succeeds");
        (report, sink)
    }

    #[test]
    fn test_default_menu_runs_to_completion() {
        let (report, sink) = run(PipelineConfig::instant(), DriverConfig::default());

        assert_eq!(report.ordered, 12);
        assert_eq!(report.served, 12);
        assert!(report.is_complete());
        assert_eq!(report.preparer.items, 12);
        assert_eq!(report.server.items, 12);

        let events = sink.events();
        assert_eq!(events.first(), Some(&Event::Opened));
        assert_eq!(events.last(), Some(&Event::AllServed));
    }

    #[test]
    fn test_empty_run_terminates() {
        let (report, sink) = run(
            PipelineConfig::instant(),
            DriverConfig::new().with_rounds(0),
        );

        assert_eq!(report.ordered, 0);
        assert!(report.is_complete());
        assert_eq!(sink.count(|e| *e == Event::StoppedTakingOrders), 1);
        assert_eq!(sink.count(|e| *e == Event::KitchenClosed), 1);
    }

    #[test]
    fn test_multiple_submitters() {
        let (report, _) = run(
            PipelineConfig::instant(),
            DriverConfig::new().with_rounds(2).with_submitters(3),
        );
        assert_eq!(report.served, 24);
        assert!(report.is_complete());
    }

    #[test]
    fn test_invalid_driver_config() {
        let err = Driver::new(
            PipelineConfig::instant(),
            DriverConfig::new().with_submitters(0),
            Arc::new(RecordingSink::new()),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig { .. }));
    }

    #[test]
    fn test_report_serializes() {
        let (report, _) = run(
            PipelineConfig::instant(),
            DriverConfig::new()
                .with_menu(vec![MenuEntry::new("Calzone", DishKind::Pizza)])
                .with_rounds(1),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["served"], 1);
        assert_eq!(json["preparer"]["items"], 1);
    }
}
