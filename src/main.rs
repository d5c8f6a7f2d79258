//! `kitchen` - run the restaurant pipeline from the command line.
//!
//! Run with: `cargo run --bin kitchen -- --quick`
//! Set `RUST_LOG=kitchen_pipeline=debug` for diagnostics.

use clap::Parser;
use kitchen_pipeline::core::{ConsoleSink, DurationRange};
use kitchen_pipeline::queue::QueueBackend;
use kitchen_pipeline::{DishKind, Driver, KitchenConfig, PipelineConfig, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "kitchen")]
#[command(about = "Two-stage order pipeline: submit, prepare, serve", long_about = None)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use millisecond delays instead of the one-second defaults
    #[arg(long)]
    quick: bool,

    /// Times each submitter walks the menu
    #[arg(long)]
    rounds: Option<usize>,

    /// Number of concurrent submitters
    #[arg(long)]
    submitters: Option<usize>,

    /// Delay before an order is taken, in milliseconds
    #[arg(long)]
    order_latency_ms: Option<u64>,

    /// Delay before a dish counts as served, in milliseconds
    #[arg(long)]
    serve_delay_ms: Option<u64>,

    /// Pizza baking time, e.g. "2000-3000" or "2500"
    #[arg(long)]
    pizza_ms: Option<DurationRange>,

    /// Pasta boiling time, e.g. "1000" or "800-1200"
    #[arg(long)]
    pasta_ms: Option<DurationRange>,

    /// Queue implementation: monitor or channel
    #[arg(long)]
    backend: Option<QueueBackend>,

    /// Prefix each event line with the time
    #[arg(long)]
    timestamps: bool,

    /// Print a JSON summary after the run
    #[arg(long)]
    summary: bool,
}

impl Cli {
    fn into_config(self) -> Result<(KitchenConfig, bool, bool)> {
        let mut config = match &self.config {
            Some(path) => KitchenConfig::from_json_file(path)?,
            None => KitchenConfig::default(),
        };

        if self.quick {
            config.pipeline = PipelineConfig {
                queue_backend: config.pipeline.queue_backend,
                thread_name_prefix: config.pipeline.thread_name_prefix.clone(),
                ..PipelineConfig::quick()
            };
        }

        let mut pipeline = config.pipeline;
        if let Some(ms) = self.order_latency_ms {
            pipeline = pipeline.with_order_latency(Duration::from_millis(ms));
        }
        if let Some(ms) = self.serve_delay_ms {
            pipeline = pipeline.with_serve_delay(Duration::from_millis(ms));
        }
        if let Some(range) = self.pizza_ms {
            pipeline = pipeline.with_prep_time(DishKind::Pizza, range);
        }
        if let Some(range) = self.pasta_ms {
            pipeline = pipeline.with_prep_time(DishKind::Pasta, range);
        }
        if let Some(backend) = self.backend {
            pipeline = pipeline.with_queue_backend(backend);
        }
        config.pipeline = pipeline;

        if let Some(rounds) = self.rounds {
            config.driver = config.driver.with_rounds(rounds);
        }
        if let Some(submitters) = self.submitters {
            config.driver = config.driver.with_submitters(submitters);
        }

        config.validate()?;
        Ok((config, self.timestamps, self.summary))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let (config, timestamps, summary) = Cli::parse().into_config()?;
    log::debug!("running with {:?}", config);

    let sink = Arc::new(ConsoleSink::new().with_timestamps(timestamps));
    let driver = Driver::new(config.pipeline, config.driver, sink)?;
    let report = driver.run()?;

    if summary {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("failed to serialize summary: {}", e),
        }
    }

    Ok(())
}
