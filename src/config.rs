//! Configuration for the pipeline and its driver.
//!
//! Both configs are plain serde structs with builder methods and a
//! `validate()` step. [`KitchenConfig`] bundles them for loading from a JSON
//! file:
//!
//! ```json
//! {
//!   "pipeline": { "order_latency_ms": 100, "prep_times": { "pizza": { "min_ms": 200, "max_ms": 300 } } },
//!   "driver": { "rounds": 1, "submitters": 2 }
//! }
//! ```
//!
//! Missing fields fall back to their defaults.

use crate::core::{DishKind, DurationRange, PipelineError, PrepTimes, Result, WorkItem};
use crate::queue::QueueBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound accepted for any single simulated delay.
const MAX_DELAY_MS: u64 = 60 * 60 * 1_000;

/// Configuration for a [`Pipeline`](crate::pipeline::Pipeline)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Delay `submit` waits before the order is observed.
    /// Default: 1000ms
    pub order_latency_ms: u64,
    /// Delay the server waits before an item counts as served.
    /// Default: 1000ms
    pub serve_delay_ms: u64,
    /// Preparation time per dish kind
    pub prep_times: PrepTimes,
    /// Queue implementation for both stages.
    /// Default: monitor
    pub queue_backend: QueueBackend,
    /// Prefix for worker thread names
    pub thread_name_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            order_latency_ms: 1_000,
            serve_delay_ms: 1_000,
            prep_times: PrepTimes::default(),
            queue_backend: QueueBackend::default(),
            thread_name_prefix: "kitchen".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with the default timings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Same shape as the defaults with every delay shrunk to milliseconds.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            order_latency_ms: 10,
            serve_delay_ms: 10,
            prep_times: PrepTimes {
                pasta: DurationRange::fixed(10),
                pizza: DurationRange::new(20, 30),
            },
            ..Self::default()
        }
    }

    /// No simulated delays at all.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            order_latency_ms: 0,
            serve_delay_ms: 0,
            prep_times: PrepTimes {
                pasta: DurationRange::fixed(0),
                pizza: DurationRange::fixed(0),
            },
            ..Self::default()
        }
    }

    /// Set the order latency
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_order_latency(mut self, latency: Duration) -> Self {
        self.order_latency_ms = latency.as_millis() as u64;
        self
    }

    /// Set the serving delay
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_serve_delay(mut self, delay: Duration) -> Self {
        self.serve_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the preparation range for one dish kind
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_prep_time(mut self, kind: DishKind, range: DurationRange) -> Self {
        match kind {
            DishKind::Pasta => self.prep_times.pasta = range,
            DishKind::Pizza => self.prep_times.pizza = range,
        }
        self
    }

    /// Set the queue implementation
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_queue_backend(mut self, backend: QueueBackend) -> Self {
        self.queue_backend = backend;
        self
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Order latency as a `Duration`
    pub fn order_latency(&self) -> Duration {
        Duration::from_millis(self.order_latency_ms)
    }

    /// Serving delay as a `Duration`
    pub fn serve_delay(&self) -> Duration {
        Duration::from_millis(self.serve_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        check_delay("order_latency_ms", self.order_latency_ms)?;
        check_delay("serve_delay_ms", self.serve_delay_ms)?;
        self.prep_times.validate()?;
        check_delay("prep_times.pasta", self.prep_times.pasta.max_ms)?;
        check_delay("prep_times.pizza", self.prep_times.pizza.max_ms)?;
        if self.thread_name_prefix.trim().is_empty() {
            return Err(PipelineError::invalid_config(
                "thread_name_prefix",
                "Thread name prefix must not be empty",
            ));
        }
        Ok(())
    }
}

fn check_delay(parameter: &str, ms: u64) -> Result<()> {
    if ms > MAX_DELAY_MS {
        return Err(PipelineError::invalid_config(
            parameter,
            format!("{}ms exceeds the {}ms limit", ms, MAX_DELAY_MS),
        ));
    }
    Ok(())
}

/// One dish on the menu the driver orders from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    /// Dish name
    pub name: String,
    /// Dish kind
    pub kind: DishKind,
}

impl MenuEntry {
    /// Create a menu entry
    pub fn new(name: impl Into<String>, kind: DishKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Cook up a fresh item for this entry
    pub fn order(&self) -> WorkItem {
        WorkItem::new(self.name.clone(), self.kind)
    }
}

/// Configuration for the [`Driver`](crate::driver::Driver)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Dishes ordered in every round, in order
    pub menu: Vec<MenuEntry>,
    /// How many times each submitter walks the menu
    pub rounds: usize,
    /// Number of concurrent submission threads.
    /// Each one orders `rounds` × `menu.len()` items.
    pub submitters: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            menu: vec![
                MenuEntry::new("Margarita Pizza", DishKind::Pizza),
                MenuEntry::new("Plain Pasta", DishKind::Pasta),
                MenuEntry::new("Pepperoni Pizza", DishKind::Pizza),
                MenuEntry::new("Bolognez Pasta", DishKind::Pasta),
            ],
            rounds: 3,
            submitters: 1,
        }
    }
}

impl DriverConfig {
    /// Create the default driver configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the menu
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_menu(mut self, menu: Vec<MenuEntry>) -> Self {
        self.menu = menu;
        self
    }

    /// Set the number of rounds
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    /// Set the number of concurrent submitters
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_submitters(mut self, submitters: usize) -> Self {
        self.submitters = submitters;
        self
    }

    /// Items a single submitter orders
    pub fn orders_per_submitter(&self) -> usize {
        self.rounds * self.menu.len()
    }

    /// Items ordered across all submitters
    pub fn total_orders(&self) -> usize {
        self.orders_per_submitter() * self.submitters
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.submitters == 0 {
            return Err(PipelineError::invalid_config(
                "submitters",
                "Number of submitters must be greater than 0",
            ));
        }
        if let Some(entry) = self.menu.iter().find(|e| e.name.trim().is_empty()) {
            return Err(PipelineError::invalid_config(
                "menu",
                format!("{} entry has an empty name", entry.kind),
            ));
        }
        Ok(())
    }
}

/// Everything the `kitchen` binary can read from a config file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitchenConfig {
    /// Pipeline timings and backend
    pub pipeline: PipelineConfig,
    /// Orders to submit
    pub driver: DriverConfig,
}

impl KitchenConfig {
    /// Parse a JSON config string
    pub fn from_json_str(json: &str, origin: &str) -> Result<Self> {
        let config: KitchenConfig =
            serde_json::from_str(json).map_err(|source| PipelineError::ConfigParse {
                path: origin.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json, &path.display().to_string())
    }

    /// Validate both halves
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        self.driver.validate()
    }
}
