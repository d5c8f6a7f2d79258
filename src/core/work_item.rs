//! Work items flowing through the pipeline.
//!
//! A [`WorkItem`] is a named dish of one of two kinds. The kind decides what
//! [`WorkItem::prepare`] does and how long it blocks the preparer.

use crate::core::error::{PipelineError, Result};
use crate::core::event::{Event, EventSink};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// The closed set of dish kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DishKind {
    /// Fast class, boiled
    Pasta,
    /// Slow class, baked
    Pizza,
}

impl DishKind {
    /// The preparation action this kind performs.
    pub fn action(self) -> PrepAction {
        match self {
            DishKind::Pasta => PrepAction::Boiling,
            DishKind::Pizza => PrepAction::Baking,
        }
    }
}

impl fmt::Display for DishKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DishKind::Pasta => write!(f, "pasta"),
            DishKind::Pizza => write!(f, "pizza"),
        }
    }
}

impl FromStr for DishKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pasta" => Ok(DishKind::Pasta),
            "pizza" => Ok(DishKind::Pizza),
            other => Err(PipelineError::invalid_config(
                "kind",
                format!("unknown dish kind '{}', expected 'pizza' or 'pasta'", other),
            )),
        }
    }
}

/// Marker of which preparation action ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrepAction {
    /// Pizza
    Baking,
    /// Pasta
    Boiling,
}

impl fmt::Display for PrepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepAction::Baking => write!(f, "Baking"),
            PrepAction::Boiling => write!(f, "Boiling"),
        }
    }
}

/// An inclusive range of milliseconds a simulated action may take.
///
/// A range with `min_ms == max_ms` is a fixed duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    /// Lower bound in milliseconds
    pub min_ms: u64,
    /// Upper bound in milliseconds (inclusive)
    pub max_ms: u64,
}

impl DurationRange {
    /// Create a range between `min_ms` and `max_ms` inclusive.
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Create a fixed duration.
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    /// Whether the range carries any jitter.
    pub fn is_fixed(&self) -> bool {
        self.min_ms == self.max_ms
    }

    /// Draw a duration uniformly from the range.
    pub fn sample(&self) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(fastrand::u64(self.min_ms..=self.max_ms))
    }

    /// Check that the bounds are ordered.
    pub fn validate(&self, parameter: &str) -> Result<()> {
        if self.min_ms > self.max_ms {
            return Err(PipelineError::invalid_config(
                parameter,
                format!("min {}ms exceeds max {}ms", self.min_ms, self.max_ms),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for DurationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fixed() {
            write!(f, "{}ms", self.min_ms)
        } else {
            write!(f, "{}-{}ms", self.min_ms, self.max_ms)
        }
    }
}

/// Parses `"1000"` as a fixed duration and `"2000-3000"` as a range.
impl FromStr for DurationRange {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim().trim_end_matches("ms").parse::<u64>().map_err(|e| {
                PipelineError::invalid_config("duration", format!("'{}': {}", s, e))
            })
        };

        let range = match s.split_once('-') {
            Some((min, max)) => DurationRange::new(parse(min)?, parse(max)?),
            None => DurationRange::fixed(parse(s)?),
        };
        range.validate("duration")?;
        Ok(range)
    }
}

/// Preparation duration per dish kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepTimes {
    /// Boiling time for pasta
    pub pasta: DurationRange,
    /// Baking time for pizza
    pub pizza: DurationRange,
}

impl Default for PrepTimes {
    fn default() -> Self {
        Self {
            pasta: DurationRange::fixed(1_000),
            pizza: DurationRange::new(2_000, 3_000),
        }
    }
}

impl PrepTimes {
    /// Range configured for `kind`.
    pub fn for_kind(&self, kind: DishKind) -> DurationRange {
        match kind {
            DishKind::Pasta => self.pasta,
            DishKind::Pizza => self.pizza,
        }
    }

    /// Validate both ranges
    pub fn validate(&self) -> Result<()> {
        self.pasta.validate("prep_times.pasta")?;
        self.pizza.validate("prep_times.pizza")
    }
}

/// Outcome of a single [`WorkItem::prepare`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Preparation {
    /// Which action ran
    pub action: PrepAction,
    /// How long the preparer was blocked
    pub elapsed: Duration,
}

/// A dish moving through the pipeline.
///
/// Not `Clone`: an item has exactly one owner at a time, and ownership moves
/// from the submitter into the queues and through both stages.
#[derive(Debug, PartialEq, Eq)]
pub struct WorkItem {
    id: Uuid,
    name: String,
    kind: DishKind,
}

impl WorkItem {
    /// Create a new item with a fresh id.
    pub fn new(name: impl Into<String>, kind: DishKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
        }
    }

    /// Create a pizza.
    pub fn pizza(name: impl Into<String>) -> Self {
        Self::new(name, DishKind::Pizza)
    }

    /// Create a pasta.
    pub fn pasta(name: impl Into<String>) -> Self {
        Self::new(name, DishKind::Pasta)
    }

    /// Unique id of this item
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Display name of the dish
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dish kind
    pub fn kind(&self) -> DishKind {
        self.kind
    }

    /// Run the kind-specific preparation, blocking the calling thread.
    ///
    /// Emits [`Event::Preparing`] naming the action before sleeping for a
    /// duration drawn from `times`. Never fails.
    pub fn prepare(&self, times: &PrepTimes, sink: &dyn EventSink) -> Preparation {
        let action = self.kind.action();
        let duration = times.for_kind(self.kind).sample();

        sink.emit(Event::Preparing {
            id: self.id,
            name: self.name.clone(),
            action,
        });
        log::trace!("{} ({}): {} for {:?}", self.name, self.id, action, duration);

        let start = Instant::now();
        thread::sleep(duration);

        Preparation {
            action,
            elapsed: start.elapsed(),
        }
    }
}
