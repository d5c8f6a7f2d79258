//! Observable events emitted by the pipeline and where they go.

use crate::core::work_item::PrepAction;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use uuid::Uuid;

/// One line of the pipeline's narration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Start banner
    Opened,
    /// An item was accepted by `submit`
    Ordered {
        /// Item id
        id: Uuid,
        /// Item name
        name: String,
    },
    /// The preparer took the item off the submitted queue
    ToldToChef {
        /// Item id
        id: Uuid,
        /// Item name
        name: String,
    },
    /// Preparation started
    Preparing {
        /// Item id
        id: Uuid,
        /// Item name
        name: String,
        /// Which action runs
        action: PrepAction,
    },
    /// Preparation finished; the item is about to enter the prepared queue
    Ready {
        /// Item id
        id: Uuid,
        /// Item name
        name: String,
    },
    /// The server delivered the item
    Served {
        /// Item id
        id: Uuid,
        /// Item name
        name: String,
    },
    /// The preparer loop drained the submitted queue and stopped
    StoppedTakingOrders,
    /// The server loop drained the prepared queue and stopped
    KitchenClosed,
    /// End banner
    AllServed,
}

impl Event {
    /// Id of the item this event is about, if any.
    pub fn item_id(&self) -> Option<Uuid> {
        match self {
            Event::Ordered { id, .. }
            | Event::ToldToChef { id, .. }
            | Event::Preparing { id, .. }
            | Event::Ready { id, .. }
            | Event::Served { id, .. } => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Opened => write!(f, "Restaurant is opened."),
            Event::Ordered { name, .. } => write!(f, "{} is ordered by a customer.", name),
            Event::ToldToChef { name, .. } => write!(f, "{} is told to chief", name),
            Event::Preparing { name, action, .. } => {
                write!(f, "{} is getting prepared.[{}]", name, action)
            }
            Event::Ready { name, .. } => write!(f, "{} is ready to serve", name),
            Event::Served { name, .. } => write!(f, "{} is served to customer", name),
            Event::StoppedTakingOrders => write!(f, "------Waiters stopped taking orders------"),
            Event::KitchenClosed => write!(f, "----Kitchen is closed----"),
            Event::AllServed => write!(f, "------No more food is left to serve------"),
        }
    }
}

/// Destination for pipeline events.
///
/// Called concurrently from the submitter, preparer and server threads.
pub trait EventSink: Send + Sync {
    /// Deliver one event
    fn emit(&self, event: Event);
}

/// Prints each event as a line on stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    timestamps: bool,
}

impl ConsoleSink {
    /// Create a console sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every line with the wall-clock time
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: Event) {
        let mut out = std::io::stdout().lock();
        let written = if self.timestamps {
            writeln!(out, "[{}] {}", Utc::now().format("%H:%M:%S%.3f"), event)
        } else {
            writeln!(out, "{}", event)
        };
        if let Err(e) = written {
            log::warn!("failed to write event to stdout: {}", e);
        }
    }
}

/// An event together with the moment it was recorded.
#[derive(Clone, Debug, Serialize)]
pub struct RecordedEvent {
    /// When the sink received the event
    pub at: DateTime<Utc>,
    /// The event
    pub event: Event,
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingSink {
    /// Create an empty recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().iter().map(|r| r.event.clone()).collect()
    }

    /// Snapshot including timestamps
    pub fn recorded(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events matching `pred`
    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|r| pred(&r.event)).count()
    }

    /// Events concerning one item, in arrival order
    pub fn events_for(&self, id: Uuid) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|r| r.event.item_id() == Some(id))
            .map(|r| r.event.clone())
            .collect()
    }

    /// Ids of items in the order they produced events matching `pred`
    pub fn ids_where(&self, pred: impl Fn(&Event) -> bool) -> Vec<Uuid> {
        self.events
            .lock()
            .iter()
            .filter(|r| pred(&r.event))
            .filter_map(|r| r.event.item_id())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        self.events.lock().push(RecordedEvent {
            at: Utc::now(),
            event,
        });
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_lines() {
        let id = Uuid::new_v4();
        let ordered = Event::Ordered {
            id,
            name: "Plain Pasta".to_string(),
        };
        assert_eq!(ordered.to_string(), "Plain Pasta is ordered by a customer.");

        let preparing = Event::Preparing {
            id,
            name: "Plain Pasta".to_string(),
            action: PrepAction::Boiling,
        };
        assert_eq!(preparing.to_string(), "Plain Pasta is getting prepared.[Boiling]");
        assert_eq!(Event::KitchenClosed.to_string(), "----Kitchen is closed----");
    }

    #[test]
    fn test_item_id() {
        let id = Uuid::new_v4();
        let served = Event::Served {
            id,
            name: "x".to_string(),
        };
        assert_eq!(served.item_id(), Some(id));
        assert_eq!(Event::StoppedTakingOrders.item_id(), None);
    }

    #[test]
    fn test_recording_sink_filters() {
        let sink = RecordingSink::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        sink.emit(Event::Opened);
        sink.emit(Event::Ordered {
            id: a,
            name: "A".to_string(),
        });
        sink.emit(Event::Ordered {
            id: b,
            name: "B".to_string(),
        });
        sink.emit(Event::Served {
            id: a,
            name: "A".to_string(),
        });

        assert_eq!(sink.events().len(), 4);
        assert_eq!(sink.count(|e| matches!(e, Event::Ordered { .. })), 2);
        assert_eq!(sink.events_for(a).len(), 2);
        assert_eq!(
            sink.ids_where(|e| matches!(e, Event::Ordered { .. })),
            vec![a, b]
        );
        assert!(sink.recorded()[0].at <= sink.recorded()[3].at);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(Event::KitchenClosed).unwrap();
        assert_eq!(json["event"], "kitchen_closed");
    }
}
