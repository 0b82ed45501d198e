//! Ready-made emission subscribers.

use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::Level;

use emitscope_core::{EmissionSubscriber, EventRecord};
use emitscope_emitter::EventName;

/// One observed emission.
#[derive(Debug, Clone, Serialize)]
pub struct Emission {
    /// Event name.
    pub event: EventName,
    /// Event statistics right after the emission was recorded.
    pub record: EventRecord,
}

impl Emission {
    /// Build an emission from the values passed to a subscriber.
    pub fn new(event: &EventName, record: &EventRecord) -> Self {
        Self {
            event: event.clone(),
            record: record.clone(),
        }
    }
}

/// A subscriber that logs every emission through `tracing`.
pub struct LoggingSubscriber {
    /// Level emissions are logged at.
    pub log_level: Level,
}

impl LoggingSubscriber {
    /// Create a new logging subscriber.
    pub fn new() -> Self {
        Self {
            log_level: Level::DEBUG,
        }
    }

    /// Set the log level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }
}

impl Default for LoggingSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl EmissionSubscriber for LoggingSubscriber {
    fn on_emission(&self, event: &EventName, record: &EventRecord) {
        let arguments = record.previous_arguments.len();
        let handlers = record.handlers.len();
        let times_emitted = record.times_emitted;

        match self.log_level {
            Level::ERROR => tracing::error!(event = %event, times_emitted, handlers, arguments, "Event emitted"),
            Level::WARN => tracing::warn!(event = %event, times_emitted, handlers, arguments, "Event emitted"),
            Level::INFO => tracing::info!(event = %event, times_emitted, handlers, arguments, "Event emitted"),
            Level::DEBUG => tracing::debug!(event = %event, times_emitted, handlers, arguments, "Event emitted"),
            _ => tracing::trace!(event = %event, times_emitted, handlers, arguments, "Event emitted"),
        }
    }
}

/// A subscriber that collects emissions for later analysis.
pub struct CollectingSubscriber {
    emissions: RwLock<Vec<(Instant, Emission)>>,
    max_events: usize,
    filter: Option<Vec<EventName>>,
}

impl CollectingSubscriber {
    /// Create a subscriber keeping at most `max_events` emissions.
    pub fn new(max_events: usize) -> Self {
        Self {
            emissions: RwLock::new(Vec::new()),
            max_events,
            filter: None,
        }
    }

    /// Only collect emissions of these events.
    pub fn with_filter(mut self, events: Vec<EventName>) -> Self {
        self.filter = Some(events);
        self
    }

    /// Get collected emissions.
    pub fn emissions(&self) -> Vec<(Instant, Emission)> {
        self.emissions.read().clone()
    }

    /// Clear collected emissions.
    pub fn clear(&self) {
        self.emissions.write().clear();
    }

    /// Get emission count.
    pub fn len(&self) -> usize {
        self.emissions.read().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.emissions.read().is_empty()
    }
}

impl EmissionSubscriber for CollectingSubscriber {
    fn on_emission(&self, event: &EventName, record: &EventRecord) {
        let mut emissions = self.emissions.write();
        if emissions.len() < self.max_events {
            emissions.push((Instant::now(), Emission::new(event, record)));
        }
    }

    fn event_filter(&self) -> Option<Vec<EventName>> {
        self.filter.clone()
    }
}

/// Forwards emissions into a [`tokio::sync::broadcast`] channel.
///
/// Publishing never blocks. Receivers that fall behind by more than the
/// channel capacity get [`RecvError::Lagged`](tokio::sync::broadcast::error::RecvError::Lagged)
/// and skip ahead.
#[cfg(feature = "async")]
#[derive(Clone)]
pub struct BroadcastSubscriber {
    tx: tokio::sync::broadcast::Sender<Emission>,
}

#[cfg(feature = "async")]
impl BroadcastSubscriber {
    /// Create a subscriber with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new receiver.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Emission> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(feature = "async")]
impl EmissionSubscriber for BroadcastSubscriber {
    fn on_emission(&self, event: &EventName, record: &EventRecord) {
        // No receivers is not an error.
        let _ = self.tx.send(Emission::new(event, record));
    }
}
