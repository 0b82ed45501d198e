//! One-call tracking of a single event.

use std::sync::Arc;

use emitscope_emitter::{Emitter, EventName, Listener};

use crate::config::TrackerConfig;
use crate::error::TrackerResult;
use crate::record::EventRecord;
use crate::registry::EmitterRegistry;

/// Handle returned by [`track_event`].
#[derive(Debug)]
pub struct TrackedEvent {
    registry: EmitterRegistry,
    event: EventName,
}

impl TrackedEvent {
    /// Current statistics for the tracked event.
    pub fn details(&self) -> Option<EventRecord> {
        self.registry.event_details(&self.event)
    }

    /// The registry behind this handle.
    pub fn registry(&self) -> &EmitterRegistry {
        &self.registry
    }

    /// The tracked event.
    pub fn event(&self) -> &EventName {
        &self.event
    }

    /// Take ownership of the registry.
    pub fn into_registry(self) -> EmitterRegistry {
        self.registry
    }
}

/// Track an event that may not have listeners yet.
///
/// A no-op listener is registered before the emitter is wrapped, so the
/// event is tracked from the first emission.
pub fn track_event<E: Emitter + 'static>(
    emitter: Arc<E>,
    event: impl Into<EventName>,
) -> TrackerResult<TrackedEvent> {
    let event = event.into();
    emitter.on(event.clone(), Listener::named("emitscope::track_event", |_| {}));
    let registry = EmitterRegistry::wrap(emitter, TrackerConfig::default())?;
    Ok(TrackedEvent { registry, event })
}
