//! The emitter registry.
//!
//! An [`EmitterRegistry`] is the handle returned when an emitter is wrapped.
//! It owns every [`EventRecord`] for that emitter; the emitter itself only
//! holds the engine's hook and proxy listeners, which refer back to the
//! registry weakly. Dropping the registry therefore leaves those listeners
//! inert rather than keeping statistics alive.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use emitscope_emitter::{Emitter, EventName, Listener, ListenerId};
use emitscope_trace::{BacktraceCapture, TraceCapture};

use crate::config::TrackerConfig;
use crate::engine;
use crate::error::{TrackerError, TrackerResult};
use crate::proxy::{EmissionSubscriber, RecordingProxy};
use crate::record::EventRecord;

/// Unique identifier for a wrapped emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmitterId(Uuid);

impl EmitterId {
    /// Create a new random emitter ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EmitterId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EmitterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable bookkeeping behind the registry lock.
#[derive(Default)]
pub(crate) struct RegistryState {
    pub(crate) config: TrackerConfig,
    pub(crate) emitted_event_names: Vec<EventName>,
    pub(crate) records: HashMap<EventName, EventRecord>,
    pub(crate) global_subscribers: Vec<Arc<dyn EmissionSubscriber>>,
}

impl RegistryState {
    pub(crate) fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub(crate) fn event_details(&self, name: &EventName) -> Option<&EventRecord> {
        self.records.get(name)
    }

    /// Start tracking an event with its first handler.
    pub(crate) fn add_event(
        &mut self,
        name: EventName,
        first_handler: Listener,
        has_proxy: bool,
    ) -> TrackerResult<&mut EventRecord> {
        if self.records.contains_key(&name) {
            return Err(TrackerError::AlreadyTracked(name));
        }
        debug!(event = %name, has_proxy = has_proxy, "Event tracked");
        let record = EventRecord::new(name.clone(), first_handler, has_proxy);
        Ok(self.records.entry(name).or_insert(record))
    }

    /// Retire an event whose last listener is gone: delete its record, or
    /// keep it inactive when retention is enabled.
    pub(crate) fn remove_event(&mut self, name: &EventName) {
        if self.config.save_inactive_event_details {
            if let Some(record) = self.records.get_mut(name) {
                record.deactivate();
                debug!(event = %name, "Event inactive, details retained");
            }
        } else if self.records.remove(name).is_some() {
            debug!(event = %name, "Event untracked");
        }
    }

    /// Delete a record regardless of retention.
    pub(crate) fn discard_event(&mut self, name: &EventName) -> Option<EventRecord> {
        self.records.remove(name)
    }

    /// Check whether a listener is one of this registry's proxies.
    pub(crate) fn is_proxy(&self, id: ListenerId) -> bool {
        self.records.values().any(|r| r.proxy_id() == Some(id))
    }

    pub(crate) fn note_emitted(&mut self, name: &EventName) {
        if !self.emitted_event_names.contains(name) {
            self.emitted_event_names.push(name.clone());
        }
    }
}

/// State shared between the registry handle and the listeners the engine
/// installs on the emitter.
pub(crate) struct Shared {
    pub(crate) id: EmitterId,
    pub(crate) emitter: Arc<dyn Emitter>,
    pub(crate) capture: Arc<dyn TraceCapture>,
    pub(crate) state: Mutex<RegistryState>,
    pub(crate) hooks: Mutex<Vec<(EventName, Listener)>>,
}

/// Capture excluding the instrumentation's own frames.
pub fn instrumentation_capture() -> BacktraceCapture {
    BacktraceCapture::new()
        .with_excluded_prefix("emitscope_core::")
        .with_excluded_prefix("<emitscope_core::")
        .with_excluded_prefix("emitscope_emitter::listener::")
        .with_excluded_prefix("core::ops::function::")
        .with_excluded_prefix("<alloc::boxed::Box<F")
}

/// Live statistics for one wrapped emitter.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use emitscope_core::{EmitterRegistry, TrackerConfig};
/// use emitscope_emitter::{Arg, Emitter, EventEmitter, Listener};
///
/// let emitter = Arc::new(EventEmitter::new());
/// let registry = EmitterRegistry::wrap(Arc::clone(&emitter), TrackerConfig::default())?;
///
/// emitter.on("data".into(), Listener::new(|_| {}));
/// emitter.emit(&"data".into(), &[Arg::from(1)]);
///
/// let details = registry.event_details(&"data".into()).unwrap();
/// assert_eq!(details.times_emitted, 1);
/// ```
pub struct EmitterRegistry {
    shared: Arc<Shared>,
}

impl EmitterRegistry {
    /// Wrap an emitter, capturing real stack traces.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn wrap<E: Emitter + 'static>(emitter: Arc<E>, config: TrackerConfig) -> TrackerResult<Self> {
        Self::wrap_with_capture(emitter, config, Arc::new(instrumentation_capture()))
    }

    /// Wrap an emitter with a custom stack capture.
    pub fn wrap_with_capture<E: Emitter + 'static>(
        emitter: Arc<E>,
        config: TrackerConfig,
        capture: Arc<dyn TraceCapture>,
    ) -> TrackerResult<Self> {
        config.validate()?;

        let emitter: Arc<dyn Emitter> = emitter;
        let shared = Arc::new(Shared {
            id: EmitterId::new(),
            emitter,
            capture,
            state: Mutex::new(RegistryState::new(config)),
            hooks: Mutex::new(Vec::new()),
        });

        engine::attach(&shared);

        info!(
            emitter = %shared.id,
            events = shared.state.lock().records.len(),
            "Emitter wrapped"
        );
        Ok(Self { shared })
    }

    /// Get the registry's ID.
    pub fn id(&self) -> EmitterId {
        self.shared.id
    }

    /// Get the wrapped emitter.
    pub fn emitter(&self) -> &Arc<dyn Emitter> {
        &self.shared.emitter
    }

    /// Get a copy of the current configuration.
    pub fn config(&self) -> TrackerConfig {
        self.shared.state.lock().config.clone()
    }

    /// Get a snapshot of an event's record.
    pub fn event_details(&self, name: &EventName) -> Option<EventRecord> {
        self.shared.state.lock().event_details(name).cloned()
    }

    /// Get snapshots of every record, ordered by event name.
    pub fn events(&self) -> Vec<EventRecord> {
        let mut records: Vec<EventRecord> =
            self.shared.state.lock().records.values().cloned().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }

    /// Get the names of all tracked events, ordered by name.
    pub fn tracked_names(&self) -> Vec<EventName> {
        let mut names: Vec<EventName> = self.shared.state.lock().records.keys().cloned().collect();
        names.sort();
        names
    }

    /// Events that have fired at least once, in first-seen order.
    pub fn emitted_event_names(&self) -> Vec<EventName> {
        self.shared.state.lock().emitted_event_names.clone()
    }

    /// Stop tracking an event.
    ///
    /// Any record is deleted and its proxy removed from the emitter, even
    /// when retention is enabled. Later listeners for the event are ignored
    /// until [`include_event`](Self::include_event) is called.
    pub fn exclude_event(&self, name: impl Into<EventName>) -> &Self {
        let name = name.into();
        let proxy = {
            let mut state = self.shared.state.lock();
            if !state.config.excluded_events.insert(name.clone()) {
                return self;
            }
            state.discard_event(&name).and_then(|record| record.proxy)
        };

        if let Some(proxy) = proxy {
            self.shared.emitter.remove_listener(&name, proxy.listener());
        }
        debug!(emitter = %self.shared.id, event = %name, "Event excluded");
        self
    }

    /// Stop tracking a handler on every event.
    ///
    /// An event left without tracked handlers is retired as if its last
    /// handler had been removed.
    pub fn exclude_handler(&self, handler: ListenerId) -> &Self {
        let emptied = {
            let mut guard = self.shared.state.lock();
            let state = &mut *guard;
            if !state.config.excluded_handlers.insert(handler) {
                return self;
            }

            let mut emptied = Vec::new();
            for (name, record) in state.records.iter_mut() {
                if record.remove_handlers(handler) > 0
                    && record.handlers.is_empty()
                    && record.is_active()
                {
                    emptied.push((name.clone(), record.proxy.clone()));
                }
            }
            emptied
        };

        for (name, proxy) in emptied {
            if let Some(proxy) = proxy {
                self.shared.emitter.remove_listener(&name, proxy.listener());
            }
            self.shared.state.lock().remove_event(&name);
        }
        debug!(emitter = %self.shared.id, handler = %handler, "Handler excluded");
        self
    }

    /// Lift an event exclusion. Only listeners added afterwards are tracked.
    pub fn include_event(&self, name: &EventName) -> &Self {
        self.shared.state.lock().config.excluded_events.remove(name);
        self
    }

    /// Lift a handler exclusion. Only attachments made afterwards are tracked.
    pub fn include_handler(&self, handler: ListenerId) -> &Self {
        self.shared.state.lock().config.excluded_handlers.remove(&handler);
        self
    }

    /// Subscribe to emissions of one tracked event.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotTracked`] if the event has no active
    /// recording proxy (untracked, inactive, or a lifecycle event).
    pub fn subscribe(
        &self,
        name: &EventName,
        subscriber: Arc<dyn EmissionSubscriber>,
    ) -> TrackerResult<()> {
        let state = self.shared.state.lock();
        match state.event_details(name).and_then(EventRecord::proxy) {
            Some(proxy) => {
                proxy.subscribe(subscriber);
                Ok(())
            }
            None => Err(TrackerError::NotTracked(name.clone())),
        }
    }

    /// Subscribe to emissions of every current and future tracked event.
    pub fn subscribe_all(&self, subscriber: Arc<dyn EmissionSubscriber>) {
        let mut state = self.shared.state.lock();
        for proxy in state.records.values().filter_map(EventRecord::proxy) {
            proxy.subscribe(Arc::clone(&subscriber));
        }
        state.global_subscribers.push(subscriber);
    }

    /// Remove every hook and proxy from the emitter.
    ///
    /// Records remain readable and are marked inactive; nothing is
    /// recorded afterwards.
    pub fn detach(&self) {
        let hooks = std::mem::take(&mut *self.shared.hooks.lock());
        for (event, hook) in hooks.iter().rev() {
            self.shared.emitter.remove_listener(event, hook);
        }

        let proxies: Vec<(EventName, RecordingProxy)> = {
            let mut state = self.shared.state.lock();
            state
                .records
                .iter_mut()
                .filter_map(|(name, record)| {
                    let proxy = record.proxy.take();
                    record.deactivate();
                    proxy.map(|p| (name.clone(), p))
                })
                .collect()
        };
        for (event, proxy) in &proxies {
            self.shared.emitter.remove_listener(event, proxy.listener());
        }

        info!(emitter = %self.shared.id, proxies = proxies.len(), "Emitter detached");
    }
}

impl std::fmt::Debug for EmitterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitterRegistry")
            .field("id", &self.shared.id)
            .field("tracked", &self.tracked_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emitscope_emitter::{Arg, EventEmitter};
    use emitscope_trace::SequenceCapture;

    fn wrap(emitter: &Arc<EventEmitter>, config: TrackerConfig) -> EmitterRegistry {
        EmitterRegistry::wrap_with_capture(Arc::clone(emitter), config, Arc::new(SequenceCapture::new()))
            .unwrap()
    }

    #[test]
    fn test_instrumentation_capture_exclusions() {
        let capture = instrumentation_capture();
        assert!(capture.is_excluded("<alloc::boxed::Box<F,A> as core::ops::function::Fn<Args>>::call"));
        assert!(capture.is_excluded("emitscope_core::engine::on_emission"));
        assert!(capture.is_excluded("<emitscope_core::proxy::RecordingProxy>::new::{{closure}}"));
        assert!(!capture.is_excluded("app::worker::Worker::tick"));
        assert!(!capture.is_excluded("<alloc::boxed::Box<dyn app::Job> as app::Job>::run"));
    }

    #[test]
    fn test_add_event_twice_fails() {
        let mut state = RegistryState::new(TrackerConfig::default());
        state
            .add_event(EventName::from("data"), Listener::noop(), true)
            .unwrap();

        let result = state.add_event(EventName::from("data"), Listener::noop(), true);
        assert!(matches!(result, Err(TrackerError::AlreadyTracked(_))));
    }

    #[test]
    fn test_remove_event_respects_retention() {
        let mut state = RegistryState::new(TrackerConfig::default());
        state.add_event(EventName::from("a"), Listener::noop(), true).unwrap();
        state.remove_event(&EventName::from("a"));
        assert!(state.event_details(&EventName::from("a")).is_none());

        let mut state =
            RegistryState::new(TrackerConfig::new().with_save_inactive_event_details(true));
        state.add_event(EventName::from("a"), Listener::noop(), true).unwrap();
        state.remove_event(&EventName::from("a"));
        assert!(!state.event_details(&EventName::from("a")).unwrap().is_active());
    }

    #[test]
    fn test_note_emitted_dedup() {
        let mut state = RegistryState::default();
        state.note_emitted(&EventName::from("b"));
        state.note_emitted(&EventName::from("a"));
        state.note_emitted(&EventName::from("b"));
        assert_eq!(
            state.emitted_event_names,
            vec![EventName::from("b"), EventName::from("a")]
        );
    }

    #[test]
    fn test_invalid_config_fails_at_wrap() {
        let emitter = Arc::new(EventEmitter::new());
        let result = EmitterRegistry::wrap(emitter, TrackerConfig::new().with_excluded_event(""));
        assert!(matches!(result, Err(TrackerError::InvalidConfig(_))));
    }

    #[test]
    fn test_exclude_event_scenario() {
        let emitter = Arc::new(EventEmitter::new());
        let registry = wrap(&emitter, TrackerConfig::default());

        let chained = registry.exclude_event("event2");
        assert!(std::ptr::eq(chained, &registry));

        emitter.on("event1".into(), Listener::noop());
        emitter.on("event2".into(), Listener::noop());
        emitter.on("event3".into(), Listener::noop());
        assert!(registry.event_details(&"event3".into()).is_some());

        registry.exclude_event("event3");

        assert!(registry.event_details(&"event3".into()).is_none());
        assert!(registry.event_details(&"event1".into()).is_some());
        assert!(registry.event_details(&"event2".into()).is_none());
        // Only the user's listener is left on the excluded event.
        assert_eq!(emitter.listener_count(&"event3".into()), 1);
    }

    #[test]
    fn test_exclude_event_is_idempotent() {
        let emitter = Arc::new(EventEmitter::new());
        let registry = wrap(&emitter, TrackerConfig::default());
        emitter.on("data".into(), Listener::noop());

        registry.exclude_event("data").exclude_event("data");

        assert!(registry.event_details(&"data".into()).is_none());
        assert_eq!(emitter.listener_count(&"data".into()), 1);
        assert!(registry.config().is_event_excluded(&"data".into()));
    }

    #[test]
    fn test_exclude_event_ignores_retention() {
        let emitter = Arc::new(EventEmitter::new());
        let registry = wrap(&emitter, TrackerConfig::new().with_save_inactive_event_details(true));
        emitter.on("data".into(), Listener::noop());

        registry.exclude_event("data");

        assert!(registry.event_details(&"data".into()).is_none());
    }

    #[test]
    fn test_include_event_is_not_retroactive() {
        let emitter = Arc::new(EventEmitter::new());
        let registry = wrap(&emitter, TrackerConfig::new().with_excluded_event("data"));
        let early = Listener::noop();
        emitter.on("data".into(), early.clone());

        registry.include_event(&"data".into());
        assert!(registry.event_details(&"data".into()).is_none());

        let late = Listener::noop();
        emitter.on("data".into(), late.clone());
        let record = registry.event_details(&"data".into()).unwrap();
        assert!(record.handler(early.id()).is_none());
        assert!(record.handler(late.id()).is_some());
    }

    #[test]
    fn test_exclude_handler() {
        let emitter = Arc::new(EventEmitter::new());
        let registry = wrap(&emitter, TrackerConfig::default());
        let shared = Listener::noop();
        let other = Listener::noop();

        emitter.on("a".into(), shared.clone());
        emitter.on("a".into(), other.clone());
        emitter.on("b".into(), shared.clone());

        registry.exclude_handler(shared.id()).exclude_handler(shared.id());

        let a = registry.event_details(&"a".into()).unwrap();
        assert!(a.handler(shared.id()).is_none());
        assert!(a.handler(other.id()).is_some());
        // "b" had no other tracked handler left.
        assert!(registry.event_details(&"b".into()).is_none());
        assert_eq!(emitter.listener_count(&"b".into()), 1);

        emitter.on("c".into(), shared.clone());
        assert!(registry.event_details(&"c".into()).is_none());
    }

    #[test]
    fn test_subscribe_requires_proxy() {
        let emitter = Arc::new(EventEmitter::new());
        let registry = wrap(&emitter, TrackerConfig::default());

        struct Nop;
        impl EmissionSubscriber for Nop {
            fn on_emission(&self, _event: &EventName, _record: &EventRecord) {}
        }

        let result = registry.subscribe(&"missing".into(), Arc::new(Nop));
        assert!(matches!(result, Err(TrackerError::NotTracked(_))));

        let result = registry.subscribe(&EventName::new_listener(), Arc::new(Nop));
        assert!(matches!(result, Err(TrackerError::NotTracked(_))));

        emitter.on("data".into(), Listener::noop());
        registry.subscribe(&"data".into(), Arc::new(Nop)).unwrap();
        let record = registry.event_details(&"data".into()).unwrap();
        assert_eq!(record.proxy().map(RecordingProxy::subscriber_count), Some(1));
    }

    #[test]
    fn test_detach() {
        let emitter = Arc::new(EventEmitter::new());
        let registry = wrap(&emitter, TrackerConfig::default());
        let handler = Listener::noop();
        emitter.on("data".into(), handler.clone());
        emitter.emit(&"data".into(), &[]);

        registry.detach();

        assert_eq!(emitter.listeners(&"data".into()), vec![handler.clone()]);
        assert_eq!(emitter.listener_count(&EventName::new_listener()), 0);
        assert_eq!(emitter.listener_count(&EventName::remove_listener()), 0);

        emitter.emit(&"data".into(), &[Arg::from(1)]);
        emitter.on("other".into(), Listener::noop());

        let record = registry.event_details(&"data".into()).unwrap();
        assert_eq!(record.times_emitted, 1);
        assert!(!record.is_active());
        assert!(registry.event_details(&"other".into()).is_none());
    }
}
