//! The emitter contract and its standard implementation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{trace, warn};

use crate::listener::{Arg, Listener, ListenerId};
use crate::name::EventName;

/// Default per-event listener count above which a leak warning is logged.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// A synchronous publish/subscribe emitter.
///
/// Implementations must:
///
/// - dispatch [`emit`](Emitter::emit) synchronously, in registration order;
/// - emit `newListener(event, listener)` *before* a listener is added;
/// - emit `removeListener(event, listener)` *after* a listener is removed;
/// - not hold internal locks while calling listeners, so listeners may
///   add or remove listeners on the same emitter.
pub trait Emitter: Send + Sync {
    /// Register a listener for an event.
    fn on(&self, event: EventName, listener: Listener);

    /// Remove the first registration of `listener` for `event`.
    ///
    /// Returns `true` if a registration was removed.
    fn remove_listener(&self, event: &EventName, listener: &Listener) -> bool;

    /// Get the listeners for an event, in registration order.
    fn listeners(&self, event: &EventName) -> Vec<Listener>;

    /// Call every listener of `event` with `args`.
    ///
    /// Returns `true` if the event had listeners.
    fn emit(&self, event: &EventName, args: &[Arg]) -> bool;

    /// Get the names of all events with listeners, in first-registration order.
    fn event_names(&self) -> Vec<EventName>;

    /// Get the number of listeners for an event.
    fn listener_count(&self, event: &EventName) -> usize {
        self.listeners(event).len()
    }

    /// Remove every listener of an event, one notification per listener,
    /// most recently registered first.
    fn remove_all_listeners(&self, event: &EventName) {
        for listener in self.listeners(event).iter().rev() {
            self.remove_listener(event, listener);
        }
    }
}

/// Listener table with stable event ordering.
#[derive(Default)]
struct Registrations {
    listeners: HashMap<EventName, Vec<Listener>>,
    order: Vec<EventName>,
}

impl Registrations {
    fn push(&mut self, event: EventName, listener: Listener) -> usize {
        let slot = self.listeners.entry(event.clone()).or_insert_with(|| {
            self.order.push(event);
            Vec::new()
        });
        slot.push(listener);
        slot.len()
    }

    fn remove_first(&mut self, event: &EventName, id: ListenerId) -> bool {
        let Some(slot) = self.listeners.get_mut(event) else {
            return false;
        };
        let Some(index) = slot.iter().position(|l| l.id() == id) else {
            return false;
        };
        slot.remove(index);
        if slot.is_empty() {
            self.listeners.remove(event);
            self.order.retain(|name| name != event);
        }
        true
    }

    fn get(&self, event: &EventName) -> Vec<Listener> {
        self.listeners.get(event).cloned().unwrap_or_default()
    }
}

/// The standard [`Emitter`] implementation.
///
/// # Example
///
/// ```ignore
/// use emitscope_emitter::{Arg, Emitter, EventEmitter, Listener};
///
/// let emitter = EventEmitter::new();
/// emitter.on("data".into(), Listener::new(|args| println!("{:?}", args)));
/// emitter.emit(&"data".into(), &[Arg::from("hello")]);
/// ```
pub struct EventEmitter {
    registrations: RwLock<Registrations>,
    max_listeners: AtomicUsize,
    warned: Mutex<HashSet<EventName>>,
}

impl EventEmitter {
    /// Create an emitter with the default listener limit.
    pub fn new() -> Self {
        Self {
            registrations: RwLock::new(Registrations::default()),
            max_listeners: AtomicUsize::new(DEFAULT_MAX_LISTENERS),
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// Set the listener limit. `0` disables the leak warning.
    pub fn with_max_listeners(self, max: usize) -> Self {
        self.set_max_listeners(max);
        self
    }

    /// Set the listener limit. `0` disables the leak warning.
    pub fn set_max_listeners(&self, max: usize) {
        self.max_listeners.store(max, Ordering::Relaxed);
    }

    /// Get the listener limit.
    pub fn max_listeners(&self) -> usize {
        self.max_listeners.load(Ordering::Relaxed)
    }

    fn check_listener_limit(&self, event: &EventName, count: usize) {
        let max = self.max_listeners();
        if max == 0 || count <= max {
            return;
        }
        if self.warned.lock().insert(event.clone()) {
            warn!(
                event = %event,
                count = count,
                max = max,
                "Possible listener leak: listener count exceeds limit"
            );
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter for EventEmitter {
    fn on(&self, event: EventName, listener: Listener) {
        self.emit(
            &EventName::new_listener(),
            &[Arg::Event(event.clone()), Arg::Listener(listener.clone())],
        );

        let count = self.registrations.write().push(event.clone(), listener);
        self.check_listener_limit(&event, count);
    }

    fn remove_listener(&self, event: &EventName, listener: &Listener) -> bool {
        let removed = self.registrations.write().remove_first(event, listener.id());
        if removed {
            self.emit(
                &EventName::remove_listener(),
                &[Arg::Event(event.clone()), Arg::Listener(listener.clone())],
            );
        }
        removed
    }

    fn listeners(&self, event: &EventName) -> Vec<Listener> {
        self.registrations.read().get(event)
    }

    fn emit(&self, event: &EventName, args: &[Arg]) -> bool {
        // Dispatch to a snapshot so listeners can modify the table.
        let listeners = self.listeners(event);
        trace!(event = %event, listeners = listeners.len(), "Emitting");
        for listener in &listeners {
            listener.call(args);
        }
        !listeners.is_empty()
    }

    fn event_names(&self) -> Vec<EventName> {
        self.registrations.read().order.clone()
    }

    fn listener_count(&self, event: &EventName) -> usize {
        self.registrations
            .read()
            .listeners
            .get(event)
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("events", &self.event_names())
            .field("max_listeners", &self.max_listeners())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Listener {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Listener::named(tag.clone(), move |args| {
            let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            log.lock().push(format!("{}:{}", tag, rendered.join(",")));
        })
    }

    #[test]
    fn test_emit_in_registration_order() {
        let emitter = EventEmitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        emitter.on("data".into(), recorder(&log, "a"));
        emitter.on("data".into(), recorder(&log, "b"));

        assert!(emitter.emit(&"data".into(), &[Arg::from(1), Arg::from("x")]));
        assert_eq!(*log.lock(), vec!["a:1,\"x\"", "b:1,\"x\""]);
    }

    #[test]
    fn test_emit_without_listeners() {
        let emitter = EventEmitter::new();
        assert!(!emitter.emit(&"nothing".into(), &[]));
    }

    #[test]
    fn test_new_listener_fires_before_add() {
        let emitter = Arc::new(EventEmitter::new());
        let counts = Arc::new(Mutex::new(Vec::new()));

        let watcher = {
            let emitter = Arc::clone(&emitter);
            let counts = Arc::clone(&counts);
            Listener::new(move |args| {
                let event = args[0].as_event().unwrap().clone();
                counts.lock().push(emitter.listener_count(&event));
            })
        };
        emitter.on(EventName::new_listener(), watcher);
        emitter.on("data".into(), Listener::noop());
        emitter.on("data".into(), Listener::noop());

        assert_eq!(*counts.lock(), vec![0, 1]);
    }

    #[test]
    fn test_remove_listener_fires_after_remove() {
        let emitter = Arc::new(EventEmitter::new());
        let counts = Arc::new(Mutex::new(Vec::new()));

        let watcher = {
            let emitter = Arc::clone(&emitter);
            let counts = Arc::clone(&counts);
            Listener::new(move |args| {
                let event = args[0].as_event().unwrap().clone();
                counts.lock().push(emitter.listener_count(&event));
            })
        };
        emitter.on(EventName::remove_listener(), watcher);

        let handler = Listener::noop();
        emitter.on("data".into(), handler.clone());
        assert!(emitter.remove_listener(&"data".into(), &handler));
        assert!(!emitter.remove_listener(&"data".into(), &handler));

        assert_eq!(*counts.lock(), vec![0]);
    }

    #[test]
    fn test_remove_first_registration_only() {
        let emitter = EventEmitter::new();
        let handler = Listener::noop();

        emitter.on("data".into(), handler.clone());
        emitter.on("data".into(), handler.clone());
        emitter.remove_listener(&"data".into(), &handler);

        assert_eq!(emitter.listener_count(&"data".into()), 1);
    }

    #[test]
    fn test_event_names_order() {
        let emitter = EventEmitter::new();
        let once = Listener::noop();

        emitter.on("b".into(), Listener::noop());
        emitter.on("a".into(), once.clone());
        emitter.on("c".into(), Listener::noop());
        emitter.remove_listener(&"a".into(), &once);

        assert_eq!(
            emitter.event_names(),
            vec![EventName::from("b"), EventName::from("c")]
        );
    }

    #[test]
    fn test_remove_all_listeners() {
        let emitter = EventEmitter::new();
        emitter.on("data".into(), Listener::noop());
        emitter.on("data".into(), Listener::noop());

        emitter.remove_all_listeners(&"data".into());

        assert_eq!(emitter.listener_count(&"data".into()), 0);
        assert!(emitter.event_names().is_empty());
    }

    #[test]
    fn test_remove_all_listeners_last_first() {
        let emitter = EventEmitter::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        emitter.on("data".into(), Listener::named("a", |_| {}));
        emitter.on("data".into(), Listener::named("b", |_| {}));
        {
            let log = Arc::clone(&log);
            emitter.on(
                EventName::remove_listener(),
                Listener::new(move |args| {
                    if let [_, Arg::Listener(removed), ..] = args {
                        log.lock().push(removed.name().unwrap_or_default().to_string());
                    }
                }),
            );
        }

        emitter.remove_all_listeners(&"data".into());

        assert_eq!(*log.lock(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_listener_may_modify_emitter() {
        let emitter = Arc::new(EventEmitter::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let late = {
            let hits = Arc::clone(&hits);
            Listener::new(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        let adder = {
            let emitter = Arc::clone(&emitter);
            Listener::new(move |_| emitter.on("data".into(), late.clone()))
        };
        emitter.on("data".into(), adder);

        // The listener added during dispatch only runs on the next emission.
        emitter.emit(&"data".into(), &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        emitter.emit(&"data".into(), &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_max_listeners() {
        let emitter = EventEmitter::new().with_max_listeners(1);
        emitter.on("data".into(), Listener::noop());
        emitter.on("data".into(), Listener::noop());

        assert_eq!(emitter.max_listeners(), 1);
        assert!(emitter.warned.lock().contains(&EventName::from("data")));
    }
}
