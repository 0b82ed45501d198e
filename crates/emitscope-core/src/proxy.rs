//! Recording proxies.
//!
//! A [`RecordingProxy`] is the one listener the engine registers on the
//! wrapped emitter for each tracked event. It is a pair of capabilities:
//!
//! - a [`Listener`] the emitter calls like any other, which updates the
//!   registry's statistics;
//! - an [`EmissionDispatcher`] that re-emits each observed emission to
//!   secondary subscribers once the statistics are up to date.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use emitscope_emitter::{EventName, Listener, ListenerId};

use crate::engine;
use crate::record::EventRecord;
use crate::registry::Shared;

/// Secondary observer of a tracked event.
pub trait EmissionSubscriber: Send + Sync {
    /// Called after the statistics for an emission have been recorded.
    fn on_emission(&self, event: &EventName, record: &EventRecord);

    /// Events this subscriber is interested in.
    /// Returns `None` to receive all events.
    fn event_filter(&self) -> Option<Vec<EventName>> {
        None
    }
}

/// Fan-out of emissions to secondary subscribers.
#[derive(Default)]
pub struct EmissionDispatcher {
    subscribers: RwLock<Vec<Arc<dyn EmissionSubscriber>>>,
}

impl EmissionDispatcher {
    /// Create a dispatcher with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn EmissionSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// Remove all subscribers.
    pub fn clear_subscribers(&self) {
        self.subscribers.write().clear();
    }

    /// Get subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Deliver an emission to every interested subscriber.
    pub fn emit(&self, event: &EventName, record: &EventRecord) {
        // Snapshot so subscribers may subscribe or query the registry.
        let subscribers = self.subscribers.read().clone();
        for subscriber in subscribers {
            if let Some(filter) = subscriber.event_filter() {
                if !filter.contains(event) {
                    continue;
                }
            }
            subscriber.on_emission(event, record);
        }
    }
}

impl std::fmt::Debug for EmissionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmissionDispatcher")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// The listener installed on the wrapped emitter for one tracked event.
#[derive(Clone)]
pub struct RecordingProxy {
    listener: Listener,
    dispatcher: Arc<EmissionDispatcher>,
}

impl RecordingProxy {
    pub(crate) fn new(
        shared: Weak<Shared>,
        event: EventName,
        subscribers: &[Arc<dyn EmissionSubscriber>],
    ) -> Self {
        let dispatcher = Arc::new(EmissionDispatcher::new());
        for subscriber in subscribers {
            dispatcher.subscribe(Arc::clone(subscriber));
        }

        let listener = Listener::named(format!("emitscope::proxy[{}]", event), move |args| {
            if let Some(shared) = shared.upgrade() {
                engine::on_emission(&shared, &event, args);
            }
        });

        Self {
            listener,
            dispatcher,
        }
    }

    /// Identity of the installed listener.
    pub fn id(&self) -> ListenerId {
        self.listener.id()
    }

    /// Subscribe to emissions observed by this proxy.
    pub fn subscribe(&self, subscriber: Arc<dyn EmissionSubscriber>) {
        self.dispatcher.subscribe(subscriber);
    }

    /// Number of secondary subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.dispatcher.subscriber_count()
    }

    pub(crate) fn listener(&self) -> &Listener {
        &self.listener
    }

    pub(crate) fn dispatcher(&self) -> &Arc<EmissionDispatcher> {
        &self.dispatcher
    }
}

impl std::fmt::Debug for RecordingProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingProxy")
            .field("id", &self.id())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
