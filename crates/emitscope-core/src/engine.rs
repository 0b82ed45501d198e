//! The interception engine.
//!
//! The engine keeps a registry in step with its emitter. Two hooks listen to
//! the emitter's lifecycle notifications:
//!
//! - the `newListener` hook starts tracking an event (installing its
//!   [`RecordingProxy`]) or appends a handler record;
//! - the `removeListener` hook drops handler records and tears the proxy
//!   down once it is the only listener left.
//!
//! Every real emission of a tracked event reaches the proxy, which records
//! it and then re-emits to the proxy's subscribers. Lifecycle events have no
//! proxy; the hooks record their emissions directly.
//!
//! No registry lock is held while calling into the emitter or subscribers.

use std::sync::{Arc, Weak};

use tracing::{debug, trace, warn};

use emitscope_emitter::{Arg, EventName, Listener};

use crate::proxy::RecordingProxy;
use crate::record::EventRecord;
use crate::registry::Shared;

/// Track the emitter's current listeners and register the lifecycle hooks.
pub(crate) fn attach(shared: &Arc<Shared>) {
    let emitter = Arc::clone(&shared.emitter);
    for event in emitter.event_names() {
        for listener in emitter.listeners(&event) {
            on_new_listener(shared, &event, &listener);
        }
    }

    let hooks = [
        (
            EventName::remove_listener(),
            remove_listener_hook(Arc::downgrade(shared)),
        ),
        (
            EventName::new_listener(),
            new_listener_hook(Arc::downgrade(shared)),
        ),
    ];
    for (event, hook) in hooks {
        emitter.on(event.clone(), hook.clone());
        // Registered before the hook could see its own notification.
        on_new_listener(shared, &event, &hook);
        shared.hooks.lock().push((event, hook));
    }
}

fn new_listener_hook(shared: Weak<Shared>) -> Listener {
    Listener::named("emitscope::new_listener_hook", move |args| {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        record_lifecycle(&shared, &EventName::new_listener(), args);
        if let Some((event, listener)) = notification(args) {
            on_new_listener(&shared, event, listener);
        }
    })
}

fn remove_listener_hook(shared: Weak<Shared>) -> Listener {
    Listener::named("emitscope::remove_listener_hook", move |args| {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        if let Some((event, listener)) = notification(args) {
            on_remove_listener(&shared, event, listener);
        }
        record_lifecycle(&shared, &EventName::remove_listener(), args);
    })
}

/// Unpack `[Event, Listener]` notification arguments.
fn notification(args: &[Arg]) -> Option<(&EventName, &Listener)> {
    match args {
        [Arg::Event(event), Arg::Listener(listener), ..] => Some((event, listener)),
        _ => None,
    }
}

/// A listener is about to be added to `event`.
pub(crate) fn on_new_listener(shared: &Arc<Shared>, event: &EventName, listener: &Listener) {
    let install = {
        let mut guard = shared.state.lock();
        let state = &mut *guard;
        if state.is_proxy(listener.id())
            || state.config.is_event_excluded(event)
            || state.config.is_handler_excluded(listener.id())
        {
            return;
        }

        match state.records.get_mut(event) {
            Some(record) if record.is_active() => {
                record.add_handler(listener.clone());
                debug!(event = %event, handler = %listener, "Handler tracked");
                None
            }
            Some(record) => {
                record.add_handler(listener.clone());
                let proxy = record.has_proxy.then(|| {
                    RecordingProxy::new(
                        Arc::downgrade(shared),
                        event.clone(),
                        &state.global_subscribers,
                    )
                });
                record.activate(proxy.clone());
                debug!(event = %event, handler = %listener, "Retained event reactivated");
                proxy
            }
            None => {
                let has_proxy = !event.is_lifecycle();
                let proxy = has_proxy.then(|| {
                    RecordingProxy::new(
                        Arc::downgrade(shared),
                        event.clone(),
                        &state.global_subscribers,
                    )
                });
                match state.add_event(event.clone(), listener.clone(), has_proxy) {
                    Ok(record) => record.activate(proxy.clone()),
                    Err(error) => {
                        warn!(event = %event, error = %error, "Could not track event");
                        return;
                    }
                }
                proxy
            }
        }
    };

    // The proxy is already in the registry, so its own notification is ignored.
    if let Some(proxy) = install {
        debug!(event = %event, proxy = %proxy.id(), "Recording proxy installed");
        shared.emitter.on(event.clone(), proxy.listener().clone());
    }
}

/// A listener was removed from `event`.
pub(crate) fn on_remove_listener(shared: &Arc<Shared>, event: &EventName, listener: &Listener) {
    let proxy = {
        let mut guard = shared.state.lock();
        let state = &mut *guard;
        let Some(record) = state.records.get_mut(event) else {
            return;
        };
        if record.proxy_id() == Some(listener.id()) {
            // The proxy went before the handlers it was recording.
            if record.is_active() {
                debug!(event = %event, proxy = %listener.id(), "Recording proxy removed");
                state.remove_event(event);
            }
            return;
        }
        if record.remove_handler(listener.id()) {
            debug!(event = %event, handler = %listener, "Handler untracked");
        }
        if !record.is_active() {
            return;
        }

        if !record.has_proxy {
            if record.handlers.is_empty() {
                state.remove_event(event);
            }
            return;
        }
        match record.proxy.clone() {
            Some(proxy) => proxy,
            None => return,
        }
    };

    let remaining = shared.emitter.listeners(event);
    let proxy_attached = remaining.iter().any(|l| l.id() == proxy.id());
    if proxy_attached && remaining.len() > 1 {
        return;
    }
    if proxy_attached {
        // Retires the record through the proxy's own notification.
        shared.emitter.remove_listener(event, proxy.listener());
    }

    let mut state = shared.state.lock();
    let still_owned = state
        .event_details(event)
        .is_some_and(|record| record.proxy_id() == Some(proxy.id()));
    if still_owned {
        debug!(event = %event, proxy = %proxy.id(), "Recording proxy missing, event retired");
        state.remove_event(event);
    }
}

/// Called by a recording proxy for every real emission.
pub(crate) fn on_emission(shared: &Shared, event: &EventName, args: &[Arg]) {
    let Some(snapshot) = record_emission(shared, event, args, true) else {
        return;
    };
    trace!(
        emitter = %shared.id,
        event = %event,
        times_emitted = snapshot.times_emitted,
        "Emission recorded"
    );

    // Statistics are already updated when subscribers run.
    if let Some(proxy) = snapshot.proxy() {
        proxy.dispatcher().emit(event, &snapshot);
    }
}

/// Record an emission of a lifecycle event observed by one of the hooks.
fn record_lifecycle(shared: &Shared, event: &EventName, args: &[Arg]) {
    if let Some(snapshot) = record_emission(shared, event, args, false) {
        trace!(
            emitter = %shared.id,
            event = %event,
            times_emitted = snapshot.times_emitted,
            "Lifecycle emission recorded"
        );
    }
}

fn record_emission(
    shared: &Shared,
    event: &EventName,
    args: &[Arg],
    has_proxy: bool,
) -> Option<EventRecord> {
    let tracked = |record: &EventRecord| record.is_active() && record.has_proxy == has_proxy;

    if !shared.state.lock().event_details(event).is_some_and(tracked) {
        return None;
    }
    // Lifecycle bookkeeping runs on every listener change; only real
    // emissions pay for a capture.
    let stack = has_proxy.then(|| Arc::new(shared.capture.capture(0)));

    let mut state = shared.state.lock();
    if !state.event_details(event).is_some_and(tracked) {
        return None;
    }
    state.note_emitted(event);
    let record = state.records.get_mut(event)?;
    record.record_emission(args, stack);
    Some(record.clone())
}
