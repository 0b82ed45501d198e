//! Per-event and per-handler statistics.

use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use emitscope_emitter::{Arg, EventName, Listener, ListenerId};
use emitscope_trace::StackTrace;

use crate::proxy::RecordingProxy;

/// Whether an event record still has live listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventState {
    /// At least one listener is attached and emissions are being recorded.
    Active,
    /// The last listener was removed; statistics are retained but stale.
    Inactive,
}

/// Statistics for one attachment of a handler to an event.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerRecord {
    #[serde(skip)]
    handler: Listener,
    /// Handler identity.
    pub id: ListenerId,
    /// Handler diagnostic name.
    pub name: Option<String>,
    /// Number of times the handler was invoked while attached.
    pub times_invoked: u64,
    /// Stack captured at the owning event's last emission.
    ///
    /// One capture is taken per emission and shared by every handler of
    /// the event, so handlers of the same event always hold the same trace.
    #[serde(serialize_with = "serialize_trace")]
    pub previous_stack_trace: Option<Arc<StackTrace>>,
}

impl HandlerRecord {
    pub(crate) fn new(handler: Listener) -> Self {
        Self {
            id: handler.id(),
            name: handler.name().map(String::from),
            handler,
            times_invoked: 0,
            previous_stack_trace: None,
        }
    }

    /// The handler itself.
    pub fn handler(&self) -> &Listener {
        &self.handler
    }

    /// Count one invocation.
    pub fn record_invocation(&mut self) {
        self.times_invoked += 1;
    }

    /// Overwrite the stored stack trace.
    pub fn set_stack_trace(&mut self, trace: Arc<StackTrace>) {
        self.previous_stack_trace = Some(trace);
    }
}

fn serialize_trace<S>(trace: &Option<Arc<StackTrace>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    trace.as_deref().serialize(serializer)
}

/// Statistics for one tracked event.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    /// Event name.
    pub name: EventName,
    /// Handler records, in attachment order.
    pub handlers: Vec<HandlerRecord>,
    /// Number of observed emissions.
    pub times_emitted: u64,
    /// Copy of the arguments of the last emission.
    pub previous_arguments: Vec<Arg>,
    /// Whether emissions are observed through a recording proxy.
    ///
    /// `false` for the emitter's lifecycle events, which the engine
    /// observes directly from its own hooks.
    pub has_proxy: bool,
    /// Lifecycle state.
    pub state: EventState,
    #[serde(skip)]
    pub(crate) proxy: Option<RecordingProxy>,
}

impl EventRecord {
    pub(crate) fn new(name: EventName, first_handler: Listener, has_proxy: bool) -> Self {
        Self {
            name,
            handlers: vec![HandlerRecord::new(first_handler)],
            times_emitted: 0,
            previous_arguments: Vec::new(),
            has_proxy,
            state: EventState::Active,
            proxy: None,
        }
    }

    /// Get the first handler record with this identity.
    pub fn handler(&self, id: ListenerId) -> Option<&HandlerRecord> {
        self.handlers.iter().find(|h| h.id == id)
    }

    /// Number of attachments of a handler.
    pub fn attachments(&self, id: ListenerId) -> usize {
        self.handlers.iter().filter(|h| h.id == id).count()
    }

    /// Check whether the event still has live listeners.
    pub fn is_active(&self) -> bool {
        self.state == EventState::Active
    }

    /// The installed recording proxy, if any.
    pub fn proxy(&self) -> Option<&RecordingProxy> {
        self.proxy.as_ref()
    }

    pub(crate) fn proxy_id(&self) -> Option<ListenerId> {
        self.proxy.as_ref().map(RecordingProxy::id)
    }

    pub(crate) fn add_handler(&mut self, handler: Listener) {
        self.handlers.push(HandlerRecord::new(handler));
    }

    /// Remove the first attachment of a handler.
    pub(crate) fn remove_handler(&mut self, id: ListenerId) -> bool {
        match self.handlers.iter().position(|h| h.id == id) {
            Some(index) => {
                self.handlers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every attachment of a handler.
    pub(crate) fn remove_handlers(&mut self, id: ListenerId) -> usize {
        let before = self.handlers.len();
        self.handlers.retain(|h| h.id != id);
        before - self.handlers.len()
    }

    /// Record one emission: every attached handler was invoked and, when a
    /// trace was captured, sees that same trace.
    pub(crate) fn record_emission(&mut self, args: &[Arg], trace: Option<Arc<StackTrace>>) {
        self.times_emitted += 1;
        self.previous_arguments = args.to_vec();
        for handler in &mut self.handlers {
            handler.record_invocation();
            if let Some(trace) = &trace {
                handler.set_stack_trace(Arc::clone(trace));
            }
        }
    }

    pub(crate) fn activate(&mut self, proxy: Option<RecordingProxy>) {
        self.state = EventState::Active;
        self.proxy = proxy;
    }

    pub(crate) fn deactivate(&mut self) {
        self.state = EventState::Inactive;
        self.proxy = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emitscope_trace::CallSite;

    fn trace(name: &str) -> Arc<StackTrace> {
        Arc::new(StackTrace::new(vec![CallSite::new(name)]))
    }

    #[test]
    fn test_record_emission_shares_trace() {
        let a = Listener::named("a", |_| {});
        let b = Listener::named("b", |_| {});
        let mut record = EventRecord::new(EventName::from("data"), a.clone(), true);
        record.add_handler(b.clone());

        record.record_emission(&[Arg::from(7)], Some(trace("emit")));

        assert_eq!(record.times_emitted, 1);
        assert_eq!(record.previous_arguments, vec![Arg::from(7)]);
        let ta = record.handler(a.id()).unwrap().previous_stack_trace.clone().unwrap();
        let tb = record.handler(b.id()).unwrap().previous_stack_trace.clone().unwrap();
        assert!(Arc::ptr_eq(&ta, &tb));
        assert_eq!(record.handler(b.id()).unwrap().times_invoked, 1);
    }

    #[test]
    fn test_record_emission_without_trace() {
        let handler = Listener::noop();
        let mut record = EventRecord::new(EventName::new_listener(), handler.clone(), false);

        record.record_emission(&[], None);

        assert_eq!(record.times_emitted, 1);
        let handler_record = record.handler(handler.id()).unwrap();
        assert_eq!(handler_record.times_invoked, 1);
        assert!(handler_record.previous_stack_trace.is_none());
    }

    #[test]
    fn test_previous_arguments_are_a_copy() {
        let mut record = EventRecord::new(EventName::from("data"), Listener::noop(), true);
        let mut args = vec![Arg::from("first")];

        record.record_emission(&args, Some(trace("emit")));
        args.push(Arg::from("mutated"));

        assert_eq!(record.previous_arguments, vec![Arg::from("first")]);
    }

    #[test]
    fn test_remove_handler_first_match() {
        let h = Listener::noop();
        let mut record = EventRecord::new(EventName::from("data"), h.clone(), true);
        record.add_handler(h.clone());
        assert_eq!(record.attachments(h.id()), 2);

        assert!(record.remove_handler(h.id()));
        assert_eq!(record.attachments(h.id()), 1);
        assert!(record.remove_handler(h.id()));
        assert!(!record.remove_handler(h.id()));
    }

    #[test]
    fn test_remove_handlers_all() {
        let h = Listener::noop();
        let other = Listener::noop();
        let mut record = EventRecord::new(EventName::from("data"), h.clone(), true);
        record.add_handler(other.clone());
        record.add_handler(h.clone());

        assert_eq!(record.remove_handlers(h.id()), 2);
        assert_eq!(record.handlers.len(), 1);
        assert_eq!(record.handlers[0].id, other.id());
    }

    #[test]
    fn test_deactivate() {
        let mut record = EventRecord::new(EventName::from("data"), Listener::noop(), true);
        record.deactivate();
        assert!(!record.is_active());
        assert!(record.proxy().is_none());
    }

    #[test]
    fn test_serialize_record() {
        let mut record = EventRecord::new(EventName::from("data"), Listener::named("h", |_| {}), true);
        record.record_emission(&[Arg::from(1)], Some(trace("emit")));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "data");
        assert_eq!(json["times_emitted"], 1);
        assert_eq!(json["handlers"][0]["name"], "h");
        assert_eq!(
            json["handlers"][0]["previous_stack_trace"]["frames"][0]["function"],
            "emit"
        );
        assert_eq!(json["state"], "Active");
    }
}
