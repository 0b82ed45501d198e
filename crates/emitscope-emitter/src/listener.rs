//! Listeners and the values passed to them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize, Serializer};

use crate::name::EventName;

static NEXT_LISTENER: AtomicU64 = AtomicU64::new(1);

/// Signature of a listener callback.
pub type ListenerFn = dyn Fn(&[Arg]) + Send + Sync;

/// Identity of a listener.
///
/// Every call to [`Listener::new`] yields a fresh identity; clones of a
/// listener share it. Identity is what emitters use to find a listener on
/// removal, so two closures with the same body are still different listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct ListenerInner {
    id: ListenerId,
    name: Option<String>,
    callback: Box<ListenerFn>,
}

/// A callable registered on an emitter.
///
/// Cheap to clone; clones refer to the same callback and compare equal.
#[derive(Clone)]
pub struct Listener {
    inner: Arc<ListenerInner>,
}

impl Listener {
    /// Create an anonymous listener.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&[Arg]) + Send + Sync + 'static,
    {
        Self::build(None, Box::new(callback))
    }

    /// Create a listener with a diagnostic name.
    pub fn named<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&[Arg]) + Send + Sync + 'static,
    {
        Self::build(Some(name.into()), Box::new(callback))
    }

    /// Create a listener that does nothing.
    pub fn noop() -> Self {
        Self::named("noop", |_| {})
    }

    fn build(name: Option<String>, callback: Box<ListenerFn>) -> Self {
        Self {
            inner: Arc::new(ListenerInner {
                id: ListenerId(NEXT_LISTENER.fetch_add(1, Ordering::Relaxed)),
                name,
                callback,
            }),
        }
    }

    /// Get the listener's identity.
    pub fn id(&self) -> ListenerId {
        self.inner.id
    }

    /// Get the diagnostic name, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Invoke the callback.
    pub fn call(&self, args: &[Arg]) {
        (self.inner.callback)(args)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Listener {}

impl std::hash::Hash for Listener {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

impl std::fmt::Display for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}{}", name, self.id()),
            None => write!(f, "<anonymous>{}", self.id()),
        }
    }
}

/// A value passed to listeners on emission.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Plain data.
    Value(serde_json::Value),
    /// An event name (lifecycle notifications carry one).
    Event(EventName),
    /// A listener (lifecycle notifications carry one).
    Listener(Listener),
}

impl Arg {
    /// Get the data value, if this is one.
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Arg::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Get the event name, if this is one.
    pub fn as_event(&self) -> Option<&EventName> {
        match self {
            Arg::Event(name) => Some(name),
            _ => None,
        }
    }

    /// Get the listener, if this is one.
    pub fn as_listener(&self) -> Option<&Listener> {
        match self {
            Arg::Listener(listener) => Some(listener),
            _ => None,
        }
    }
}

impl Serialize for Arg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Arg::Value(value) => value.serialize(serializer),
            Arg::Event(name) => name.serialize(serializer),
            Arg::Listener(listener) => serializer.serialize_str(&format!("[Listener {}]", listener)),
        }
    }
}

impl std::fmt::Display for Arg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arg::Value(value) => write!(f, "{}", value),
            Arg::Event(name) => write!(f, "{}", name),
            Arg::Listener(listener) => write!(f, "[Listener {}]", listener),
        }
    }
}

impl From<serde_json::Value> for Arg {
    fn from(value: serde_json::Value) -> Self {
        Arg::Value(value)
    }
}

impl From<EventName> for Arg {
    fn from(name: EventName) -> Self {
        Arg::Event(name)
    }
}

impl From<Listener> for Arg {
    fn from(listener: Listener) -> Self {
        Arg::Listener(listener)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Value(serde_json::Value::String(value.to_string()))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Value(serde_json::Value::String(value))
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Value(value.into())
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Value(value.into())
    }
}
