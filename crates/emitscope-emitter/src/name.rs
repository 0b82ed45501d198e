//! Event identifiers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize};

/// Name of the notification emitted before a listener is added.
pub const NEW_LISTENER: &str = "newListener";

/// Name of the notification emitted after a listener is removed.
pub const REMOVE_LISTENER: &str = "removeListener";

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// Identifier of an event.
///
/// Events are either plain string names or unique symbols. Two symbols
/// created with the same description are still distinct events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum EventName {
    /// A string event name.
    Named(String),
    /// A unique symbol.
    Symbol(Symbol),
}

/// A unique, non-string event identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Symbol {
    id: u64,
    description: String,
}

impl Symbol {
    /// The symbol's description.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl EventName {
    /// Create a string event name.
    pub fn new(name: impl Into<String>) -> Self {
        EventName::Named(name.into())
    }

    /// Create a fresh symbol, distinct from every other symbol.
    pub fn symbol(description: impl Into<String>) -> Self {
        EventName::Symbol(Symbol {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        })
    }

    /// The `newListener` lifecycle event.
    pub fn new_listener() -> Self {
        EventName::Named(NEW_LISTENER.to_string())
    }

    /// The `removeListener` lifecycle event.
    pub fn remove_listener() -> Self {
        EventName::Named(REMOVE_LISTENER.to_string())
    }

    /// Check whether this is one of the emitter's own lifecycle events.
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, EventName::Named(name) if name == NEW_LISTENER || name == REMOVE_LISTENER)
    }

    /// The string name, if this is not a symbol.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EventName::Named(name) => Some(name),
            EventName::Symbol(_) => None,
        }
    }

    /// Check whether this is a symbol.
    pub fn is_symbol(&self) -> bool {
        matches!(self, EventName::Symbol(_))
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventName::Named(name) => write!(f, "{}", name),
            EventName::Symbol(symbol) => write!(f, "Symbol({})", symbol.description),
        }
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        EventName::Named(name.to_string())
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        EventName::Named(name)
    }
}

// Symbols only exist at run time, so anything read from a file is a name.
impl<'de> Deserialize<'de> for EventName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(EventName::Named)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_are_unique() {
        let a = EventName::symbol("tick");
        let b = EventName::symbol("tick");
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
        assert_eq!(a.to_string(), "Symbol(tick)");
    }

    #[test]
    fn test_lifecycle_names() {
        assert!(EventName::new_listener().is_lifecycle());
        assert!(EventName::remove_listener().is_lifecycle());
        assert!(!EventName::from("data").is_lifecycle());
        assert!(!EventName::symbol(NEW_LISTENER).is_lifecycle());
    }

    #[test]
    fn test_deserialize_from_string() {
        let name: EventName = serde_json::from_str("\"connect\"").unwrap();
        assert_eq!(name, EventName::from("connect"));
        assert_eq!(name.as_str(), Some("connect"));
    }
}
