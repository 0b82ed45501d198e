//! Tracker configuration.
//!
//! A [`TrackerConfig`] is read once, when an emitter is wrapped. Exclusions
//! can later be changed through the registry, but never retroactively: a
//! listener added while excluded stays untracked.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use emitscope_emitter::{EventName, ListenerId};

use crate::error::{ConfigError, ConfigResult, TrackerError, TrackerResult};

/// Configuration recognised when wrapping an emitter.
///
/// # Example
///
/// ```toml
/// excluded_events = ["tick", "newListener"]
/// save_inactive_event_details = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Events that are never tracked.
    pub excluded_events: HashSet<EventName>,

    /// Handlers that are never tracked, even on tracked events.
    ///
    /// Handler identities only exist at run time, so this cannot be set
    /// from a file.
    #[serde(skip)]
    pub excluded_handlers: HashSet<ListenerId>,

    /// Keep an event's record after its last handler is removed.
    ///
    /// When disabled, the record is deleted along with its statistics.
    pub save_inactive_event_details: bool,
}

impl TrackerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude an event.
    pub fn with_excluded_event(mut self, event: impl Into<EventName>) -> Self {
        self.excluded_events.insert(event.into());
        self
    }

    /// Exclude several events.
    pub fn with_excluded_events<I, E>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<EventName>,
    {
        self.excluded_events.extend(events.into_iter().map(Into::into));
        self
    }

    /// Exclude a handler.
    pub fn with_excluded_handler(mut self, handler: ListenerId) -> Self {
        self.excluded_handlers.insert(handler);
        self
    }

    /// Keep records of events whose handlers were all removed.
    pub fn with_save_inactive_event_details(mut self, enabled: bool) -> Self {
        self.save_inactive_event_details = enabled;
        self
    }

    /// Check whether an event is excluded.
    pub fn is_event_excluded(&self, event: &EventName) -> bool {
        self.excluded_events.contains(event)
    }

    /// Check whether a handler is excluded.
    pub fn is_handler_excluded(&self, handler: ListenerId) -> bool {
        self.excluded_handlers.contains(&handler)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> TrackerResult<()> {
        if self
            .excluded_events
            .iter()
            .any(|event| event.as_str().is_some_and(str::is_empty))
        {
            return Err(TrackerError::InvalidConfig(
                "excluded event names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse a configuration from TOML.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
