//! # emitscope - Live Diagnostics for Event Emitters
//!
//! emitscope wraps a synchronous event emitter and records, while the
//! program runs, how it is used: which events fire, how often, with what
//! arguments, which handlers run, and from where each emission came.
//!
//! ## Features
//!
//! - **Transparent**: handlers receive the same arguments in the same order
//! - **Live**: listeners added or removed after wrapping are picked up
//! - **Selective**: events and handlers can be excluded at any time
//! - **Observable**: subscribers see every emission after it is recorded
//!
//! ## Quick Start
//!
//! ```ignore
//! use emitscope::prelude::*;
//!
//! let emitter = Arc::new(EventEmitter::new());
//!
//! let registry = Emitscope::builder()
//!     .exclude_event("tick")
//!     .save_inactive_event_details(true)
//!     .wrap(Arc::clone(&emitter))?;
//!
//! emitter.on("data".into(), Listener::new(|args| println!("{:?}", args)));
//! emitter.emit(&"data".into(), &[Arg::from(42)]);
//!
//! println!("{}", registry.report().to_text());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Your Application                     │
//! ├─────────────────────────────────────────────────────────┤
//! │                   emitscope (facade)                    │
//! │                ┌─────────────────────┐                  │
//! │                │  Emitscope Builder  │                  │
//! │                └──────────┬──────────┘                  │
//! │                           │                             │
//! │  ┌────────────────┬───────┴────────┬─────────────────┐  │
//! │  │ emitscope-core │ emitscope-trace│ emitscope-observe│ │
//! │  │ (registry,     │ (stack capture)│ (subscribers,   │  │
//! │  │  engine)       │                │  reports)       │  │
//! │  └────────────────┴────────────────┴─────────────────┘  │
//! ├─────────────────────────────────────────────────────────┤
//! │                   emitscope-emitter                     │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::Level;

use emitscope_core::{
    ConfigError, EmissionSubscriber, EmitterRegistry, TrackerConfig, TrackerError,
    instrumentation_capture,
};
use emitscope_emitter::{Emitter, EventName, ListenerId};
use emitscope_observe::{LoggingSubscriber, RegistryReport};
use emitscope_trace::TraceCapture;

// Re-export from sub-crates
pub use emitscope_core;
pub use emitscope_emitter;
pub use emitscope_observe;
pub use emitscope_trace;

pub use emitscope_core::{TrackedEvent, track_event};

/// Main entry point for emitscope.
pub struct Emitscope;

impl Emitscope {
    /// Create a new builder.
    pub fn builder() -> EmitscopeBuilder {
        EmitscopeBuilder::new()
    }

    /// Create a builder from a TOML configuration file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<EmitscopeBuilder, EmitscopeError> {
        let config = TrackerConfig::from_file(path)?;
        Ok(EmitscopeBuilder::new().with_config(config))
    }

    /// Wrap an emitter with the default configuration.
    pub fn wrap<E: Emitter + 'static>(emitter: Arc<E>) -> Result<EmitterRegistry, EmitscopeError> {
        EmitscopeBuilder::new().wrap(emitter)
    }
}

/// Builder for configuring how an emitter is wrapped.
pub struct EmitscopeBuilder {
    config: TrackerConfig,
    capture: Option<Arc<dyn TraceCapture>>,
    subscribers: Vec<Arc<dyn EmissionSubscriber>>,
}

impl EmitscopeBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: TrackerConfig::default(),
            capture: None,
            subscribers: Vec::new(),
        }
    }

    // Tracking

    /// Never track an event.
    pub fn exclude_event(mut self, event: impl Into<EventName>) -> Self {
        self.config = self.config.with_excluded_event(event);
        self
    }

    /// Never track a handler.
    pub fn exclude_handler(mut self, handler: ListenerId) -> Self {
        self.config = self.config.with_excluded_handler(handler);
        self
    }

    /// Keep statistics of events whose handlers were all removed.
    pub fn save_inactive_event_details(mut self, enabled: bool) -> Self {
        self.config = self.config.with_save_inactive_event_details(enabled);
        self
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom stack capture.
    pub fn with_capture(mut self, capture: Arc<dyn TraceCapture>) -> Self {
        self.capture = Some(capture);
        self
    }

    // Observability

    /// Subscribe to every tracked event.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn EmissionSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Log every emission at `level`.
    pub fn log_emissions(self, level: Level) -> Self {
        self.with_subscriber(Arc::new(LoggingSubscriber::new().with_level(level)))
    }

    /// Wrap the emitter.
    pub fn wrap<E: Emitter + 'static>(self, emitter: Arc<E>) -> Result<EmitterRegistry, EmitscopeError> {
        let capture: Arc<dyn TraceCapture> = match self.capture {
            Some(capture) => capture,
            None => Arc::new(instrumentation_capture()),
        };
        let registry = EmitterRegistry::wrap_with_capture(emitter, self.config, capture)?;

        for subscriber in self.subscribers {
            registry.subscribe_all(subscriber);
        }
        Ok(registry)
    }
}

impl Default for EmitscopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EmitscopeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitscopeBuilder")
            .field("config", &self.config)
            .field("custom_capture", &self.capture.is_some())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Reporting on a registry.
pub trait ReportExt {
    /// Snapshot the registry into a report.
    fn report(&self) -> RegistryReport;
}

impl ReportExt for EmitterRegistry {
    fn report(&self) -> RegistryReport {
        RegistryReport::from_registry(self)
    }
}

/// Errors from emitscope.
#[derive(Debug, thiserror::Error)]
pub enum EmitscopeError {
    /// Tracking error.
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Main types
    pub use crate::{Emitscope, EmitscopeBuilder, EmitscopeError, ReportExt};

    // Emitter types
    pub use emitscope_emitter::{Arg, Emitter, EventEmitter, EventName, Listener, ListenerId};

    // Core types
    pub use emitscope_core::{
        EmissionSubscriber, EmitterRegistry, EventRecord, EventState, HandlerRecord,
        TrackedEvent, TrackerConfig, track_event,
    };

    // Trace types
    pub use emitscope_trace::{BacktraceCapture, StackTrace, TraceCapture};

    // Observability types
    pub use emitscope_observe::{CollectingSubscriber, LoggingSubscriber, RegistryReport};

    // Common std types
    pub use std::sync::Arc;
}
