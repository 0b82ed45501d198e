//! emitscope Core - Emitter Instrumentation
//!
//! This crate records how an [`Emitter`](emitscope_emitter::Emitter) is used
//! without changing what it does. It includes:
//!
//! - [`EmitterRegistry`]: live statistics for one wrapped emitter
//! - [`EventRecord`] / [`HandlerRecord`]: per-event and per-handler statistics
//! - [`RecordingProxy`]: the listener installed for each tracked event
//! - [`TrackerConfig`]: exclusions and retention
//! - [`track_event`]: one-call tracking of a single event
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use emitscope_core::prelude::*;
//! use emitscope_emitter::prelude::*;
//!
//! let emitter = Arc::new(EventEmitter::new());
//! let registry = EmitterRegistry::wrap(
//!     Arc::clone(&emitter),
//!     TrackerConfig::new().with_excluded_event("tick"),
//! )?;
//!
//! emitter.on("data".into(), Listener::new(|args| println!("{:?}", args)));
//! emitter.emit(&"data".into(), &[Arg::from(42)]);
//!
//! let record = registry.event_details(&"data".into()).unwrap();
//! assert_eq!(record.times_emitted, 1);
//! ```
//!
//! # How Tracking Works
//!
//! Wrapping walks the listeners already on the emitter, then registers hooks
//! on `newListener` and `removeListener`. The first tracked listener of an
//! event causes one recording proxy to be installed alongside it; the proxy
//! sees every emission, updates the records, captures the stack, and then
//! notifies subscribers. When only the proxy is left, it is removed.
//!
//! ```text
//! emitter.emit("data", args)
//!   ├── handler A
//!   ├── recording proxy ──> EventRecord ──> subscribers
//!   └── handler B
//! ```

pub mod config;
mod engine;
pub mod error;
pub mod proxy;
pub mod record;
pub mod registry;
pub mod track;

// Re-export main types at crate root
pub use config::TrackerConfig;
pub use error::{ConfigError, ConfigResult, TrackerError, TrackerResult};
pub use proxy::{EmissionDispatcher, EmissionSubscriber, RecordingProxy};
pub use record::{EventRecord, EventState, HandlerRecord};
pub use registry::{EmitterId, EmitterRegistry, instrumentation_capture};
pub use track::{TrackedEvent, track_event};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```ignore
/// use emitscope_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::TrackerConfig;
    pub use crate::error::{TrackerError, TrackerResult};
    pub use crate::proxy::EmissionSubscriber;
    pub use crate::record::{EventRecord, HandlerRecord};
    pub use crate::registry::{EmitterId, EmitterRegistry};
    pub use crate::track::{TrackedEvent, track_event};
}
