//! emitscope Emitter
//!
//! This crate provides the synchronous publish/subscribe primitive that
//! emitscope instruments:
//!
//! - [`Emitter`]: the contract an instrumentable emitter must honour
//! - [`EventEmitter`]: the standard implementation
//! - [`Listener`] / [`ListenerId`]: callbacks with reference identity
//! - [`EventName`] / [`Arg`]: event identifiers and emitted values
//!
//! # Lifecycle Notifications
//!
//! Every emitter announces its own changes: `newListener` is emitted before
//! a listener is added and `removeListener` after one is removed, each with
//! `[Arg::Event(name), Arg::Listener(listener)]` as arguments.
//!
//! ```ignore
//! use emitscope_emitter::{Emitter, EventEmitter, EventName, Listener};
//!
//! let emitter = EventEmitter::new();
//! emitter.on(EventName::new_listener(), Listener::new(|args| {
//!     println!("listener added for {}", args[0]);
//! }));
//! emitter.on("data".into(), Listener::noop());
//! ```

pub mod emitter;
pub mod listener;
pub mod name;

// Re-export main types
pub use emitter::{DEFAULT_MAX_LISTENERS, Emitter, EventEmitter};
pub use listener::{Arg, Listener, ListenerFn, ListenerId};
pub use name::{EventName, NEW_LISTENER, REMOVE_LISTENER, Symbol};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::emitter::{Emitter, EventEmitter};
    pub use crate::listener::{Arg, Listener, ListenerId};
    pub use crate::name::EventName;
}
