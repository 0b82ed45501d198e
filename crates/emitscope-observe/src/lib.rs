//! emitscope Observability
//!
//! This crate provides ways to consume what an
//! [`EmitterRegistry`](emitscope_core::EmitterRegistry) records:
//!
//! - [`LoggingSubscriber`]: logs every emission through `tracing`
//! - [`CollectingSubscriber`]: keeps emissions for later analysis
//! - [`BroadcastSubscriber`]: forwards emissions to async tasks (feature `async`)
//! - [`RegistryReport`]: point-in-time text and JSON reports
//!
//! # Event Subscription
//!
//! ```ignore
//! use emitscope_observe::{CollectingSubscriber, LoggingSubscriber};
//! use std::sync::Arc;
//!
//! registry.subscribe_all(Arc::new(LoggingSubscriber::new()));
//!
//! let collector = Arc::new(CollectingSubscriber::new(1000));
//! registry.subscribe(&"data".into(), collector.clone())?;
//! ```
//!
//! # Reports
//!
//! ```ignore
//! use emitscope_observe::RegistryReport;
//!
//! let report = RegistryReport::from_registry(&registry);
//! println!("{}", report.to_text());
//! ```

pub mod report;
pub mod subscribers;

// Re-export main types
pub use report::{Diagnostic, DiagnosticLevel, EventSummary, HandlerSummary, RegistryReport};
#[cfg(feature = "async")]
pub use subscribers::BroadcastSubscriber;
pub use subscribers::{CollectingSubscriber, Emission, LoggingSubscriber};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::report::RegistryReport;
    #[cfg(feature = "async")]
    pub use crate::subscribers::BroadcastSubscriber;
    pub use crate::subscribers::{CollectingSubscriber, Emission, LoggingSubscriber};
}
