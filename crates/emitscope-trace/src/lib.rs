//! emitscope Trace
//!
//! Stack capture for emission diagnostics. The interception engine never
//! inspects the native stack itself; it asks a [`TraceCapture`] for a
//! [`StackTrace`] and stores whatever comes back.
//!
//! - [`BacktraceCapture`]: real captures through `std::backtrace`
//! - [`FixedCapture`] / [`SequenceCapture`]: deterministic captures
//!
//! # Usage
//!
//! ```ignore
//! use emitscope_trace::{BacktraceCapture, TraceCapture, get_call_site};
//!
//! let capture = BacktraceCapture::new();
//! let trace = capture.capture(0);
//! println!("{}", trace);
//!
//! if let Some(site) = get_call_site(&capture, 0) {
//!     println!("called from {}", site.function_name());
//! }
//! ```

pub mod call_site;
pub mod capture;
pub mod mock;

// Re-export main types
pub use call_site::{CallSite, StackTrace};
pub use capture::{BacktraceCapture, TraceCapture, get_call_site, get_stack_trace};
pub use mock::{FixedCapture, SequenceCapture};
