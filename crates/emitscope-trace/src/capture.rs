//! Stack capture.

use std::backtrace::Backtrace;

use crate::call_site::{CallSite, StackTrace};

/// Source of stack traces.
pub trait TraceCapture: Send + Sync {
    /// Capture the current stack.
    ///
    /// Frames belonging to the capture machinery are never included;
    /// `skip` additional innermost frames are dropped on top of that.
    fn capture(&self, skip: usize) -> StackTrace;
}

/// Get the frame `offset` frames above the caller of this function.
pub fn get_call_site(capture: &dyn TraceCapture, offset: usize) -> Option<CallSite> {
    capture.capture(offset).frames.into_iter().next()
}

/// Get the caller's stack as a formatted multi-line string.
pub fn get_stack_trace(capture: &dyn TraceCapture) -> String {
    capture.capture(0).formatted()
}

/// Captures real stacks through [`std::backtrace`].
///
/// Frames are matched by symbol prefix. The standard library's backtrace
/// frames and this crate's own frames are always excluded; instrumentation
/// layers add their own prefixes with [`with_excluded_prefix`](Self::with_excluded_prefix).
#[derive(Debug, Clone)]
pub struct BacktraceCapture {
    excluded_prefixes: Vec<String>,
    max_frames: Option<usize>,
}

impl BacktraceCapture {
    /// Create a capture with the default exclusions.
    pub fn new() -> Self {
        Self {
            excluded_prefixes: vec![
                "std::backtrace".to_string(),
                "emitscope_trace::".to_string(),
                "<emitscope_trace::".to_string(),
            ],
            max_frames: None,
        }
    }

    /// Exclude frames whose symbol starts with `prefix`.
    pub fn with_excluded_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_prefixes.push(prefix.into());
        self
    }

    /// Keep at most `max` frames per trace.
    pub fn with_max_frames(mut self, max: usize) -> Self {
        self.max_frames = Some(max);
        self
    }

    /// Check whether frames of `function` are dropped from captures.
    pub fn is_excluded(&self, function: &str) -> bool {
        self.excluded_prefixes
            .iter()
            .any(|prefix| function.starts_with(prefix.as_str()))
    }
}

impl Default for BacktraceCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceCapture for BacktraceCapture {
    fn capture(&self, skip: usize) -> StackTrace {
        let rendered = Backtrace::force_capture().to_string();
        let frames = parse_backtrace(&rendered)
            .into_iter()
            .filter(|frame| !self.is_excluded(&frame.function))
            .skip(skip)
            .take(self.max_frames.unwrap_or(usize::MAX))
            .collect();
        StackTrace::new(frames)
    }
}

/// Parse the text rendering of a [`Backtrace`].
///
/// The rendering alternates `N: symbol` lines with optional
/// `at file:line:column` lines.
fn parse_backtrace(rendered: &str) -> Vec<CallSite> {
    let mut frames: Vec<CallSite> = Vec::new();

    for line in rendered.lines() {
        let line = line.trim();
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                apply_location(frame, location);
            }
            continue;
        }

        let Some((index, symbol)) = line.split_once(": ") else {
            continue;
        };
        if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        frames.push(CallSite::new(strip_hash(symbol)));
    }

    frames
}

fn apply_location(frame: &mut CallSite, location: &str) {
    let mut parts = location.rsplitn(3, ':');
    let column = parts.next().and_then(|c| c.parse::<u32>().ok());
    let line = parts.next().and_then(|l| l.parse::<u32>().ok());

    match (line, column, parts.next()) {
        (Some(line), Some(column), Some(file)) => {
            frame.file = Some(file.to_string());
            frame.line = Some(line);
            frame.column = Some(column);
        }
        _ => frame.file = Some(location.to_string()),
    }
}

/// Remove a trailing `::h0123456789abcdef` symbol hash.
fn strip_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::h") {
        Some((path, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => {
            path
        }
        _ => symbol,
    }
}
