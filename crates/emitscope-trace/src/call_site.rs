//! Structured stack frames.

use serde::{Deserialize, Serialize};

/// One frame of a captured stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Fully qualified function path.
    pub function: String,
    /// Type owning the function, if the path names one.
    pub type_name: Option<String>,
    /// Source file, if known.
    pub file: Option<String>,
    /// Line number, if known.
    pub line: Option<u32>,
    /// Column number, if known.
    pub column: Option<u32>,
}

impl CallSite {
    /// Create a frame with only a function path.
    pub fn new(function: impl Into<String>) -> Self {
        let function = function.into();
        let type_name = owning_type(&function);
        Self {
            function,
            type_name,
            file: None,
            line: None,
            column: None,
        }
    }

    /// Set the source location.
    pub fn with_location(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// The last path segment of the function.
    pub fn function_name(&self) -> &str {
        self.function.rsplit("::").next().unwrap_or(&self.function)
    }

    /// Format as a single `at function (file:line:column)` line.
    pub fn to_line(&self) -> String {
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(column)) => {
                format!("    at {} ({}:{}:{})", self.function, file, line, column)
            }
            (Some(file), Some(line), None) => format!("    at {} ({}:{})", self.function, file, line),
            (Some(file), None, _) => format!("    at {} ({})", self.function, file),
            _ => format!("    at {}", self.function),
        }
    }
}

/// Best-effort owner of a function path: the segment before the function
/// name when it looks like a type.
fn owning_type(function: &str) -> Option<String> {
    // `<path::Type as Trait>::method` or `<path::Type>::method`
    if let Some(qualified) = function.strip_prefix('<') {
        let self_type = qualified.split([' ', '>']).next()?;
        return self_type.rsplit("::").next().map(str::to_string);
    }

    let mut segments = function.rsplit("::");
    segments.next()?;
    let owner = segments.next()?;
    let starts_upper = owner.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    starts_upper.then(|| owner.to_string())
}

/// A captured call stack, innermost frame first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTrace {
    /// The frames.
    pub frames: Vec<CallSite>,
}

impl StackTrace {
    /// Create a trace from frames.
    pub fn new(frames: Vec<CallSite>) -> Self {
        Self { frames }
    }

    /// Create an empty trace.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the frame `offset` frames above the innermost one.
    pub fn call_site(&self, offset: usize) -> Option<&CallSite> {
        self.frames.get(offset)
    }

    /// Check if the trace has no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Format as a multi-line stack string.
    pub fn formatted(&self) -> String {
        self.frames
            .iter()
            .map(CallSite::to_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Display for StackTrace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.formatted())
    }
}
