//! Scenario files.
//!
//! A scenario is a TOML file with an optional `[config]` table, read as a
//! [`TrackerConfig`], and a list of `[[steps]]` replayed against a fresh
//! emitter:
//!
//! ```toml
//! name = "retention"
//!
//! [config]
//! save_inactive_event_details = true
//!
//! [[steps]]
//! action = "on"
//! event = "data"
//! handler = "logger"
//!
//! [[steps]]
//! action = "emit"
//! event = "data"
//! args = [1, "two"]
//! count = 2
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use emitscope_core::TrackerConfig;

fn one() -> u32 {
    1
}

/// One replayed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    /// Add a named handler to an event.
    On { event: String, handler: String },
    /// Remove a named handler from an event.
    Off { event: String, handler: String },
    /// Emit an event.
    Emit {
        event: String,
        #[serde(default)]
        args: Vec<serde_json::Value>,
        #[serde(default = "one")]
        count: u32,
    },
    /// Stop tracking an event.
    ExcludeEvent { event: String },
    /// Resume tracking an event for later listeners.
    IncludeEvent { event: String },
    /// Stop tracking a named handler.
    ExcludeHandler { handler: String },
}

/// A parsed scenario file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Scenario name.
    #[serde(default)]
    pub name: Option<String>,
    /// Tracker configuration.
    #[serde(default)]
    pub config: TrackerConfig,
    /// Steps, in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse a scenario from TOML.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(text).context("Invalid scenario")?;
        scenario
            .config
            .validate()
            .context("Invalid scenario configuration")?;
        Ok(scenario)
    }

    /// Load a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Suspicious steps that replay would accept.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut excluded: HashSet<&str> = self
            .config
            .excluded_events
            .iter()
            .filter_map(|event| event.as_str())
            .collect();
        let mut attached: HashMap<&str, Vec<&str>> = HashMap::new();

        for (index, step) in self.steps.iter().enumerate() {
            let n = index + 1;
            match step {
                Step::On { event, handler } => {
                    attached.entry(event).or_default().push(handler);
                }
                Step::Off { event, handler } => {
                    let handlers = attached.entry(event).or_default();
                    match handlers.iter().position(|h| *h == handler.as_str()) {
                        Some(position) => {
                            handlers.remove(position);
                        }
                        None => warnings.push(format!(
                            "step {}: handler '{}' is not attached to '{}'",
                            n, handler, event
                        )),
                    }
                }
                Step::Emit { event, count, .. } => {
                    if excluded.contains(event.as_str()) {
                        warnings.push(format!("step {}: '{}' is excluded and will not be recorded", n, event));
                    } else if attached.get(event.as_str()).is_none_or(Vec::is_empty) {
                        warnings.push(format!("step {}: '{}' has no listeners", n, event));
                    }
                    if *count == 0 {
                        warnings.push(format!("step {}: emit with count 0 does nothing", n));
                    }
                }
                Step::ExcludeEvent { event } => {
                    if !excluded.insert(event) {
                        warnings.push(format!("step {}: '{}' is already excluded", n, event));
                    }
                }
                Step::IncludeEvent { event } => {
                    if !excluded.remove(event.as_str()) {
                        warnings.push(format!("step {}: '{}' is not excluded", n, event));
                    }
                }
                Step::ExcludeHandler { handler } => {
                    let known = self.steps[..index]
                        .iter()
                        .any(|s| matches!(s, Step::On { handler: h, .. } if h == handler));
                    if !known {
                        warnings.push(format!("step {}: handler '{}' was never added", n, handler));
                    }
                }
            }
        }

        warnings
    }
}
