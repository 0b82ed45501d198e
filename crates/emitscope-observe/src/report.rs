//! Registry reports.

use serde::Serialize;

use emitscope_core::{EmitterId, EmitterRegistry, EventRecord, EventState, HandlerRecord};
use emitscope_emitter::{Arg, EventName, ListenerId};

/// Summary of one handler attachment.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerSummary {
    /// Handler identity.
    pub id: ListenerId,
    /// Handler diagnostic name.
    pub name: Option<String>,
    /// Number of invocations.
    pub times_invoked: u64,
    /// Innermost frame of the last captured stack, formatted.
    pub last_call_site: Option<String>,
}

impl HandlerSummary {
    fn from_record(record: &HandlerRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            times_invoked: record.times_invoked,
            last_call_site: record
                .previous_stack_trace
                .as_ref()
                .and_then(|trace| trace.call_site(0))
                .map(|site| site.to_line().trim().to_string()),
        }
    }

    fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{}{}", name, self.id),
            None => format!("<anonymous>{}", self.id),
        }
    }
}

/// Summary of one tracked event.
#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    /// Event name.
    pub name: EventName,
    /// Lifecycle state.
    pub state: EventState,
    /// Whether the event is observed through a recording proxy.
    pub has_proxy: bool,
    /// Number of observed emissions.
    pub times_emitted: u64,
    /// Arguments of the last emission.
    pub previous_arguments: Vec<Arg>,
    /// Handlers in attachment order.
    pub handlers: Vec<HandlerSummary>,
}

impl From<&EventRecord> for EventSummary {
    fn from(record: &EventRecord) -> Self {
        Self {
            name: record.name.clone(),
            state: record.state,
            has_proxy: record.has_proxy,
            times_emitted: record.times_emitted,
            previous_arguments: record.previous_arguments.clone(),
            handlers: record.handlers.iter().map(HandlerSummary::from_record).collect(),
        }
    }
}

/// A diagnostic message.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Severity level.
    pub level: DiagnosticLevel,
    /// Message.
    pub message: String,
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticLevel {
    /// Informational.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
}

/// Point-in-time report of a registry.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryReport {
    /// Registry ID.
    pub emitter_id: EmitterId,
    /// Tracked events, ordered by name.
    pub events: Vec<EventSummary>,
    /// Events that fired, in first-seen order.
    pub emitted_event_names: Vec<EventName>,
    /// Diagnostic messages.
    pub diagnostics: Vec<Diagnostic>,
}

impl RegistryReport {
    /// Snapshot a registry.
    pub fn from_registry(registry: &EmitterRegistry) -> Self {
        Self {
            emitter_id: registry.id(),
            events: registry.events().iter().map(EventSummary::from).collect(),
            emitted_event_names: registry.emitted_event_names(),
            diagnostics: Vec::new(),
        }
    }

    /// Get an event's summary.
    pub fn event(&self, name: &EventName) -> Option<&EventSummary> {
        self.events.iter().find(|e| &e.name == name)
    }

    /// Number of active events.
    pub fn active_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.state == EventState::Active)
            .count()
    }

    /// Total observed emissions across tracked events.
    pub fn total_emissions(&self) -> u64 {
        self.events.iter().map(|e| e.times_emitted).sum()
    }

    /// Add an info diagnostic.
    pub fn add_info(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Info,
            message: message.into(),
        });
    }

    /// Add a warning diagnostic.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Warning,
            message: message.into(),
        });
    }

    /// Add an error diagnostic.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Error,
            message: message.into(),
        });
    }

    /// Format as human-readable text.
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Emitter Report: {}\n", self.emitter_id));
        output.push_str(&format!(
            "Events: {} tracked, {} active, {} emissions\n",
            self.events.len(),
            self.active_count(),
            self.total_emissions()
        ));

        for event in &self.events {
            let state = match event.state {
                EventState::Active => "active",
                EventState::Inactive => "inactive",
            };
            let proxy = if event.has_proxy { "" } else { ", direct" };
            output.push_str(&format!(
                "\n  {} [{}{}]: emitted {} times\n",
                event.name, state, proxy, event.times_emitted
            ));
            if !event.previous_arguments.is_empty() {
                let args: Vec<String> =
                    event.previous_arguments.iter().map(ToString::to_string).collect();
                output.push_str(&format!("    Last arguments: ({})\n", args.join(", ")));
            }
            for handler in &event.handlers {
                output.push_str(&format!(
                    "    {}: invoked {} times\n",
                    handler.label(),
                    handler.times_invoked
                ));
                if let Some(site) = &handler.last_call_site {
                    output.push_str(&format!("      {}\n", site));
                }
            }
        }

        if !self.emitted_event_names.is_empty() {
            let names: Vec<String> = self.emitted_event_names.iter().map(ToString::to_string).collect();
            output.push_str(&format!("\nEmitted: {}\n", names.join(", ")));
        }

        if !self.diagnostics.is_empty() {
            output.push_str("\nDiagnostics:\n");
            for diag in &self.diagnostics {
                let level = match diag.level {
                    DiagnosticLevel::Info => "INFO",
                    DiagnosticLevel::Warning => "WARN",
                    DiagnosticLevel::Error => "ERROR",
                };
                output.push_str(&format!("  [{}] {}\n", level, diag.message));
            }
        }

        output
    }

    /// Format as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Format as pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
