//! Replay command - Replay a scenario against an instrumented emitter.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use emitscope::emitscope_trace::FixedCapture;
use emitscope::prelude::*;
use emitscope_observe::RegistryReport;

use crate::OutputFormat;
use crate::scenario::{Scenario, Step};

/// Arguments for the replay command.
#[derive(Args)]
pub struct ReplayArgs {
    /// Path to the scenario file
    #[arg(required = true)]
    pub scenario: PathBuf,

    /// Log every recorded emission
    #[arg(long)]
    pub trace: bool,

    /// Capture real stack traces instead of leaving them empty
    #[arg(long)]
    pub stack_traces: bool,
}

/// Named handlers created while replaying.
#[derive(Default)]
struct Handlers {
    by_name: HashMap<String, Listener>,
}

impl Handlers {
    fn get_or_create(&mut self, name: &str) -> Listener {
        self.by_name
            .entry(name.to_string())
            .or_insert_with(|| {
                let label = name.to_string();
                Listener::named(name, move |args| {
                    tracing::debug!(handler = %label, args = args.len(), "Handler called");
                })
            })
            .clone()
    }

    fn get(&self, name: &str) -> Option<&Listener> {
        self.by_name.get(name)
    }
}

/// Run every step of a scenario and report the registry.
pub fn replay(scenario: &Scenario, trace: bool, stack_traces: bool) -> Result<RegistryReport> {
    let emitter = Arc::new(EventEmitter::new());

    let mut builder = Emitscope::builder().with_config(scenario.config.clone());
    if !stack_traces {
        builder = builder.with_capture(Arc::new(FixedCapture::empty()));
    }
    if trace {
        builder = builder.with_subscriber(Arc::new(LoggingSubscriber::new()));
    }
    let registry = builder
        .wrap(Arc::clone(&emitter))
        .context("Failed to instrument emitter")?;

    let mut handlers = Handlers::default();
    for step in &scenario.steps {
        tracing::trace!(step = ?step, "Replaying step");
        match step {
            Step::On { event, handler } => {
                emitter.on(event.as_str().into(), handlers.get_or_create(handler));
            }
            Step::Off { event, handler } => {
                if let Some(listener) = handlers.get(handler) {
                    emitter.remove_listener(&event.as_str().into(), listener);
                }
            }
            Step::Emit { event, args, count } => {
                let event: EventName = event.as_str().into();
                let args: Vec<Arg> = args.iter().cloned().map(Arg::Value).collect();
                for _ in 0..*count {
                    emitter.emit(&event, &args);
                }
            }
            Step::ExcludeEvent { event } => {
                registry.exclude_event(event.as_str());
            }
            Step::IncludeEvent { event } => {
                registry.include_event(&event.as_str().into());
            }
            Step::ExcludeHandler { handler } => {
                if let Some(listener) = handlers.get(handler) {
                    registry.exclude_handler(listener.id());
                }
            }
        }
    }

    let mut report = registry.report();
    for warning in scenario.warnings() {
        report.add_warning(warning);
    }
    Ok(report)
}

/// Execute the replay command.
pub fn execute(args: ReplayArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let scenario = Scenario::load(&args.scenario)?;

    if !quiet {
        tracing::info!(
            scenario = %args.scenario.display(),
            steps = scenario.steps.len(),
            "Replaying scenario"
        );
    }

    let report = replay(&scenario, args.trace, args.stack_traces)?;

    match format {
        OutputFormat::Human => {
            if !quiet {
                if let Some(name) = &scenario.name {
                    println!("Scenario: {}", name);
                }
            }
            println!("{}", report.to_text());
        }
        OutputFormat::Json => {
            println!("{}", report.to_json_pretty());
        }
        OutputFormat::JsonCompact => {
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> RegistryReport {
        replay(&Scenario::from_toml_str(text).unwrap(), false, false).unwrap()
    }

    #[test]
    fn test_replay_counts() {
        let report = run(
            r#"
            [[steps]]
            action = "on"
            event = "data"
            handler = "a"

            [[steps]]
            action = "on"
            event = "data"
            handler = "b"

            [[steps]]
            action = "emit"
            event = "data"
            args = [1, "two"]
            count = 3
            "#,
        );

        let data = report.event(&"data".into()).unwrap();
        assert_eq!(data.times_emitted, 3);
        assert_eq!(data.handlers.len(), 2);
        assert!(data.handlers.iter().all(|h| h.times_invoked == 3));
        assert_eq!(data.previous_arguments, vec![Arg::from(1), Arg::from("two")]);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_replay_retention() {
        let report = run(
            r#"
            [config]
            save_inactive_event_details = true

            [[steps]]
            action = "on"
            event = "data"
            handler = "a"

            [[steps]]
            action = "emit"
            event = "data"

            [[steps]]
            action = "off"
            event = "data"
            handler = "a"
            "#,
        );

        let data = report.event(&"data".into()).unwrap();
        assert_eq!(data.state, EventState::Inactive);
        assert_eq!(data.times_emitted, 1);
    }

    #[test]
    fn test_replay_exclusions() {
        let report = run(
            r#"
            [[steps]]
            action = "exclude-event"
            event = "tick"

            [[steps]]
            action = "on"
            event = "tick"
            handler = "clock"

            [[steps]]
            action = "on"
            event = "data"
            handler = "clock"

            [[steps]]
            action = "exclude-handler"
            handler = "clock"

            [[steps]]
            action = "emit"
            event = "tick"
            "#,
        );

        assert!(report.event(&"tick".into()).is_none());
        assert!(report.event(&"data".into()).is_none());
        assert_eq!(report.diagnostics.len(), 1);
    }
}
