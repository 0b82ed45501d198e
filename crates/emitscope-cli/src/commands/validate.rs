//! Validate command - Validate a scenario file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::OutputFormat;
use crate::scenario::Scenario;

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the scenario file
    #[arg(required = true)]
    pub scenario: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Validation result.
#[derive(Debug, Serialize)]
struct ValidationResult {
    valid: bool,
    path: String,
    name: Option<String>,
    steps: usize,
    warnings: Vec<String>,
    errors: Vec<String>,
}

/// Execute the validate command.
pub fn execute(args: ValidateArgs, format: OutputFormat) -> Result<()> {
    let mut result = ValidationResult {
        valid: true,
        path: args.scenario.display().to_string(),
        name: None,
        steps: 0,
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    match Scenario::load(&args.scenario) {
        Ok(scenario) => {
            result.name = scenario.name.clone();
            result.steps = scenario.steps.len();
            result.warnings = scenario.warnings();

            if scenario.steps.is_empty() {
                result.warnings.push("Scenario has no steps".to_string());
            }
            if args.strict && !result.warnings.is_empty() {
                result.valid = false;
                result.errors.push(format!(
                    "{} warning(s) in strict mode",
                    result.warnings.len()
                ));
            }
        }
        Err(e) => {
            result.valid = false;
            result.errors.push(format!("{:#}", e));
        }
    }

    // Output results
    match format {
        OutputFormat::Human => {
            if result.valid {
                println!("Scenario is valid: {}", args.scenario.display());
                if let Some(name) = &result.name {
                    println!("  Name: {}", name);
                }
                println!("  Steps: {}", result.steps);
            } else {
                println!("Scenario is INVALID: {}", args.scenario.display());
                for error in &result.errors {
                    println!("  Error: {}", error);
                }
            }

            if !result.warnings.is_empty() {
                println!("\nWarnings:");
                for warning in &result.warnings {
                    println!("  - {}", warning);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::JsonCompact => {
            println!("{}", serde_json::to_string(&result)?);
        }
    }

    if result.valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Validation failed"))
    }
}
