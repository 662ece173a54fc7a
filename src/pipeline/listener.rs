// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Run listeners
//!
//! Listeners are told about each operator as the driver reaches it. They are
//! called synchronously, in registration order, on the driver's task.

use colored::Colorize;

use crate::errors::GenoflowError;
use crate::operator::Operator;

/// Observer of a pipeline run. Every method defaults to doing nothing.
pub trait PipelineListener: Send + Sync {
    fn operator_beginning(&self, _operator: &dyn Operator) {}

    fn operator_completed(&self, _operator: &dyn Operator) {}

    fn message(&self, _text: &str) {}

    fn error_encountered(&self, _operator: &dyn Operator, _error: &GenoflowError) {}
}

/// Forwards notifications to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogListener;

impl PipelineListener for LogListener {
    fn operator_beginning(&self, operator: &dyn Operator) {
        tracing::info!(operator = %operator.label(), kind = %operator.kind(), "operator starting");
    }

    fn operator_completed(&self, operator: &dyn Operator) {
        let elapsed = operator.status().elapsed().unwrap_or_default();
        tracing::info!(
            operator = %operator.label(),
            elapsed_secs = elapsed.as_secs_f64(),
            "operator completed"
        );
    }

    fn message(&self, text: &str) {
        tracing::info!("{}", text);
    }

    fn error_encountered(&self, operator: &dyn Operator, error: &GenoflowError) {
        tracing::warn!(operator = %operator.label(), %error, "operator reported an error");
    }
}

/// Colored progress lines on the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleListener {
    verbose: bool,
}

impl ConsoleListener {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl PipelineListener for ConsoleListener {
    fn operator_beginning(&self, operator: &dyn Operator) {
        println!("  {} {} ({})", "→".blue(), operator.label(), operator.kind().dimmed());
    }

    fn operator_completed(&self, operator: &dyn Operator) {
        let elapsed = operator.status().elapsed().unwrap_or_default();
        println!(
            "  {} {} ({:.2}s)",
            "✓".green(),
            operator.label().bold(),
            elapsed.as_secs_f64()
        );
    }

    fn message(&self, text: &str) {
        println!("{}", text);
    }

    fn error_encountered(&self, operator: &dyn Operator, error: &GenoflowError) {
        println!("  {} {} failed", "✗".red(), operator.label().bold());
        if self.verbose {
            eprintln!("{}", error.to_string().dimmed());
        }
    }
}
