// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Plan command - show the operators a run would execute

use colored::Colorize;
use miette::Result;
use serde::Serialize;
use std::path::PathBuf;

use super::OutputFormat;
use crate::errors::{GenoflowError, GenoflowResult};
use crate::operator::Operator;
use crate::pipeline::Pipeline;

#[derive(Debug, Serialize)]
struct PlanEntry {
    position: usize,
    label: String,
    kind: String,
    inputs: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
    requires: Vec<String>,
}

impl PlanEntry {
    fn new(position: usize, operator: &dyn Operator) -> Self {
        Self {
            position,
            label: operator.label().to_string(),
            kind: operator.kind().to_string(),
            inputs: operator
                .inputs()
                .iter()
                .map(|a| a.absolute_path().to_path_buf())
                .collect(),
            outputs: operator
                .outputs()
                .iter()
                .map(|a| a.absolute_path().to_path_buf())
                .collect(),
            requires: operator.required_tools(),
        }
    }
}

/// Run the plan command
pub async fn run(
    config: PathBuf,
    threads: Option<usize>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    if !config.exists() {
        return Err(GenoflowError::ConfigNotFound { path: config }.into());
    }

    let mut pipeline = Pipeline::from_file(&config)?;
    if let Some(threads) = threads {
        pipeline = pipeline.with_threads(threads);
    }
    pipeline.build()?;

    let entries: Vec<PlanEntry> = pipeline
        .plan()
        .iter()
        .enumerate()
        .map(|(i, op)| PlanEntry::new(i + 1, op.as_ref()))
        .collect();

    let output = match format {
        OutputFormat::Json => to_json(&entries)?,
        OutputFormat::Text => to_text(&pipeline, &entries, verbose),
    };

    println!("{}", output);
    Ok(())
}

fn to_json(entries: &[PlanEntry]) -> GenoflowResult<String> {
    serde_json::to_string_pretty(entries).map_err(Into::into)
}

fn to_text(pipeline: &Pipeline, entries: &[PlanEntry], verbose: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Execution plan ({} operator{}, {} threads):\n\n",
        entries.len(),
        if entries.len() == 1 { "" } else { "s" },
        pipeline.context().threads()
    ));

    for entry in entries {
        out.push_str(&format!(
            "  {}. {} ({})\n",
            entry.position,
            entry.label.bold(),
            entry.kind
        ));

        if verbose {
            for input in &entry.inputs {
                out.push_str(&format!("       {} {}\n", "in ".dimmed(), input.display()));
            }
            for output in &entry.outputs {
                out.push_str(&format!("       {} {}\n", "out".dimmed(), output.display()));
            }
            if !entry.requires.is_empty() {
                out.push_str(&format!(
                    "       {} {}\n",
                    "req".dimmed(),
                    entry.requires.join(", ")
                ));
            }
        }
    }

    out
}
