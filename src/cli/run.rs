// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Run command - execute the pipeline

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::errors::GenoflowError;
use crate::pipeline::{ConsoleListener, LogListener, Pipeline};

/// Run the pipeline
pub async fn run(
    config: PathBuf,
    threads: Option<usize>,
    report: Option<PathBuf>,
    no_progress: bool,
    verbose: bool,
) -> Result<()> {
    if !config.exists() {
        return Err(GenoflowError::ConfigNotFound { path: config }.into());
    }

    let mut pipeline = Pipeline::from_file(&config)?.with_progress(!no_progress);
    if let Some(threads) = threads {
        pipeline = pipeline.with_threads(threads);
    }

    pipeline.add_listener(Arc::new(ConsoleListener::new(verbose)));
    if verbose {
        pipeline.add_listener(Arc::new(LogListener));
    }

    println!();
    println!("{}: {}", "Pipeline".bold(), config.display());
    println!("{}", "═".repeat(50));

    pipeline.build()?;

    let missing = pipeline.missing_tools();
    if !missing.is_empty() {
        eprintln!("{}", "Missing required tools:".red().bold());
        for tool in &missing {
            eprintln!("  {} {}", "✗".red(), tool);
        }
        return Err(GenoflowError::ToolsMissing { tools: missing }.into());
    }

    let outcome = pipeline.execute().await;

    if let Some(path) = &report {
        if let Some(summary) = pipeline.summary() {
            summary.write_json(path)?;
            if verbose {
                println!("{} {}", "Report written to".dimmed(), path.display());
            }
        }
    }

    match outcome {
        Ok(summary) => {
            let outputs: Vec<_> = summary
                .operators
                .iter()
                .flat_map(|op| op.outputs.iter())
                .collect();

            if !outputs.is_empty() {
                println!();
                println!("{}:", "Outputs".bold());
                for output in outputs {
                    println!("  - {}", output.display());
                }
            }

            println!();
            println!(
                "{}",
                format!(
                    "Pipeline completed successfully in {:.2}s",
                    summary.duration_secs.unwrap_or_default()
                )
                .green()
            );
            Ok(())
        }
        Err(e) => {
            println!();
            println!("{}", "Pipeline failed".red().bold());
            Err(e.into())
        }
    }
}
