// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Validate command - build the graph without running it

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use crate::errors::GenoflowError;
use crate::pipeline::Pipeline;

/// Run the validate command
pub async fn run(config: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    if !config.exists() {
        return Err(GenoflowError::ConfigNotFound { path: config }.into());
    }

    let mut pipeline = match Pipeline::from_file(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("  {} Failed to parse pipeline document", "✗".red());
            eprintln!();
            return Err(e.into());
        }
    };

    println!("  {} Pipeline document parsed", "✓".green());

    let registry = match pipeline.build() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("  {} Failed to build object graph", "✗".red());
            eprintln!();
            return Err(e.into());
        }
    };

    println!(
        "  {} Object graph built ({} components, {} operators)",
        "✓".green(),
        registry.len(),
        registry.plan().len()
    );

    if verbose {
        println!();
        println!("{}:", "Components".bold());
        for label in registry.labels() {
            if let Some(node) = registry.get(label) {
                let role = if node.is_operator() { "operator" } else { "component" };
                println!("  - {} ({}, {})", label, node.kind(), role.dimmed());
            }
        }
    }

    let missing = pipeline.missing_tools();
    if !missing.is_empty() {
        println!();
        println!("{}:", "Missing tools".red().bold());
        for tool in &missing {
            println!("  {} {}", "✗".red(), tool);
        }
        return Err(GenoflowError::ToolsMissing { tools: missing }.into());
    }

    println!("  {} Required tools found", "✓".green());
    println!();
    println!("{}", "Pipeline is valid!".green().bold());
    Ok(())
}
