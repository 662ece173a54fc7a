// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! genoflow - Declarative genomic workflow runner
//!
//! Builds a component graph from a pipeline document and runs its operators.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genoflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "genoflow=debug" } else { "genoflow=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            config,
            threads,
            report,
            no_progress,
        } => genoflow::cli::run::run(config, threads, report, no_progress, cli.verbose).await,
        Commands::Validate { config } => genoflow::cli::validate::run(config, cli.verbose).await,
        Commands::Plan {
            config,
            threads,
            format,
        } => genoflow::cli::plan::run(config, threads, format, cli.verbose).await,
        Commands::Types => genoflow::cli::types::run(cli.verbose).await,
    }
}
