// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for genoflow.

pub mod plan;
pub mod run;
pub mod types;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Declarative genomic workflow runner
///
/// Builds a graph of components from a pipeline document and runs its
/// operators in order.
#[derive(Parser, Debug)]
#[clap(
    name = "genoflow",
    version,
    about = "Declarative genomic workflow runner",
    long_about = None,
    after_help = "Examples:\n\
        genoflow validate pipeline.yaml        Build the graph and check tools\n\
        genoflow plan pipeline.yaml            Show the execution plan\n\
        genoflow run pipeline.yaml -t 16       Run with 16 worker threads\n\
        genoflow types                         List component types\n\n\
        See 'genoflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline
    Run {
        /// Pipeline document (YAML, or TOML by extension)
        #[clap(default_value = "pipeline.yaml")]
        config: PathBuf,

        /// Worker threads, overriding the document
        #[clap(short, long, env = "GENOFLOW_THREADS")]
        threads: Option<usize>,

        /// Write a JSON run summary to this file
        #[clap(short, long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Hide progress bars
        #[clap(long)]
        no_progress: bool,
    },

    /// Build the object graph and check required tools without running anything
    Validate {
        /// Pipeline document
        #[clap(default_value = "pipeline.yaml")]
        config: PathBuf,
    },

    /// Show the execution plan
    Plan {
        /// Pipeline document
        #[clap(default_value = "pipeline.yaml")]
        config: PathBuf,

        /// Worker threads, overriding the document
        #[clap(short, long, env = "GENOFLOW_THREADS")]
        threads: Option<usize>,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List registered component types
    Types,
}

/// Output format for the plan command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
