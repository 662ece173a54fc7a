// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! # genoflow - Declarative Genomic Workflow Runner
//!
//! `genoflow` reads a pipeline document, builds a graph of labeled
//! components from it, and runs the top-level operators one after another.
//! Operators that work per contig fan their work out over a bounded pool.
//!
//! ## Features
//!
//! - **Object registry** - Components built depth-first and wired by label
//! - **Operator lifecycle** - Every step moves through a checked state machine
//! - **Fan-out** - Per-contig tasks on a bounded pool, failures reported together
//! - **Listeners** - Observe a run from the terminal, logs, or your own code
//!
//! ## Quick Start
//!
//! ```bash
//! # Check that the graph builds and tools are installed
//! genoflow validate pipeline.yaml
//!
//! # Show what would run
//! genoflow plan pipeline.yaml
//!
//! # Run it
//! genoflow run pipeline.yaml --threads 16 --report run.json
//! ```

pub mod artifact;
pub mod cli;
pub mod component;
pub mod config;
pub mod context;
pub mod errors;
pub mod fanout;
pub mod operator;
pub mod pipeline;
pub mod registry;
pub mod utils;

// Re-export commonly used types
pub use artifact::{ArtifactCollection, ArtifactHandle, FileArtifact};
pub use component::{Component, Node, TypeTable};
pub use config::PipelineDocument;
pub use context::RunContext;
pub use errors::{GenoflowError, GenoflowResult};
pub use fanout::{FanOut, UnitTask};
pub use operator::{Operator, OperatorState};
pub use pipeline::{Pipeline, PipelineListener, RunSummary};
pub use registry::ObjectRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
