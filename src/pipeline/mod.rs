// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Pipeline execution
//!
//! The driver, the listeners it notifies, and the summary it returns.

mod driver;
mod listener;
mod report;

pub use driver::Pipeline;
pub use listener::{ConsoleListener, LogListener, PipelineListener};
pub use report::{OperatorReport, RunSummary};
