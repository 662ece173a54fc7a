// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Run summary
//!
//! A serializable record of what each planned operator did, written by
//! `genoflow run --report`.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{GenoflowError, GenoflowResult};
use crate::operator::{Operator, OperatorState, StatusSnapshot};

/// Outcome of one planned operator
#[derive(Debug, Clone, Serialize)]
pub struct OperatorReport {
    pub label: String,
    pub kind: String,
    #[serde(flatten)]
    pub status: StatusSnapshot,
    pub outputs: Vec<PathBuf>,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub version: String,
    pub project_home: PathBuf,
    /// BLAKE3 digest of the pipeline document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_digest: Option<String>,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub operators: Vec<OperatorReport>,
}

impl RunSummary {
    /// Snapshot the current state of every planned operator
    pub fn collect(
        plan: &[Arc<dyn Operator>],
        project_home: &Path,
        config_digest: Option<&str>,
        duration: Option<Duration>,
    ) -> Self {
        let operators: Vec<OperatorReport> = plan
            .iter()
            .map(|op| OperatorReport {
                label: op.label().to_string(),
                kind: op.kind().to_string(),
                status: op.status().snapshot(),
                outputs: op
                    .outputs()
                    .iter()
                    .map(|a| a.absolute_path().to_path_buf())
                    .collect(),
            })
            .collect();

        let succeeded = operators
            .iter()
            .all(|r| r.status.state == OperatorState::Completed);

        Self {
            version: crate::VERSION.to_string(),
            project_home: project_home.to_path_buf(),
            config_digest: config_digest.map(String::from),
            succeeded,
            duration_secs: duration.map(|d| d.as_secs_f64()),
            operators,
        }
    }

    /// Labels of operators that completed, in plan order
    pub fn completed(&self) -> Vec<&str> {
        self.operators
            .iter()
            .filter(|r| r.status.state == OperatorState::Completed)
            .map(|r| r.label.as_str())
            .collect()
    }

    /// The operator that failed, if any
    pub fn failed(&self) -> Option<&OperatorReport> {
        self.operators
            .iter()
            .find(|r| r.status.state == OperatorState::Failed)
    }

    pub fn to_json(&self) -> GenoflowResult<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    pub fn write_json(&self, path: &Path) -> GenoflowResult<()> {
        std::fs::write(path, self.to_json()?).map_err(|e| GenoflowError::FileWriteError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }
}
