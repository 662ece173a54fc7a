// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Bounded task pool for one fan-out invocation

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use super::UnitTask;
use crate::artifact::{ArtifactCollection, ArtifactHandle};
use crate::context::{RunContext, DEFAULT_TASK_TIMEOUT};
use crate::errors::{GenoflowError, GenoflowResult};
use crate::utils::task_progress;

type TaskOutcome = (usize, String, GenoflowResult<Vec<Arc<dyn ArtifactHandle>>>);

/// Worker count for one invocation: `max(1, min(threads, preferred))`
pub fn pool_size(threads: usize, preferred_max: usize) -> usize {
    threads.min(preferred_max).max(1)
}

/// Outcome of a successful fan-out
#[derive(Debug, Clone, Default)]
pub struct FanOutReport {
    /// Units that produced at least one task
    pub units: usize,
    /// Units that produced no tasks
    pub skipped_units: Vec<String>,
    pub tasks: usize,
    pub pool_size: usize,
    /// Artifacts merged into the output collection
    pub outputs: usize,
    pub elapsed: Duration,
}

/// Runs a fixed set of tasks on a fresh pool and merges their outputs
pub struct FanOutRunner {
    operator: String,
    pool_size: usize,
    timeout: Duration,
    show_progress: bool,
}

impl FanOutRunner {
    pub fn new(operator: impl Into<String>, pool_size: usize) -> Self {
        Self {
            operator: operator.into(),
            pool_size: pool_size.max(1),
            timeout: DEFAULT_TASK_TIMEOUT,
            show_progress: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Run every task and wait for all of them.
    ///
    /// Outputs of successful tasks are appended to `collection` in completion
    /// order once the pool has drained. A failing task does not stop its
    /// siblings; failures are reported together afterwards.
    pub async fn run(
        self,
        tasks: Vec<Box<dyn UnitTask>>,
        ctx: &RunContext,
        collection: &ArtifactCollection,
    ) -> GenoflowResult<FanOutReport> {
        let start = Instant::now();
        let total = tasks.len();
        let task_units: Vec<String> = tasks.iter().map(|t| t.unit().to_string()).collect();

        tracing::info!(
            operator = %self.operator,
            tasks = total,
            pool_size = self.pool_size,
            "starting fan-out"
        );

        let semaphore = Arc::new(Semaphore::new(self.pool_size));
        let shared_ctx = Arc::new(ctx.clone());
        let (tx, mut rx) = mpsc::unbounded_channel::<TaskOutcome>();
        let progress = task_progress(total as u64, &self.operator, self.show_progress);

        let mut set = JoinSet::new();
        for (index, task) in tasks.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let ctx = Arc::clone(&shared_ctx);
            let tx = tx.clone();

            set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let unit = task.unit().to_string();
                tracing::debug!(%unit, "task started");
                let result = task.run(&ctx).await;
                // The receiver outlives every task.
                let _ = tx.send((index, unit, result));
            });
        }
        drop(tx);

        let wait = async {
            while let Some(joined) = set.join_next().await {
                if let Err(e) = joined {
                    tracing::warn!(operator = %self.operator, error = %e, "task did not finish");
                }
                progress.inc(1);
            }
        };

        if tokio::time::timeout(self.timeout, wait).await.is_err() {
            let pending = set.len();
            set.abort_all();
            progress.abandon_with_message(format!("{} timed out", self.operator));
            tracing::error!(operator = %self.operator, pending, "fan-out timed out");
            return Err(GenoflowError::TaskTimeout {
                operator: self.operator,
                timeout_secs: self.timeout.as_secs(),
                pending,
            });
        }
        progress.finish_and_clear();

        let mut reported = vec![false; total];
        let mut failures: BTreeMap<usize, (String, String)> = BTreeMap::new();
        let mut merged = 0;

        while let Some((index, unit, result)) = rx.recv().await {
            reported[index] = true;
            match result {
                Ok(outputs) => {
                    merged += outputs.len();
                    collection.extend(outputs);
                }
                Err(e) => {
                    tracing::warn!(operator = %self.operator, %unit, error = %e, "task failed");
                    failures.insert(index, (unit, e.to_string()));
                }
            }
        }

        for (index, unit) in task_units.iter().enumerate() {
            if !reported[index] {
                failures.insert(index, (unit.clone(), "task aborted before reporting".to_string()));
            }
        }

        if !failures.is_empty() {
            let mut failed_units: Vec<String> = Vec::new();
            for (unit, _) in failures.values() {
                if !failed_units.contains(unit) {
                    failed_units.push(unit.clone());
                }
            }
            let details = failures
                .values()
                .map(|(unit, message)| format!("{unit}: {message}"))
                .collect::<Vec<_>>()
                .join("\n");

            return Err(GenoflowError::FanOutFailed {
                operator: self.operator,
                failed_units,
                details: Some(details),
            });
        }

        let elapsed = start.elapsed();
        tracing::info!(
            operator = %self.operator,
            tasks = total,
            outputs = merged,
            elapsed_secs = elapsed.as_secs_f64(),
            "fan-out finished"
        );

        Ok(FanOutReport {
            units: 0,
            skipped_units: Vec::new(),
            tasks: total,
            pool_size: self.pool_size,
            outputs: merged,
            elapsed,
        })
    }
}
