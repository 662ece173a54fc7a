// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Fan-out operators
//!
//! A fan-out operator splits its input into units (usually contigs), turns
//! each unit into zero or more independent tasks, and runs them on a bounded
//! pool created for that one invocation. Every task is produced before the
//! first one starts, and the operation returns only after all of them have
//! finished.

mod contig;
mod runner;

pub use contig::ContigCommandOperator;
pub use runner::{pool_size, FanOutReport, FanOutRunner};

use async_trait::async_trait;
use std::sync::Arc;

use crate::artifact::{ArtifactCollection, ArtifactHandle};
use crate::context::RunContext;
use crate::errors::{GenoflowError, GenoflowResult};
use crate::operator::Operator;

/// One partition of a fan-out operator's input
#[derive(Debug, Clone)]
pub struct Unit {
    pub key: String,
    /// `false` for inputs that carried no partition key
    pub partitioned: bool,
    pub inputs: Vec<Arc<dyn ArtifactHandle>>,
}

/// Independent piece of work for one unit
#[async_trait]
pub trait UnitTask: Send + Sync {
    /// Key of the unit this task belongs to
    fn unit(&self) -> &str;

    /// Run the task and return the artifacts it produced
    async fn run(&self, ctx: &RunContext) -> GenoflowResult<Vec<Arc<dyn ArtifactHandle>>>;
}

/// An operator whose work is split into per-unit tasks
pub trait FanOut: Operator {
    /// Upper bound on concurrent tasks, further capped by the run's threads
    fn preferred_max_threads(&self) -> usize;

    fn units(&self) -> GenoflowResult<Vec<Unit>>;

    /// Tasks for one unit. An empty list skips the unit.
    fn tasks_for_unit(&self, unit: &Unit, ctx: &RunContext) -> GenoflowResult<Vec<Box<dyn UnitTask>>>;

    /// Where successful task outputs are merged
    fn output_collection(&self) -> Arc<ArtifactCollection>;
}

/// Run a fan-out operator's tasks to completion.
pub async fn perform_fan_out<F>(operator: &F, ctx: &RunContext) -> GenoflowResult<FanOutReport>
where
    F: FanOut + ?Sized,
{
    let units = operator.units()?;
    if units.is_empty() {
        return Err(GenoflowError::NoUnits {
            operator: operator.label().to_string(),
        });
    }

    let mut tasks = Vec::new();
    let mut skipped_units = Vec::new();
    let mut active_units = 0;

    for unit in &units {
        let unit_tasks = operator.tasks_for_unit(unit, ctx)?;
        if unit_tasks.is_empty() {
            tracing::debug!(operator = %operator.label(), unit = %unit.key, "unit produced no tasks");
            skipped_units.push(unit.key.clone());
            continue;
        }
        active_units += 1;
        tasks.extend(unit_tasks);
    }

    let size = pool_size(ctx.threads(), operator.preferred_max_threads());
    let runner = FanOutRunner::new(operator.label(), size)
        .with_timeout(ctx.task_timeout())
        .with_progress(ctx.show_progress());

    let mut report = runner
        .run(tasks, ctx, &operator.output_collection())
        .await?;
    report.units = active_units;
    report.skipped_units = skipped_units;
    Ok(report)
}

/// Group handles into units by partition key, in order of first appearance.
///
/// Handles without a key each become their own unpartitioned unit, keyed by
/// filename. When `only` is non-empty it selects and orders the partitioned
/// units; a listed key with no handles yields a unit with no inputs.
pub fn partition_units(handles: &[Arc<dyn ArtifactHandle>], only: &[String]) -> Vec<Unit> {
    let mut units: Vec<Unit> = Vec::new();

    for handle in handles {
        match handle.partition_key() {
            Some(key) => match units.iter_mut().find(|u| u.partitioned && u.key == key) {
                Some(unit) => unit.inputs.push(Arc::clone(handle)),
                None => units.push(Unit {
                    key: key.to_string(),
                    partitioned: true,
                    inputs: vec![Arc::clone(handle)],
                }),
            },
            None => units.push(Unit {
                key: handle.filename().to_string(),
                partitioned: false,
                inputs: vec![Arc::clone(handle)],
            }),
        }
    }

    if only.is_empty() {
        return units;
    }

    let (partitioned, unpartitioned): (Vec<Unit>, Vec<Unit>) =
        units.into_iter().partition(|u| u.partitioned);

    let mut selected: Vec<Unit> = only
        .iter()
        .map(|key| {
            partitioned
                .iter()
                .find(|u| &u.key == key)
                .cloned()
                .unwrap_or_else(|| Unit {
                    key: key.clone(),
                    partitioned: true,
                    inputs: Vec::new(),
                })
        })
        .collect();
    selected.extend(unpartitioned);
    selected
}
