// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Operators
//!
//! An operator is a component that does one step of work. It exposes its
//! input and output artifacts, a single async entry point, and a status that
//! moves NotStarted → Running → Completed or Failed exactly once.

mod process;
mod shell;
mod template;

pub use process::{run_shell, ProcessOutput};
pub use shell::ShellOperator;
pub use template::CommandTemplate;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::Instrument;

use crate::artifact::ArtifactHandle;
use crate::component::Component;
use crate::context::RunContext;
use crate::errors::{GenoflowError, GenoflowResult};

/// A step of work in the execution plan
#[async_trait]
pub trait Operator: Component {
    fn status(&self) -> &OperatorStatus;

    /// Input artifacts, resolved at call time
    fn inputs(&self) -> Vec<Arc<dyn ArtifactHandle>>;

    /// Output artifacts, resolved at call time
    fn outputs(&self) -> Vec<Arc<dyn ArtifactHandle>>;

    /// External executables that must be on `PATH`
    fn required_tools(&self) -> Vec<String> {
        Vec::new()
    }

    /// Do the work. Returns once every side effect has finished.
    async fn perform_operation(&self, ctx: &RunContext) -> GenoflowResult<()>;
}

/// Lifecycle state of an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

impl OperatorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for OperatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not-started"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// State and timing of one operator
#[derive(Debug)]
pub struct OperatorStatus {
    inner: Mutex<StatusInner>,
}

#[derive(Debug, Clone)]
struct StatusInner {
    state: OperatorState,
    started_at: Option<SystemTime>,
    finished_at: Option<SystemTime>,
    started: Option<Instant>,
    elapsed: Option<Duration>,
}

/// Point-in-time copy of an operator's status
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub state: OperatorState,
    /// Milliseconds since the Unix epoch
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
    pub elapsed_secs: Option<f64>,
}

impl OperatorStatus {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatusInner {
                state: OperatorState::NotStarted,
                started_at: None,
                finished_at: None,
                started: None,
                elapsed: None,
            }),
        }
    }

    pub fn state(&self) -> OperatorState {
        self.lock().state
    }

    /// NotStarted → Running
    pub fn begin(&self, operator: &str) -> GenoflowResult<()> {
        let mut inner = self.lock();
        check_transition(operator, inner.state, OperatorState::Running)?;
        inner.state = OperatorState::Running;
        inner.started_at = Some(SystemTime::now());
        inner.started = Some(Instant::now());
        Ok(())
    }

    /// Running → Completed
    pub fn complete(&self, operator: &str) -> GenoflowResult<()> {
        self.finish(operator, OperatorState::Completed)
    }

    /// Running → Failed
    pub fn fail(&self, operator: &str) -> GenoflowResult<()> {
        self.finish(operator, OperatorState::Failed)
    }

    pub fn elapsed(&self) -> Option<Duration> {
        let inner = self.lock();
        inner.elapsed.or_else(|| inner.started.map(|s| s.elapsed()))
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.lock().clone();
        StatusSnapshot {
            state: inner.state,
            started_at: inner.started_at.and_then(epoch_millis),
            finished_at: inner.finished_at.and_then(epoch_millis),
            elapsed_secs: inner.elapsed.map(|d| d.as_secs_f64()),
        }
    }

    fn finish(&self, operator: &str, to: OperatorState) -> GenoflowResult<()> {
        let mut inner = self.lock();
        check_transition(operator, inner.state, to)?;
        inner.state = to;
        inner.finished_at = Some(SystemTime::now());
        inner.elapsed = inner.started.map(|s| s.elapsed());
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StatusInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for OperatorStatus {
    fn default() -> Self {
        Self::new()
    }
}

fn check_transition(operator: &str, from: OperatorState, to: OperatorState) -> GenoflowResult<()> {
    let allowed = matches!(
        (from, to),
        (OperatorState::NotStarted, OperatorState::Running)
            | (OperatorState::Running, OperatorState::Completed)
            | (OperatorState::Running, OperatorState::Failed)
    );

    if allowed {
        Ok(())
    } else {
        Err(GenoflowError::InvalidStateTransition {
            operator: operator.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

fn epoch_millis(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as u64)
}

/// Run one operator through its lifecycle.
///
/// The operator moves to Running, performs its work, and ends Completed or
/// Failed. The work's own error is returned unchanged.
pub async fn dispatch(operator: &dyn Operator, ctx: &RunContext) -> GenoflowResult<()> {
    let label = operator.label().to_string();
    operator.status().begin(&label)?;

    let span = tracing::info_span!("operator", label = %label, kind = %operator.kind());
    let result = operator.perform_operation(ctx).instrument(span).await;

    match &result {
        Ok(()) => operator.status().complete(&label)?,
        Err(_) => operator.status().fail(&label)?,
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let status = OperatorStatus::new();
        assert_eq!(status.state(), OperatorState::NotStarted);

        status.begin("align").unwrap();
        assert_eq!(status.state(), OperatorState::Running);
        assert!(status.snapshot().started_at.is_some());

        status.complete("align").unwrap();
        let snapshot = status.snapshot();
        assert_eq!(snapshot.state, OperatorState::Completed);
        assert!(snapshot.finished_at.is_some());
        assert!(snapshot.elapsed_secs.is_some());
    }

    #[test]
    fn test_no_reentry_after_terminal() {
        let status = OperatorStatus::new();
        status.begin("align").unwrap();
        status.fail("align").unwrap();

        assert!(matches!(
            status.begin("align"),
            Err(GenoflowError::InvalidStateTransition { .. })
        ));
        assert!(matches!(
            status.complete("align"),
            Err(GenoflowError::InvalidStateTransition { .. })
        ));
        assert_eq!(status.state(), OperatorState::Failed);
    }

    #[test]
    fn test_cannot_complete_without_running() {
        let status = OperatorStatus::new();
        let err = status.complete("sort").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operator 'sort' cannot move from not-started to completed"
        );
    }
}
