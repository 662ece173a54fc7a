// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Per-run context
//!
//! A [`RunContext`] carries everything a component or operator needs to know
//! about the run it belongs to. It is created once by the pipeline driver and
//! passed by reference into graph construction and operator execution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Safety net for fan-out waits. Not a cancellation mechanism.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10 * 24 * 60 * 60);

/// Settings shared by every component in one run
#[derive(Debug, Clone)]
pub struct RunContext {
    project_home: PathBuf,
    threads: usize,
    task_timeout: Duration,
    env: HashMap<String, String>,
    show_progress: bool,
}

impl RunContext {
    /// Create a context rooted at `project_home` with default settings
    pub fn new(project_home: impl Into<PathBuf>) -> Self {
        Self {
            project_home: project_home.into(),
            threads: default_threads(),
            task_timeout: DEFAULT_TASK_TIMEOUT,
            env: HashMap::new(),
            show_progress: false,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Working directory of the run
    pub fn project_home(&self) -> &Path {
        &self.project_home
    }

    /// Pipeline-wide worker count
    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    /// Environment variables exported to every process
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn show_progress(&self) -> bool {
        self.show_progress
    }

    /// Resolve a path relative to the project home
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_home.join(path)
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let ctx = RunContext::new("/data/run1");
        assert_eq!(ctx.resolve("calls/chr1.vcf"), PathBuf::from("/data/run1/calls/chr1.vcf"));
        assert_eq!(ctx.resolve("/ref/hg38.fa"), PathBuf::from("/ref/hg38.fa"));
    }

    #[test]
    fn test_threads_never_zero() {
        let ctx = RunContext::new("/tmp").with_threads(0);
        assert_eq!(ctx.threads(), 1);
    }
}
