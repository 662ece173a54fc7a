// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Pipeline driver
//!
//! Builds the object graph once and runs the execution plan strictly in
//! order. The first failing operator ends the run; nothing after it is
//! dispatched and nothing is retried.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{PipelineListener, RunSummary};
use crate::component::TypeTable;
use crate::config::PipelineDocument;
use crate::context::RunContext;
use crate::errors::{GenoflowError, GenoflowResult};
use crate::operator::{dispatch, Operator};
use crate::registry::ObjectRegistry;

/// One run of a pipeline document
pub struct Pipeline {
    document: PipelineDocument,
    types: TypeTable,
    context: RunContext,
    listeners: Vec<Arc<dyn PipelineListener>>,
    registry: Option<ObjectRegistry>,
    executed: bool,
    elapsed: Option<Duration>,
}

impl Pipeline {
    /// Load a pipeline document from disk
    pub fn from_file(path: &Path) -> GenoflowResult<Self> {
        Ok(Self::from_document(PipelineDocument::from_file(path)?))
    }

    /// Pipeline over an already parsed document, with the built-in types
    pub fn from_document(document: PipelineDocument) -> Self {
        let context = document.run_context();
        Self {
            document,
            types: TypeTable::with_builtins(),
            context,
            listeners: Vec::new(),
            registry: None,
            executed: false,
            elapsed: None,
        }
    }

    /// Replace the type table used to build the graph
    pub fn with_types(mut self, types: TypeTable) -> Self {
        self.types = types;
        self
    }

    /// Override the document's thread count
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.context = self.context.with_threads(threads);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.context = self.context.with_progress(show_progress);
        self
    }

    pub fn add_listener(&mut self, listener: Arc<dyn PipelineListener>) {
        self.listeners.push(listener);
    }

    pub fn document(&self) -> &PipelineDocument {
        &self.document
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// The built graph, once [`Pipeline::build`] has run
    pub fn registry(&self) -> Option<&ObjectRegistry> {
        self.registry.as_ref()
    }

    /// Build the object graph. A pipeline is built at most once.
    pub fn build(&mut self) -> GenoflowResult<&ObjectRegistry> {
        if self.registry.is_some() {
            return Err(GenoflowError::AlreadyBuilt);
        }

        let registry = ObjectRegistry::build(&self.document, &self.types, &self.context)?;
        Ok(self.registry.insert(registry))
    }

    /// Operators of the execution plan, empty before the build
    pub fn plan(&self) -> &[Arc<dyn Operator>] {
        self.registry.as_ref().map(|r| r.plan()).unwrap_or_default()
    }

    /// Tools required by planned operators that are not on `PATH`
    pub fn missing_tools(&self) -> Vec<String> {
        let required: BTreeSet<String> = self
            .plan()
            .iter()
            .flat_map(|op| op.required_tools())
            .collect();

        required
            .into_iter()
            .filter(|tool| which::which(tool).is_err())
            .collect()
    }

    /// Run every planned operator in order, building the graph first if needed.
    /// A pipeline runs at most once.
    pub async fn execute(&mut self) -> GenoflowResult<RunSummary> {
        if self.executed {
            return Err(GenoflowError::AlreadyExecuted);
        }
        if self.registry.is_none() {
            self.build()?;
        }
        self.executed = true;

        let start = Instant::now();
        let plan = self.plan().to_vec();
        let home = self.context.project_home().to_path_buf();

        tokio::fs::create_dir_all(&home)
            .await
            .map_err(|e| GenoflowError::FileWriteError {
                path: home.clone(),
                error: e.to_string(),
            })?;

        self.message(&format!(
            "Running {} operator{} in {}",
            plan.len(),
            if plan.len() == 1 { "" } else { "s" },
            home.display()
        ));

        for operator in &plan {
            let operator = operator.as_ref();
            for listener in &self.listeners {
                listener.operator_beginning(operator);
            }

            match dispatch(operator, &self.context).await {
                Ok(()) => {
                    for listener in &self.listeners {
                        listener.operator_completed(operator);
                    }
                }
                Err(error) => {
                    for listener in &self.listeners {
                        listener.error_encountered(operator, &error);
                    }
                    tracing::error!(operator = %operator.label(), %error, "operator failed");
                    self.elapsed = Some(start.elapsed());
                    return Err(error.in_operator(operator.label()));
                }
            }
        }

        let elapsed = start.elapsed();
        self.elapsed = Some(elapsed);
        self.message(&format!(
            "Pipeline completed in {:.2}s",
            elapsed.as_secs_f64()
        ));

        Ok(RunSummary::collect(
            &plan,
            &home,
            self.document.digest(),
            self.elapsed,
        ))
    }

    /// Current state of every planned operator. Available after a failure too.
    pub fn summary(&self) -> Option<RunSummary> {
        let registry = self.registry.as_ref()?;
        Some(RunSummary::collect(
            registry.plan(),
            self.context.project_home(),
            self.document.digest(),
            self.elapsed,
        ))
    }

    fn message(&self, text: &str) {
        for listener in &self.listeners {
            listener.message(text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::OperatorState;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn with_prefix(&self, prefix: &str) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| e.strip_prefix(prefix).map(String::from))
                .collect()
        }
    }

    impl PipelineListener for Recorder {
        fn operator_beginning(&self, operator: &dyn Operator) {
            self.events.lock().unwrap().push(format!("begin:{}", operator.label()));
        }

        fn operator_completed(&self, operator: &dyn Operator) {
            self.events.lock().unwrap().push(format!("done:{}", operator.label()));
        }

        fn error_encountered(&self, operator: &dyn Operator, _error: &GenoflowError) {
            self.events.lock().unwrap().push(format!("error:{}", operator.label()));
        }
    }

    fn pipeline(dir: &TempDir, steps: &[(&str, &str)]) -> Pipeline {
        let mut yaml = format!("project_home: {}\ncomponents:\n", dir.path().display());
        for (label, command) in steps {
            yaml.push_str(&format!(
                "  - tag: {label}\n    type: shell\n    command: \"{command}\"\n"
            ));
        }
        Pipeline::from_document(PipelineDocument::from_yaml(&yaml).unwrap())
    }

    #[tokio::test]
    async fn test_operators_run_in_document_order() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(
            &dir,
            &[("first", "echo 1 >> log"), ("second", "echo 2 >> log"), ("third", "echo 3 >> log")],
        );
        let recorder = Arc::new(Recorder::default());
        pipeline.add_listener(recorder.clone());

        let summary = pipeline.execute().await.unwrap();

        assert_eq!(recorder.with_prefix("begin:"), vec!["first", "second", "third"]);
        assert_eq!(recorder.with_prefix("done:"), vec!["first", "second", "third"]);
        assert_eq!(std::fs::read_to_string(dir.path().join("log")).unwrap(), "1\n2\n3\n");
        assert!(summary.succeeded);
        assert_eq!(summary.completed(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_failure_stops_the_run() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(
            &dir,
            &[("first", "true"), ("second", "exit 7"), ("third", "touch third_ran")],
        );
        let recorder = Arc::new(Recorder::default());
        pipeline.add_listener(recorder.clone());

        let err = pipeline.execute().await.unwrap_err();

        assert!(matches!(&err, GenoflowError::OperatorFailed { operator, .. } if operator == "second"));
        assert!(matches!(err.root_cause(), GenoflowError::CommandFailed { exit_code: 7, .. }));
        assert_eq!(
            recorder.events(),
            vec!["begin:first", "done:first", "begin:second", "error:second"]
        );
        assert!(!dir.path().join("third_ran").exists());

        let summary = pipeline.summary().unwrap();
        assert!(!summary.succeeded);
        assert_eq!(summary.completed(), vec!["first"]);
        assert_eq!(summary.failed().unwrap().label, "second");
        assert_eq!(summary.operators[2].status.state, OperatorState::NotStarted);
    }

    #[tokio::test]
    async fn test_build_only_once() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(&dir, &[("only", "true")]);

        pipeline.build().unwrap();
        assert!(matches!(pipeline.build(), Err(GenoflowError::AlreadyBuilt)));

        pipeline.execute().await.unwrap();
        assert_eq!(pipeline.plan()[0].status().state(), OperatorState::Completed);
    }

    #[tokio::test]
    async fn test_second_execute_rejected() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = pipeline(&dir, &[("a", "echo x >> log")]);
        let recorder = Arc::new(Recorder::default());
        pipeline.add_listener(recorder.clone());

        pipeline.execute().await.unwrap();
        let events = recorder.events();

        assert!(matches!(pipeline.execute().await, Err(GenoflowError::AlreadyExecuted)));
        assert_eq!(recorder.events(), events);
        assert_eq!(std::fs::read_to_string(dir.path().join("log")).unwrap(), "x\n");
        assert_eq!(pipeline.plan()[0].status().state(), OperatorState::Completed);
    }

    #[tokio::test]
    async fn test_project_home_is_created() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("nested/work");
        let yaml = format!(
            "project_home: {}\ncomponents:\n  - tag: hello\n    type: shell\n    command: echo hi > greeting\n",
            home.display()
        );
        let mut pipeline = Pipeline::from_document(PipelineDocument::from_yaml(&yaml).unwrap());

        pipeline.execute().await.unwrap();
        assert!(home.join("greeting").exists());
    }

    #[test]
    fn test_missing_tools() {
        let dir = TempDir::new().unwrap();
        let yaml = format!(
            "project_home: {}\ncomponents:\n  - tag: align\n    type: shell\n    command: 'true'\n    requires: definitely-not-a-real-tool-xyz, sh\n",
            dir.path().display()
        );
        let mut pipeline = Pipeline::from_document(PipelineDocument::from_yaml(&yaml).unwrap());
        pipeline.build().unwrap();

        assert_eq!(pipeline.missing_tools(), vec!["definitely-not-a-real-tool-xyz"]);
    }
}
