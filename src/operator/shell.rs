// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Shell operator
//!
//! Runs one templated command line. Outputs are declared as `file`
//! components; on success they can be published into a `file_set`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::{run_shell, CommandTemplate, Operator, OperatorStatus};
use crate::artifact::{join_paths, ArtifactCollection, ArtifactHandle};
use crate::component::{BuildContext, Component, ComponentCore, Node};
use crate::context::RunContext;
use crate::errors::{GenoflowError, GenoflowResult};
use crate::utils::operator_spinner;

const PLACEHOLDERS: &[&str] = &["input", "inputs", "output", "outputs", "threads", "project_home"];

/// Shell operator
pub struct ShellOperator {
    core: ComponentCore,
    status: OperatorStatus,
    command: Option<CommandTemplate>,
    inputs: Vec<Node>,
    outputs: Vec<Node>,
    publish: Option<Arc<ArtifactCollection>>,
    env: HashMap<String, String>,
    shell: String,
    requires: Vec<String>,
    threads: Option<usize>,
}

impl ShellOperator {
    pub const KIND: &'static str = "shell";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::KIND),
            status: OperatorStatus::new(),
            command: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            publish: None,
            env: HashMap::new(),
            shell: "bash".to_string(),
            requires: Vec::new(),
            threads: None,
        }
    }

    /// Render the command line for this run
    pub fn render(&self, ctx: &RunContext) -> GenoflowResult<String> {
        let template = self.command.as_ref().ok_or_else(|| GenoflowError::MissingAttribute {
            label: self.label().to_string(),
            attribute: "command".to_string(),
        })?;

        let inputs = self.inputs();
        let outputs = self.outputs();
        let first = |artifacts: &[Arc<dyn ArtifactHandle>]| {
            artifacts
                .first()
                .map(|a| a.absolute_path().display().to_string())
                .unwrap_or_default()
        };

        let values = HashMap::from([
            ("input", first(&inputs)),
            ("inputs", join_paths(&inputs)),
            ("output", first(&outputs)),
            ("outputs", join_paths(&outputs)),
            ("threads", self.threads.unwrap_or(ctx.threads()).to_string()),
            ("project_home", ctx.project_home().display().to_string()),
        ]);

        template.render(&values)
    }
}

impl Default for ShellOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ShellOperator {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn initialize(&mut self, ctx: &BuildContext<'_>, _children: &[Node]) -> GenoflowResult<()> {
        let command = CommandTemplate::new(self.core.require("command")?);
        command.check(PLACEHOLDERS)?;
        self.command = Some(command);

        if let Some(labels) = self.core.attribute("inputs") {
            self.inputs = ctx.lookup_list(labels)?;
        }
        if let Some(labels) = self.core.attribute("outputs") {
            self.outputs = ctx.lookup_list(labels)?;
        }
        if let Some(label) = self.core.attribute("publish") {
            self.publish = Some(ctx.lookup_collection(label.trim())?);
        }
        for label in self.core.list("env") {
            self.env.extend(ctx.lookup_properties(&label)?);
        }
        if let Some(shell) = self.core.attribute("shell") {
            self.shell = shell.trim().to_string();
        }

        self.requires = self.core.list("requires");
        self.threads = self.core.parse("threads")?;
        Ok(())
    }
}

#[async_trait]
impl Operator for ShellOperator {
    fn status(&self) -> &OperatorStatus {
        &self.status
    }

    fn inputs(&self) -> Vec<Arc<dyn ArtifactHandle>> {
        self.inputs.iter().flat_map(Node::artifacts).collect()
    }

    fn outputs(&self) -> Vec<Arc<dyn ArtifactHandle>> {
        self.outputs.iter().flat_map(Node::artifacts).collect()
    }

    fn required_tools(&self) -> Vec<String> {
        let mut tools = vec![self.shell.clone()];
        tools.extend(self.requires.iter().cloned());
        tools
    }

    async fn perform_operation(&self, ctx: &RunContext) -> GenoflowResult<()> {
        let command = self.render(ctx)?;

        let outputs = self.outputs();
        for output in &outputs {
            if let Some(parent) = output.absolute_path().parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    GenoflowError::FileWriteError {
                        path: parent.to_path_buf(),
                        error: e.to_string(),
                    }
                })?;
            }
        }

        let mut env = ctx.env().clone();
        env.extend(self.env.clone());

        let spinner = operator_spinner(self.label(), ctx.show_progress());
        let result = run_shell(&self.shell, &command, ctx.project_home(), &env).await;
        spinner.finish_and_clear();
        let output = result?;

        tracing::info!(
            operator = %self.label(),
            elapsed_secs = output.duration.as_secs_f64(),
            "command finished"
        );
        if !output.stdout.is_empty() {
            tracing::debug!(operator = %self.label(), stdout = %output.stdout.trim_end());
        }

        if let Some(publish) = &self.publish {
            publish.extend(outputs);
        }

        Ok(())
    }
}
