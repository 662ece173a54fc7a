// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Per-contig command operator
//!
//! Runs the same command template once per contig of its inputs, with at
//! most `max_threads` commands in flight. Each command's output file is
//! tagged with its contig and merged into the `outputs` file set.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::{partition_units, perform_fan_out, pool_size, FanOut, Unit, UnitTask};
use crate::artifact::{join_paths, ArtifactCollection, ArtifactHandle, FileArtifact};
use crate::component::{BuildContext, Component, ComponentCore, Node};
use crate::context::RunContext;
use crate::errors::{GenoflowError, GenoflowResult};
use crate::operator::{run_shell, CommandTemplate, Operator, OperatorStatus};

const PLACEHOLDERS: &[&str] = &[
    "input",
    "inputs",
    "output",
    "reference",
    "unit",
    "threads",
    "project_home",
];

const DEFAULT_MAX_THREADS: usize = 8;

/// Command fanned out over contigs
pub struct ContigCommandOperator {
    core: ComponentCore,
    status: OperatorStatus,
    command: Option<CommandTemplate>,
    output_pattern: Option<CommandTemplate>,
    inputs: Vec<Node>,
    reference: Option<Node>,
    outputs: Arc<ArtifactCollection>,
    max_threads: usize,
    contigs: Vec<String>,
    include_unpartitioned: bool,
    env: HashMap<String, String>,
    shell: String,
    requires: Vec<String>,
}

impl ContigCommandOperator {
    pub const KIND: &'static str = "contig_command";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::KIND),
            status: OperatorStatus::new(),
            command: None,
            output_pattern: None,
            inputs: Vec::new(),
            reference: None,
            outputs: Arc::new(ArtifactCollection::new()),
            max_threads: DEFAULT_MAX_THREADS,
            contigs: Vec::new(),
            include_unpartitioned: false,
            env: HashMap::new(),
            shell: "bash".to_string(),
            requires: Vec::new(),
        }
    }

    fn reference_path(&self) -> String {
        self.reference
            .as_ref()
            .and_then(|node| node.artifacts().into_iter().next())
            .map(|a| a.absolute_path().display().to_string())
            .unwrap_or_default()
    }

    fn output_for(&self, unit: &Unit, ctx: &RunContext) -> GenoflowResult<Option<FileArtifact>> {
        let Some(pattern) = &self.output_pattern else {
            return Ok(None);
        };

        let relative = pattern.render(&HashMap::from([("unit", unit.key.clone())]))?;
        let mut artifact = FileArtifact::new(ctx.resolve(relative));
        if unit.partitioned {
            artifact = artifact.with_partition(unit.key.clone());
        }
        Ok(Some(artifact))
    }
}

impl Default for ContigCommandOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ContigCommandOperator {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn initialize(&mut self, ctx: &BuildContext<'_>, _children: &[Node]) -> GenoflowResult<()> {
        let command = CommandTemplate::new(self.core.require("command")?);
        command.check(PLACEHOLDERS)?;

        if let Some(pattern) = self.core.attribute("output_pattern") {
            let pattern = CommandTemplate::new(pattern.trim());
            pattern.check(&["unit"])?;
            self.output_pattern = Some(pattern);
        } else if command.placeholders().contains(&"output") {
            return Err(GenoflowError::InvalidAttribute {
                label: self.core.label().to_string(),
                attribute: "command".to_string(),
                reason: "'{output}' needs an 'output_pattern' such as 'calls/{unit}.vcf'".to_string(),
            });
        }
        self.command = Some(command);

        self.inputs = ctx.lookup_list(self.core.require("inputs")?)?;
        if let Some(label) = self.core.attribute("reference") {
            self.reference = Some(ctx.lookup(label.trim())?);
        }
        if let Some(label) = self.core.attribute("outputs") {
            self.outputs = ctx.lookup_collection(label.trim())?;
        }
        for label in self.core.list("env") {
            self.env.extend(ctx.lookup_properties(&label)?);
        }
        if let Some(shell) = self.core.attribute("shell") {
            self.shell = shell.trim().to_string();
        }

        if let Some(max) = self.core.parse::<usize>("max_threads")? {
            if max == 0 {
                return Err(GenoflowError::InvalidAttribute {
                    label: self.core.label().to_string(),
                    attribute: "max_threads".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            self.max_threads = max;
        }

        self.contigs = self.core.list("contigs");
        self.include_unpartitioned = self.core.flag("include_unpartitioned")?;
        self.requires = self.core.list("requires");
        Ok(())
    }

    fn collection(&self) -> Option<Arc<ArtifactCollection>> {
        Some(Arc::clone(&self.outputs))
    }
}

#[async_trait]
impl Operator for ContigCommandOperator {
    fn status(&self) -> &OperatorStatus {
        &self.status
    }

    fn inputs(&self) -> Vec<Arc<dyn ArtifactHandle>> {
        let mut inputs: Vec<_> = self.inputs.iter().flat_map(Node::artifacts).collect();
        if let Some(reference) = &self.reference {
            inputs.extend(reference.artifacts());
        }
        inputs
    }

    fn outputs(&self) -> Vec<Arc<dyn ArtifactHandle>> {
        self.outputs.snapshot()
    }

    fn required_tools(&self) -> Vec<String> {
        let mut tools = vec![self.shell.clone()];
        tools.extend(self.requires.iter().cloned());
        tools
    }

    async fn perform_operation(&self, ctx: &RunContext) -> GenoflowResult<()> {
        let report = perform_fan_out(self, ctx).await?;

        tracing::info!(
            operator = %self.label(),
            units = report.units,
            skipped = report.skipped_units.len(),
            outputs = report.outputs,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "contig command finished"
        );
        Ok(())
    }
}

impl FanOut for ContigCommandOperator {
    fn preferred_max_threads(&self) -> usize {
        self.max_threads
    }

    fn units(&self) -> GenoflowResult<Vec<Unit>> {
        let handles: Vec<_> = self.inputs.iter().flat_map(Node::artifacts).collect();
        let mut units = partition_units(&handles, &self.contigs);

        if !self.include_unpartitioned {
            let dropped = units.iter().filter(|u| !u.partitioned).count();
            if dropped > 0 {
                tracing::warn!(
                    operator = %self.label(),
                    dropped,
                    "ignoring inputs without a contig; set include_unpartitioned to process them"
                );
            }
            units.retain(|u| u.partitioned);
        }

        Ok(units)
    }

    fn tasks_for_unit(&self, unit: &Unit, ctx: &RunContext) -> GenoflowResult<Vec<Box<dyn UnitTask>>> {
        if unit.inputs.is_empty() {
            return Ok(Vec::new());
        }

        let Some(template) = &self.command else {
            return Err(GenoflowError::MissingAttribute {
                label: self.label().to_string(),
                attribute: "command".to_string(),
            });
        };

        let output = self.output_for(unit, ctx)?;
        let per_task_threads = (ctx.threads() / pool_size(ctx.threads(), self.max_threads)).max(1);

        let values = HashMap::from([
            ("input", unit.inputs[0].absolute_path().display().to_string()),
            ("inputs", join_paths(&unit.inputs)),
            (
                "output",
                output
                    .as_ref()
                    .map(|o| o.absolute_path().display().to_string())
                    .unwrap_or_default(),
            ),
            ("reference", self.reference_path()),
            ("unit", unit.key.clone()),
            ("threads", per_task_threads.to_string()),
            ("project_home", ctx.project_home().display().to_string()),
        ]);

        let mut env = ctx.env().clone();
        env.extend(self.env.clone());

        Ok(vec![Box::new(ShellTask {
            unit: unit.key.clone(),
            command: template.render(&values)?,
            shell: self.shell.clone(),
            working_dir: ctx.project_home().to_path_buf(),
            env,
            output: output.map(Arc::new),
        })])
    }

    fn output_collection(&self) -> Arc<ArtifactCollection> {
        Arc::clone(&self.outputs)
    }
}

/// One rendered command for one contig
struct ShellTask {
    unit: String,
    command: String,
    shell: String,
    working_dir: PathBuf,
    env: HashMap<String, String>,
    output: Option<Arc<FileArtifact>>,
}

#[async_trait]
impl UnitTask for ShellTask {
    fn unit(&self) -> &str {
        &self.unit
    }

    async fn run(&self, _ctx: &RunContext) -> GenoflowResult<Vec<Arc<dyn ArtifactHandle>>> {
        if let Some(parent) = self.output.as_ref().and_then(|o| o.absolute_path().parent()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GenoflowError::FileWriteError {
                    path: parent.to_path_buf(),
                    error: e.to_string(),
                })?;
        }

        let output = run_shell(&self.shell, &self.command, &self.working_dir, &self.env).await?;
        tracing::debug!(
            unit = %self.unit,
            elapsed_secs = output.duration.as_secs_f64(),
            "task finished"
        );

        Ok(self
            .output
            .iter()
            .map(|o| Arc::clone(o) as Arc<dyn ArtifactHandle>)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{FileComponent, FileSetComponent};
    use crate::component::initialize_component;
    use crate::operator::{dispatch, OperatorState};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        run: RunContext,
        labels: HashMap<String, Node>,
    }

    impl Fixture {
        /// Project with one input file per contig, `reads` and `calls` file sets
        fn new(contigs: &[&str]) -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::create_dir(dir.path().join("input")).unwrap();
            for contig in contigs {
                std::fs::write(dir.path().join(format!("input/s.{contig}.txt")), contig.as_bytes()).unwrap();
            }
            std::fs::write(dir.path().join("ref.fa"), b">chr1\n").unwrap();

            let run = RunContext::new(dir.path()).with_threads(4);
            let mut fixture = Self {
                dir,
                run,
                labels: HashMap::new(),
            };

            fixture.add(
                Box::new(FileSetComponent::new()),
                "reads",
                &[("pattern", "input/*.txt"), ("contig_regex", r"\.(chr[0-9XY]+)\.txt$")],
            );
            fixture.add(Box::new(FileSetComponent::new()), "calls", &[]);
            fixture.add(Box::new(FileComponent::new()), "reference", &[("path", "ref.fa")]);
            fixture
        }

        fn add(&mut self, mut component: Box<dyn Component>, label: &str, attrs: &[(&str, &str)]) {
            component.core_mut().assign_label(label).unwrap();
            for (k, v) in attrs {
                component.set_attribute(k, v);
            }
            let ctx = BuildContext::new(&self.run, &self.labels);
            initialize_component(component.as_mut(), &ctx, &[]).unwrap();
            self.labels
                .insert(label.to_string(), Node::Component(Arc::from(component)));
        }

        fn operator(&self, attrs: &[(&str, &str)]) -> GenoflowResult<ContigCommandOperator> {
            let mut op = ContigCommandOperator::new();
            op.core_mut().assign_label("call").unwrap();
            for (k, v) in attrs {
                op.set_attribute(k, v);
            }
            let ctx = BuildContext::new(&self.run, &self.labels);
            initialize_component(&mut op, &ctx, &[])?;
            Ok(op)
        }
    }

    #[tokio::test]
    async fn test_one_command_per_contig() {
        let fixture = Fixture::new(&["chr1", "chr2", "chrX"]);
        let op = fixture
            .operator(&[
                ("command", "cat {input} > {output} && echo {unit} >> {output}"),
                ("inputs", "reads"),
                ("reference", "reference"),
                ("outputs", "calls"),
                ("output_pattern", "calls/{unit}.out"),
            ])
            .unwrap();

        dispatch(&op, &fixture.run).await.unwrap();

        assert_eq!(op.status().state(), OperatorState::Completed);
        let written = std::fs::read_to_string(fixture.dir.path().join("calls/chr2.out")).unwrap();
        assert_eq!(written, "chr2chr2\n");

        let mut keys: Vec<_> = fixture.labels["calls"]
            .artifacts()
            .iter()
            .map(|a| a.partition_key().unwrap().to_string())
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["chr1", "chr2", "chrX"]);
    }

    #[tokio::test]
    async fn test_failing_contig_is_reported() {
        let fixture = Fixture::new(&["chr1", "chr2", "chr3"]);
        let op = fixture
            .operator(&[
                ("command", "test {unit} != chr2 && cp {input} {output}"),
                ("inputs", "reads"),
                ("outputs", "calls"),
                ("output_pattern", "calls/{unit}.out"),
            ])
            .unwrap();

        let err = dispatch(&op, &fixture.run).await.unwrap_err();

        assert!(matches!(
            &err,
            GenoflowError::FanOutFailed { failed_units, .. } if failed_units == &vec!["chr2".to_string()]
        ));
        assert_eq!(fixture.labels["calls"].artifacts().len(), 2);
    }

    #[tokio::test]
    async fn test_contigs_attribute_restricts_units() {
        let fixture = Fixture::new(&["chr1", "chr2", "chr3"]);
        let op = fixture
            .operator(&[
                ("command", "cp {input} {output}"),
                ("inputs", "reads"),
                ("outputs", "calls"),
                ("output_pattern", "calls/{unit}.out"),
                ("contigs", "chr3, chrY"),
            ])
            .unwrap();

        let units = op.units().unwrap();
        assert_eq!(units.len(), 2);

        let report = perform_fan_out(&op, &fixture.run).await.unwrap();
        assert_eq!(report.units, 1);
        assert_eq!(report.skipped_units, vec!["chrY"]);
        assert!(fixture.dir.path().join("calls/chr3.out").exists());
        assert!(!fixture.dir.path().join("calls/chr1.out").exists());
    }

    #[tokio::test]
    async fn test_unpartitioned_inputs_are_dropped_by_default() {
        let mut fixture = Fixture::new(&[]);
        std::fs::write(fixture.dir.path().join("input/loose.txt"), b"x").unwrap();
        fixture.add(
            Box::new(FileSetComponent::new()),
            "loose",
            &[("pattern", "input/loose.txt")],
        );

        let op = fixture
            .operator(&[("command", "cat {input}"), ("inputs", "loose")])
            .unwrap();
        assert!(matches!(
            perform_fan_out(&op, &fixture.run).await,
            Err(GenoflowError::NoUnits { .. })
        ));

        let mut op = ContigCommandOperator::new();
        op.core_mut().assign_label("cat_all").unwrap();
        op.set_attribute("command", "cat {input}");
        op.set_attribute("inputs", "loose");
        op.set_attribute("include_unpartitioned", "true");
        let ctx = BuildContext::new(&fixture.run, &fixture.labels);
        initialize_component(&mut op, &ctx, &[]).unwrap();

        let report = perform_fan_out(&op, &fixture.run).await.unwrap();
        assert_eq!(report.units, 1);
        assert_eq!(report.outputs, 0);
    }

    #[test]
    fn test_output_placeholder_needs_pattern() {
        let fixture = Fixture::new(&["chr1"]);
        let err = fixture
            .operator(&[("command", "cp {input} {output}"), ("inputs", "reads")])
            .err()
            .unwrap();
        assert!(matches!(err, GenoflowError::InvalidAttribute { attribute, .. } if attribute == "command"));
    }

    #[test]
    fn test_outputs_must_be_a_file_set() {
        let fixture = Fixture::new(&["chr1"]);
        let err = fixture
            .operator(&[("command", "cat {input}"), ("inputs", "reads"), ("outputs", "reference")])
            .err()
            .unwrap();
        assert!(matches!(err, GenoflowError::WrongComponentKind { .. }));
    }
}
