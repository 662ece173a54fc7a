// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Object registry
//!
//! Turns a pipeline document into a graph of initialized components. Elements
//! are built depth-first, children before their parent, so that by the time a
//! component's initialize hook runs, everything nested inside it and
//! everything declared before it can be looked up by label.
//!
//! Top-level operators form the execution plan, in document order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::component::{BuildContext, Node, TypeTable};
use crate::config::{Element, LabelPolicy, PipelineDocument, Properties};
use crate::context::RunContext;
use crate::errors::{GenoflowError, GenoflowResult};
use crate::operator::Operator;

/// The built object graph and its execution plan
pub struct ObjectRegistry {
    labels: HashMap<String, Node>,
    plan: Vec<Arc<dyn Operator>>,
    project_home: PathBuf,
}

impl ObjectRegistry {
    /// Build every element of `doc`.
    ///
    /// Any failure aborts the whole build and names the element path that
    /// caused it; no partial graph is returned.
    pub fn build(doc: &PipelineDocument, types: &TypeTable, ctx: &RunContext) -> GenoflowResult<Self> {
        let mut properties: Properties = doc
            .properties
            .iter()
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        properties.insert("project_home", ctx.project_home().display().to_string());

        let mut builder = GraphBuilder {
            types,
            run: ctx,
            properties,
            policy: doc.label_collisions,
            labels: HashMap::new(),
        };

        let mut plan = Vec::new();
        for element in &doc.components {
            if let Node::Operator(operator) = builder.construct(element, None)? {
                plan.push(operator);
            }
        }

        tracing::info!(
            components = builder.labels.len(),
            operators = plan.len(),
            "object graph built"
        );

        Ok(Self {
            labels: builder.labels,
            plan,
            project_home: ctx.project_home().to_path_buf(),
        })
    }

    pub fn get(&self, label: &str) -> Option<&Node> {
        self.labels.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }

    /// Every registered label, sorted
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.labels.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    /// Operators to run, in document order
    pub fn plan(&self) -> &[Arc<dyn Operator>] {
        &self.plan
    }

    pub fn project_home(&self) -> &Path {
        &self.project_home
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

struct GraphBuilder<'a> {
    types: &'a TypeTable,
    run: &'a RunContext,
    properties: Properties,
    policy: LabelPolicy,
    labels: HashMap<String, Node>,
}

impl GraphBuilder<'_> {
    fn construct(&mut self, element: &Element, parent: Option<&str>) -> GenoflowResult<Node> {
        let path = match parent {
            Some(parent) => format!("{}/{}", parent, element.tag),
            None => element.tag.clone(),
        };

        let node = self
            .construct_element(element, &path)
            .map_err(|e| e.in_element(&path))?;

        if parent.is_some() && node.is_operator() {
            tracing::warn!(
                element = %path,
                "nested operator is addressable but will not be executed"
            );
        }

        Ok(node)
    }

    fn construct_element(&mut self, element: &Element, path: &str) -> GenoflowResult<Node> {
        let mut children = Vec::with_capacity(element.children.len());
        for child in &element.children {
            children.push(self.construct(child, Some(path))?);
        }

        let label = element.tag.trim();
        self.check_label(label)?;

        let kind = element
            .kind
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(GenoflowError::MissingType)?;

        let mut instance = self.types.instantiate(kind)?;
        instance.core_mut().assign_label(label)?;

        for (key, value) in &element.attributes {
            let value = self.properties.substitute(&value.to_string())?;
            instance.core_mut().set_attribute(key.as_str(), value);
        }

        let ctx = BuildContext::new(self.run, &self.labels);
        instance.initialize(&ctx, &children)?;

        let node = instance.into_node();
        tracing::debug!(element = %path, kind, "component built");
        self.labels.insert(label.to_string(), node.clone());
        Ok(node)
    }

    fn check_label(&self, label: &str) -> GenoflowResult<()> {
        if !self.labels.contains_key(label) {
            return Ok(());
        }

        match self.policy {
            LabelPolicy::Reject => Err(GenoflowError::LabelCollision {
                label: label.to_string(),
            }),
            LabelPolicy::Overwrite => {
                tracing::warn!(%label, "label declared again; the later declaration wins");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("labels", &self.labels())
            .field("plan", &self.plan.iter().map(|o| o.label()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, ComponentCore};
    use std::sync::Mutex;

    const DOC: &str = r#"
project_home: /data/run
properties:
  sample: NA12878
components:
  - tag: reads
    type: file_set
    paths: input/${sample}.chr1.bam, input/${sample}.chr2.bam
    children:
      - tag: extra
        type: file
        path: input/extra.bam
  - tag: reference
    type: file
    path: ${project_home}/ref/hg38.fa
  - tag: sort
    type: shell
    command: sort {inputs} > {output}
    inputs: reads
  - tag: call
    type: contig_command
    command: caller {input}
    inputs: reads
    reference: reference
"#;

    fn build(yaml: &str) -> GenoflowResult<ObjectRegistry> {
        let doc = PipelineDocument::from_yaml(yaml)?;
        ObjectRegistry::build(&doc, &TypeTable::with_builtins(), &doc.run_context())
    }

    /// Records what it resolved for its `target` attribute
    struct Probe {
        core: ComponentCore,
        seen: Arc<Mutex<Vec<Node>>>,
    }

    impl Component for Probe {
        fn core(&self) -> &ComponentCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut ComponentCore {
            &mut self.core
        }

        fn initialize(&mut self, ctx: &BuildContext<'_>, _children: &[Node]) -> GenoflowResult<()> {
            let target = ctx.lookup(self.core.require("target")?)?;
            self.seen.lock().unwrap().push(target);
            Ok(())
        }
    }

    #[test]
    fn test_build_plan_in_document_order() {
        let registry = build(DOC).unwrap();

        let plan: Vec<_> = registry.plan().iter().map(|o| (o.label(), o.kind())).collect();
        assert_eq!(plan, vec![("sort", "shell"), ("call", "contig_command")]);
        assert_eq!(registry.labels(), vec!["call", "extra", "reads", "reference", "sort"]);
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_properties_substituted() {
        let registry = build(DOC).unwrap();

        let reads = registry.get("reads").unwrap().artifacts();
        let names: Vec<_> = reads.iter().map(|a| a.filename()).collect();
        assert_eq!(names, vec!["extra.bam", "NA12878.chr1.bam", "NA12878.chr2.bam"]);

        let reference = registry.get("reference").unwrap().artifacts();
        assert_eq!(reference[0].absolute_path(), Path::new("/data/run/ref/hg38.fa"));
    }

    #[test]
    fn test_lookup_returns_registered_instance() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut types = TypeTable::with_builtins();
        let captured = Arc::clone(&seen);
        types.register_component("probe", "test probe", move || {
            Ok(Box::new(Probe {
                core: ComponentCore::new("probe"),
                seen: Arc::clone(&captured),
            }))
        });

        let doc = PipelineDocument::from_yaml(
            "project_home: /tmp\ncomponents:\n  - tag: a\n    type: file\n    path: a.txt\n  - tag: b\n    type: probe\n    target: a\n",
        )
        .unwrap();
        let registry = ObjectRegistry::build(&doc, &types, &doc.run_context()).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].ptr_eq(registry.get("a").unwrap()));
    }

    #[test]
    fn test_identical_documents_build_identical_plans() {
        let first = build(DOC).unwrap();
        let second = build(DOC).unwrap();

        assert_eq!(first.plan().len(), second.plan().len());
        for (a, b) in first.plan().iter().zip(second.plan()) {
            assert_eq!(a.kind(), b.kind());
            assert_eq!(a.label(), b.label());
        }
    }

    #[test]
    fn test_duplicate_label_rejected_by_default() {
        let yaml = "project_home: /tmp\ncomponents:\n  - tag: a\n    type: file\n    path: one.txt\n  - tag: a\n    type: file\n    path: two.txt\n";
        let err = build(yaml).unwrap_err();

        assert!(matches!(err.root_cause(), GenoflowError::LabelCollision { label } if label == "a"));
    }

    #[test]
    fn test_duplicate_label_overwrites_under_legacy_policy() {
        let yaml = "project_home: /tmp\nlabel_collisions: overwrite\ncomponents:\n  - tag: a\n    type: file\n    path: one.txt\n  - tag: a\n    type: file\n    path: two.txt\n";
        let registry = build(yaml).unwrap();

        let artifacts = registry.get("a").unwrap().artifacts();
        assert_eq!(artifacts[0].filename(), "two.txt");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_type_names_element_path() {
        let yaml = "project_home: /tmp\ncomponents:\n  - tag: reads\n    type: file_set\n    children:\n      - tag: odd\n        type: bam_file\n";
        let err = build(yaml).unwrap_err();

        assert_eq!(err.element_path(), Some("reads/odd"));
        assert!(matches!(err.root_cause(), GenoflowError::UnknownComponentType { kind } if kind == "bam_file"));
    }

    #[test]
    fn test_missing_type() {
        let err = build("project_home: /tmp\ncomponents:\n  - tag: reads\n").unwrap_err();

        assert_eq!(err.element_path(), Some("reads"));
        assert!(matches!(err.root_cause(), GenoflowError::MissingType));
    }

    #[test]
    fn test_forward_reference_fails() {
        let yaml = "project_home: /tmp\ncomponents:\n  - tag: sort\n    type: shell\n    command: sort {input}\n    inputs: reads\n  - tag: reads\n    type: file\n    path: r.txt\n";
        let err = build(yaml).unwrap_err();

        assert!(matches!(err.root_cause(), GenoflowError::UnresolvedReference { reference } if reference == "reads"));
    }

    #[test]
    fn test_nested_operator_not_planned() {
        let yaml = "project_home: /tmp\ncomponents:\n  - tag: group\n    type: file_set\n    children:\n      - tag: inner\n        type: shell\n        command: 'true'\n";
        let registry = build(yaml).unwrap();

        assert!(registry.contains("inner"));
        assert!(registry.plan().is_empty());
    }
}
