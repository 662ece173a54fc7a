// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Pipeline document structures
//!
//! Defines the schema for pipeline documents. A document is a tree: the root
//! carries run settings and a list of elements, and every element may nest
//! further elements under `children`.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::context::RunContext;
use crate::errors::{GenoflowError, GenoflowResult};

/// Root of a pipeline document
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineDocument {
    /// Working directory of the run, relative to the document's directory
    pub project_home: PathBuf,

    /// Pipeline-wide worker count
    #[serde(default)]
    pub threads: Option<usize>,

    /// What to do when two elements declare the same tag
    #[serde(default)]
    pub label_collisions: LabelPolicy,

    /// Upper bound on a fan-out wait, in hours
    #[serde(default)]
    pub task_timeout_hours: Option<u64>,

    /// Values available as `${name}` inside attribute values
    #[serde(default)]
    pub properties: BTreeMap<String, AttributeValue>,

    /// Environment variables exported to every process
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Top-level elements in document order
    pub components: Vec<Element>,

    /// Where the document was loaded from
    #[serde(skip)]
    pub source: Option<DocumentSource>,
}

/// Origin of a loaded document
#[derive(Debug, Clone)]
pub struct DocumentSource {
    pub path: PathBuf,
    /// BLAKE3 digest of the raw document bytes
    pub digest: String,
}

impl PipelineDocument {
    /// Load a document, choosing TOML or YAML by file extension
    pub fn from_file(path: &Path) -> GenoflowResult<Self> {
        if !path.exists() {
            return Err(GenoflowError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| GenoflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let mut document = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content)?,
            _ => Self::from_yaml(&content)?,
        };

        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        document.source = Some(DocumentSource {
            path,
            digest: blake3::hash(content.as_bytes()).to_hex().to_string(),
        });

        Ok(document)
    }

    /// Parse a document from YAML
    pub fn from_yaml(yaml: &str) -> GenoflowResult<Self> {
        let document: Self = serde_yaml::from_str(yaml)?;
        document.check_shape()?;
        Ok(document)
    }

    /// Parse a document from TOML
    pub fn from_toml(content: &str) -> GenoflowResult<Self> {
        let document: Self = toml::from_str(content)?;
        document.check_shape()?;
        Ok(document)
    }

    /// Digest of the raw document, if it was loaded from disk
    pub fn digest(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.digest.as_str())
    }

    /// Project home resolved against the document's directory
    pub fn resolved_project_home(&self) -> PathBuf {
        if self.project_home.is_absolute() {
            return self.project_home.clone();
        }

        let base = self
            .source
            .as_ref()
            .and_then(|s| s.path.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default();

        base.join(&self.project_home)
    }

    /// Build the run context described by the document's settings
    pub fn run_context(&self) -> RunContext {
        let mut ctx = RunContext::new(self.resolved_project_home()).with_env(self.env.clone());

        if let Some(threads) = self.threads {
            ctx = ctx.with_threads(threads);
        }

        if let Some(hours) = self.task_timeout_hours {
            ctx = ctx.with_task_timeout(Duration::from_secs(hours.saturating_mul(60 * 60)));
        }

        ctx
    }

    /// Walk every element depth-first, children before parents
    pub fn elements(&self) -> Vec<&Element> {
        fn visit<'a>(element: &'a Element, out: &mut Vec<&'a Element>) {
            for child in &element.children {
                visit(child, out);
            }
            out.push(element);
        }

        let mut out = Vec::new();
        for element in &self.components {
            visit(element, &mut out);
        }
        out
    }

    fn check_shape(&self) -> GenoflowResult<()> {
        if self.components.is_empty() {
            return Err(GenoflowError::InvalidDocument {
                reason: "no components declared".into(),
                help: Some("Add at least one element under 'components'".into()),
            });
        }

        if let Some(element) = self.elements().into_iter().find(|e| e.tag.trim().is_empty()) {
            return Err(GenoflowError::InvalidDocument {
                reason: format!(
                    "an element of type '{}' has an empty tag",
                    element.kind.as_deref().unwrap_or("?")
                ),
                help: None,
            });
        }

        if let Some((name, value)) = self.properties.iter().find(|(_, v)| v.is_decimal()) {
            return Err(unquoted_decimal(&format!("property '{name}'"), value));
        }

        let decimal = self.elements().into_iter().find_map(|element| {
            element
                .attributes
                .iter()
                .find(|(_, v)| v.is_decimal())
                .map(|(key, value)| (element, key, value))
        });
        if let Some((element, key, value)) = decimal {
            return Err(unquoted_decimal(
                &format!("attribute '{}' of '{}'", key, element.tag),
                value,
            ));
        }

        Ok(())
    }
}

/// Decimal scalars lose their written form (`38.10` reads back as `38.1`)
fn unquoted_decimal(what: &str, value: &AttributeValue) -> GenoflowError {
    GenoflowError::InvalidDocument {
        reason: format!("{what} is an unquoted decimal number ({value})"),
        help: Some("Quote the value, e.g. \"38.10\", so it is used exactly as written".into()),
    }
}

/// One declared component
#[derive(Debug, Clone, Deserialize)]
pub struct Element {
    /// Tag name, used as the component's label
    pub tag: String,

    /// Registered component type
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Nested elements, built before this one
    #[serde(default)]
    pub children: Vec<Element>,

    /// Every other key is a free-form attribute
    #[serde(flatten)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// Scalar attribute value as written in the document
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    fn is_decimal(&self) -> bool {
        matches!(self, Self::Float(_))
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Handling of two elements that declare the same tag
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LabelPolicy {
    /// Fail graph construction (default)
    #[default]
    Reject,
    /// Keep the last declaration
    Overwrite,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
project_home: work
threads: 16
task_timeout_hours: 48
properties:
  sample: NA12878
  depth: 30
env:
  TMPDIR: /scratch
components:
  - tag: reads
    type: file_set
    pattern: "input/${sample}.*.bam"
    children:
      - tag: extra
        type: file
        path: input/extra.bam
        contig: chrM
  - tag: call
    type: contig_command
    inputs: reads
    max_threads: 12
    include_unpartitioned: false
"#;

    #[test]
    fn test_parse_document() {
        let doc = PipelineDocument::from_yaml(DOC).unwrap();
        assert_eq!(doc.project_home, PathBuf::from("work"));
        assert_eq!(doc.threads, Some(16));
        assert_eq!(doc.label_collisions, LabelPolicy::Reject);
        assert_eq!(doc.components.len(), 2);

        let reads = &doc.components[0];
        assert_eq!(reads.tag, "reads");
        assert_eq!(reads.kind.as_deref(), Some("file_set"));
        assert_eq!(reads.children.len(), 1);
        assert_eq!(reads.children[0].attributes["contig"].to_string(), "chrM");
    }

    #[test]
    fn test_scalar_attributes_stringify() {
        let doc = PipelineDocument::from_yaml(DOC).unwrap();
        let call = &doc.components[1];
        assert_eq!(call.attributes["max_threads"].to_string(), "12");
        assert_eq!(call.attributes["include_unpartitioned"].to_string(), "false");
        assert_eq!(doc.properties["depth"].to_string(), "30");
    }

    #[test]
    fn test_elements_are_post_order() {
        let doc = PipelineDocument::from_yaml(DOC).unwrap();
        let tags: Vec<_> = doc.elements().iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["extra", "reads", "call"]);
    }

    #[test]
    fn test_run_context_from_settings() {
        let doc = PipelineDocument::from_yaml(DOC).unwrap();
        let ctx = doc.run_context();
        assert_eq!(ctx.threads(), 16);
        assert_eq!(ctx.task_timeout(), Duration::from_secs(48 * 3600));
        assert_eq!(ctx.env()["TMPDIR"], "/scratch");
    }

    #[test]
    fn test_overwrite_policy() {
        let doc = PipelineDocument::from_yaml(
            "project_home: /tmp\nlabel_collisions: overwrite\ncomponents:\n  - tag: a\n    type: file\n",
        )
        .unwrap();
        assert_eq!(doc.label_collisions, LabelPolicy::Overwrite);
    }

    #[test]
    fn test_empty_components_rejected() {
        let err = PipelineDocument::from_yaml("project_home: /tmp\ncomponents: []\n").unwrap_err();
        assert!(matches!(err, GenoflowError::InvalidDocument { .. }));
    }

    #[test]
    fn test_parse_toml_document() {
        let toml = r#"
project_home = "/data/run"
threads = 4

[[components]]
tag = "reference"
type = "file"
path = "ref/hg38.fa"
"#;
        let doc = PipelineDocument::from_toml(toml).unwrap();
        assert_eq!(doc.threads, Some(4));
        assert_eq!(doc.components[0].attributes["path"].to_string(), "ref/hg38.fa");
    }

    #[test]
    fn test_from_file_records_digest() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, DOC).unwrap();

        let doc = PipelineDocument::from_file(&path).unwrap();
        assert_eq!(doc.digest().map(str::len), Some(64));
        assert_eq!(doc.resolved_project_home(), dir.path().join("work"));
    }

    #[test]
    fn test_unquoted_decimal_property_rejected() {
        let yaml = "project_home: /tmp\nproperties:\n  build: 38.10\ncomponents:\n  - tag: a\n    type: file\n    path: in/${build}.bam\n";
        let err = PipelineDocument::from_yaml(yaml).unwrap_err();

        match err {
            GenoflowError::InvalidDocument { reason, help } => {
                assert!(reason.contains("property 'build'"));
                assert!(help.unwrap().contains("Quote"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unquoted_decimal_attribute_rejected() {
        let yaml = "project_home: /tmp\ncomponents:\n  - tag: ref\n    type: file\n    version: 2.0\n";
        let err = PipelineDocument::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, GenoflowError::InvalidDocument { reason, .. } if reason.contains("'version' of 'ref'")));
    }

    #[test]
    fn test_quoted_decimal_kept_verbatim() {
        let yaml = "project_home: /tmp\nproperties:\n  build: \"38.10\"\ncomponents:\n  - tag: a\n    type: file\n    path: in/${build}.bam\n";
        let doc = PipelineDocument::from_yaml(yaml).unwrap();
        assert_eq!(doc.properties["build"].to_string(), "38.10");
    }

    #[test]
    fn test_huge_task_timeout_saturates() {
        let yaml = "project_home: /tmp\ntask_timeout_hours: 18446744073709551615\ncomponents:\n  - tag: a\n    type: file\n";
        let doc = PipelineDocument::from_yaml(yaml).unwrap();
        assert_eq!(doc.run_context().task_timeout(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineDocument::from_file(Path::new("/nonexistent/pipeline.yaml")).unwrap_err();
        assert!(matches!(err, GenoflowError::ConfigNotFound { .. }));
    }
}
