// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Components
//!
//! A component is the addressable unit of the object graph: a label, a type
//! name, a bag of string attributes, and a once-only initialize hook that
//! resolves references to other components by label.
//!
//! Components come in two capabilities, tracked by [`Node`]:
//!
//! - plain components (artifacts, artifact collections, property bags)
//! - operators, which can also be executed by the pipeline driver

mod properties;
mod types;

pub use properties::PropertiesComponent;
pub use types::{Constructor, Instance, TypeEntry, TypeTable};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::artifact::{ArtifactCollection, ArtifactHandle};
use crate::context::RunContext;
use crate::errors::{GenoflowError, GenoflowResult};
use crate::operator::Operator;

/// Identity and attributes shared by every component
#[derive(Debug, Clone)]
pub struct ComponentCore {
    kind: String,
    label: Option<String>,
    attributes: BTreeMap<String, String>,
    initialized: bool,
}

impl ComponentCore {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            label: None,
            attributes: BTreeMap::new(),
            initialized: false,
        }
    }

    /// Assign the label. A label can be set once.
    pub fn assign_label(&mut self, label: impl Into<String>) -> GenoflowResult<()> {
        let label = label.into();
        if let Some(existing) = &self.label {
            return Err(GenoflowError::LabelAlreadyAssigned {
                label: existing.clone(),
                attempted: label,
            });
        }
        self.label = Some(label);
        Ok(())
    }

    /// Label, or an empty string before one is assigned
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or_default()
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Store or overwrite an attribute
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Attribute that must be present and non-empty
    pub fn require(&self, key: &str) -> GenoflowResult<&str> {
        match self.attribute(key) {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(GenoflowError::MissingAttribute {
                label: self.label().to_string(),
                attribute: key.to_string(),
            }),
        }
    }

    /// Comma-separated attribute, trimmed, empty entries dropped
    pub fn list(&self, key: &str) -> Vec<String> {
        self.attribute(key)
            .map(split_list)
            .unwrap_or_default()
    }

    /// Parse an optional attribute
    pub fn parse<T>(&self, key: &str) -> GenoflowResult<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let Some(raw) = self.attribute(key) else {
            return Ok(None);
        };

        raw.trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| GenoflowError::InvalidAttribute {
                label: self.label().to_string(),
                attribute: key.to_string(),
                reason: e.to_string(),
            })
    }

    /// Boolean attribute, `false` when absent
    pub fn flag(&self, key: &str) -> GenoflowResult<bool> {
        Ok(self.parse::<bool>(key)?.unwrap_or(false))
    }
}

/// Split a comma-separated list
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// A node of the object graph
pub trait Component: Send + Sync {
    fn core(&self) -> &ComponentCore;

    fn core_mut(&mut self) -> &mut ComponentCore;

    /// Resolve references and validate attributes. Called once, after every
    /// attribute has been set and every child has been built.
    fn initialize(&mut self, ctx: &BuildContext<'_>, children: &[Node]) -> GenoflowResult<()>;

    fn label(&self) -> &str {
        self.core().label()
    }

    fn kind(&self) -> &str {
        self.core().kind()
    }

    fn set_attribute(&mut self, key: &str, value: &str) {
        self.core_mut().set_attribute(key, value);
    }

    /// Artifacts this component stands for when referenced as an input
    fn artifacts(&self) -> Vec<Arc<dyn ArtifactHandle>> {
        Vec::new()
    }

    /// Shared collection operators may append to
    fn collection(&self) -> Option<Arc<ArtifactCollection>> {
        None
    }
}

/// Run `initialize` and latch the component as initialized.
///
/// A second call fails with [`GenoflowError::AlreadyInitialized`].
pub fn initialize_component<C>(
    component: &mut C,
    ctx: &BuildContext<'_>,
    children: &[Node],
) -> GenoflowResult<()>
where
    C: Component + ?Sized,
{
    if component.core().is_initialized() {
        return Err(GenoflowError::AlreadyInitialized {
            label: component.label().to_string(),
        });
    }

    component.initialize(ctx, children)?;
    component.core_mut().mark_initialized();
    Ok(())
}

/// A built component, tagged with its capability
#[derive(Clone)]
pub enum Node {
    Component(Arc<dyn Component>),
    Operator(Arc<dyn Operator>),
}

impl Node {
    pub fn label(&self) -> &str {
        match self {
            Self::Component(c) => c.label(),
            Self::Operator(o) => o.label(),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Component(c) => c.kind(),
            Self::Operator(o) => o.kind(),
        }
    }

    pub fn core(&self) -> &ComponentCore {
        match self {
            Self::Component(c) => c.core(),
            Self::Operator(o) => o.core(),
        }
    }

    /// Artifacts behind this node. Operators stand for their outputs.
    pub fn artifacts(&self) -> Vec<Arc<dyn ArtifactHandle>> {
        match self {
            Self::Component(c) => c.artifacts(),
            Self::Operator(o) => o.outputs(),
        }
    }

    pub fn collection(&self) -> Option<Arc<ArtifactCollection>> {
        match self {
            Self::Component(c) => c.collection(),
            Self::Operator(o) => o.collection(),
        }
    }

    pub fn as_operator(&self) -> Option<&Arc<dyn Operator>> {
        match self {
            Self::Operator(o) => Some(o),
            Self::Component(_) => None,
        }
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Self::Operator(_))
    }

    /// Whether both nodes are the same instance
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Self::Component(a), Self::Component(b)) => Arc::ptr_eq(a, b),
            (Self::Operator(a), Self::Operator(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("label", &self.label())
            .field("kind", &self.kind())
            .field("operator", &self.is_operator())
            .finish()
    }
}

/// What `initialize` can see while the graph is being built
pub struct BuildContext<'a> {
    run: &'a RunContext,
    labels: &'a HashMap<String, Node>,
}

impl<'a> BuildContext<'a> {
    pub fn new(run: &'a RunContext, labels: &'a HashMap<String, Node>) -> Self {
        Self { run, labels }
    }

    pub fn run(&self) -> &RunContext {
        self.run
    }

    /// Look up an already-built component
    pub fn lookup(&self, label: &str) -> GenoflowResult<Node> {
        self.labels
            .get(label)
            .cloned()
            .ok_or_else(|| GenoflowError::UnresolvedReference {
                reference: label.to_string(),
            })
    }

    /// Look up every label of a comma-separated list
    pub fn lookup_list(&self, labels: &str) -> GenoflowResult<Vec<Node>> {
        split_list(labels)
            .iter()
            .map(|label| self.lookup(label))
            .collect()
    }

    /// Look up a component that owns an artifact collection
    pub fn lookup_collection(&self, label: &str) -> GenoflowResult<Arc<ArtifactCollection>> {
        self.lookup(label)?
            .collection()
            .ok_or_else(|| GenoflowError::WrongComponentKind {
                reference: label.to_string(),
                expected: "an artifact collection (file_set)".to_string(),
            })
    }

    /// Attributes of a `properties` component, for export as environment
    pub fn lookup_properties(&self, label: &str) -> GenoflowResult<HashMap<String, String>> {
        let node = self.lookup(label)?;
        if node.kind() != PropertiesComponent::KIND {
            return Err(GenoflowError::WrongComponentKind {
                reference: label.to_string(),
                expected: "a properties component".to_string(),
            });
        }

        Ok(node
            .core()
            .attributes()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
