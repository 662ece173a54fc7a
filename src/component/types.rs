// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Type table
//!
//! Maps the `type` written in a pipeline document to a constructor. The
//! table is explicit: a type exists only if it was registered, and every
//! entry declares whether it builds a plain component or an operator.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{initialize_component, BuildContext, Component, ComponentCore, Node, PropertiesComponent};
use crate::artifact::{FileComponent, FileSetComponent};
use crate::errors::{GenoflowError, GenoflowResult};
use crate::fanout::ContigCommandOperator;
use crate::operator::{Operator, ShellOperator};

type ComponentFn = dyn Fn() -> GenoflowResult<Box<dyn Component>> + Send + Sync;
type OperatorFn = dyn Fn() -> GenoflowResult<Box<dyn Operator>> + Send + Sync;

/// Constructor tagged with the capability of what it builds
#[derive(Clone)]
pub enum Constructor {
    Component(Arc<ComponentFn>),
    Operator(Arc<OperatorFn>),
}

/// A freshly constructed, not yet initialized component
pub enum Instance {
    Component(Box<dyn Component>),
    Operator(Box<dyn Operator>),
}

impl Instance {
    pub fn core_mut(&mut self) -> &mut ComponentCore {
        match self {
            Self::Component(c) => c.core_mut(),
            Self::Operator(o) => o.core_mut(),
        }
    }

    /// Run the once-only initialize hook
    pub fn initialize(&mut self, ctx: &BuildContext<'_>, children: &[Node]) -> GenoflowResult<()> {
        match self {
            Self::Component(c) => initialize_component(c.as_mut(), ctx, children),
            Self::Operator(o) => initialize_component(o.as_mut(), ctx, children),
        }
    }

    /// Freeze into a shareable graph node
    pub fn into_node(self) -> Node {
        match self {
            Self::Component(c) => Node::Component(Arc::from(c)),
            Self::Operator(o) => Node::Operator(Arc::from(o)),
        }
    }
}

/// Registered type
#[derive(Clone)]
pub struct TypeEntry {
    pub constructor: Constructor,
    pub description: String,
}

impl TypeEntry {
    pub fn is_operator(&self) -> bool {
        matches!(self.constructor, Constructor::Operator(_))
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("operator", &self.is_operator())
            .field("description", &self.description)
            .finish()
    }
}

/// Table of constructible component types
#[derive(Clone, Debug, Default)]
pub struct TypeTable {
    entries: BTreeMap<String, TypeEntry>,
}

impl TypeTable {
    /// Table with no registered types
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table with every built-in component type
    pub fn with_builtins() -> Self {
        let mut table = Self::empty();

        table.register_component(
            PropertiesComponent::KIND,
            "Named settings exported as process environment",
            || Ok(Box::new(PropertiesComponent::new())),
        );
        table.register_component(
            FileComponent::KIND,
            "A single file, optionally tagged with a contig",
            || Ok(Box::new(FileComponent::new())),
        );
        table.register_component(
            FileSetComponent::KIND,
            "A shared, appendable set of files",
            || Ok(Box::new(FileSetComponent::new())),
        );
        table.register_operator(
            ShellOperator::KIND,
            "Run one shell command",
            || Ok(Box::new(ShellOperator::new())),
        );
        table.register_operator(
            ContigCommandOperator::KIND,
            "Run a shell command once per contig, in parallel",
            || Ok(Box::new(ContigCommandOperator::new())),
        );

        table
    }

    /// Register a plain component type, replacing any previous entry
    pub fn register_component<F>(&mut self, kind: &str, description: &str, constructor: F)
    where
        F: Fn() -> GenoflowResult<Box<dyn Component>> + Send + Sync + 'static,
    {
        self.entries.insert(
            kind.to_string(),
            TypeEntry {
                constructor: Constructor::Component(Arc::new(constructor)),
                description: description.to_string(),
            },
        );
    }

    /// Register an operator type, replacing any previous entry
    pub fn register_operator<F>(&mut self, kind: &str, description: &str, constructor: F)
    where
        F: Fn() -> GenoflowResult<Box<dyn Operator>> + Send + Sync + 'static,
    {
        self.entries.insert(
            kind.to_string(),
            TypeEntry {
                constructor: Constructor::Operator(Arc::new(constructor)),
                description: description.to_string(),
            },
        );
    }

    pub fn get(&self, kind: &str) -> Option<&TypeEntry> {
        self.entries.get(kind)
    }

    /// Registered types, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Construct an uninitialized instance of `kind`
    pub fn instantiate(&self, kind: &str) -> GenoflowResult<Instance> {
        let entry = self
            .get(kind)
            .ok_or_else(|| GenoflowError::UnknownComponentType {
                kind: kind.to_string(),
            })?;

        let instance = match &entry.constructor {
            Constructor::Component(build) => Instance::Component(build()?),
            Constructor::Operator(build) => Instance::Operator(build()?),
        };

        Ok(instance)
    }
}
