// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Error types
//!
//! Every failure the engine can report lives in [`GenoflowError`]. Variants
//! are grouped by the phase that raises them: loading the configuration
//! document, building the object graph, and executing operators.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for genoflow operations
pub type GenoflowResult<T> = Result<T, GenoflowError>;

/// Main error type for genoflow
#[derive(Error, Debug, Diagnostic)]
pub enum GenoflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(genoflow::config_not_found),
        help("Pass the path to a pipeline document, e.g. 'genoflow run pipeline.yaml'")
    )]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(genoflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(genoflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("Invalid pipeline document: {reason}")]
    #[diagnostic(code(genoflow::invalid_document))]
    InvalidDocument {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Unknown property '${{{name}}}' in value '{value}'")]
    #[diagnostic(
        code(genoflow::unknown_property),
        help("Declare '{name}' under 'properties' in the pipeline document")
    )]
    UnknownProperty { name: String, value: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Graph Construction Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Element '{element}' failed to build")]
    #[diagnostic(code(genoflow::element_failed))]
    ElementFailed {
        element: String,
        #[source]
        source: Box<GenoflowError>,
    },

    #[error("Unknown component type '{kind}'")]
    #[diagnostic(
        code(genoflow::unknown_component_type),
        help("Run 'genoflow types' to list the registered component types")
    )]
    UnknownComponentType { kind: String },

    #[error("Element does not declare a 'type'")]
    #[diagnostic(code(genoflow::missing_type))]
    MissingType,

    #[error("Failed to instantiate component of type '{kind}': {reason}")]
    #[diagnostic(code(genoflow::instantiation_failed))]
    InstantiationFailed { kind: String, reason: String },

    #[error("Component is already labeled '{label}', cannot relabel it '{attempted}'")]
    #[diagnostic(code(genoflow::label_already_assigned))]
    LabelAlreadyAssigned { label: String, attempted: String },

    #[error("Label '{label}' is declared more than once")]
    #[diagnostic(
        code(genoflow::label_collision),
        help("Rename one of the elements, or set 'label_collisions: overwrite' to keep the last declaration")
    )]
    LabelCollision { label: String },

    #[error("Component '{label}' has already been initialized")]
    #[diagnostic(code(genoflow::already_initialized))]
    AlreadyInitialized { label: String },

    #[error("Component '{label}' is missing required attribute '{attribute}'")]
    #[diagnostic(code(genoflow::missing_attribute))]
    MissingAttribute { label: String, attribute: String },

    #[error("Component '{label}' has an invalid '{attribute}' attribute: {reason}")]
    #[diagnostic(code(genoflow::invalid_attribute))]
    InvalidAttribute {
        label: String,
        attribute: String,
        reason: String,
    },

    #[error("Reference to unknown component '{reference}'")]
    #[diagnostic(
        code(genoflow::unresolved_reference),
        help("Components can only reference labels that are declared earlier in the document or nested inside them")
    )]
    UnresolvedReference { reference: String },

    #[error("Component '{reference}' is not {expected}")]
    #[diagnostic(code(genoflow::wrong_component_kind))]
    WrongComponentKind { reference: String, expected: String },

    #[error("The pipeline has already been executed")]
    #[diagnostic(
        code(genoflow::already_executed),
        help("Operators run once; load the document again for a fresh run")
    )]
    AlreadyExecuted,

    #[error("The object graph has already been built")]
    #[diagnostic(code(genoflow::already_built))]
    AlreadyBuilt,

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Operator '{operator}' cannot move from {from} to {to}")]
    #[diagnostic(code(genoflow::invalid_state_transition))]
    InvalidStateTransition {
        operator: String,
        from: String,
        to: String,
    },

    #[error("Operator '{operator}' failed")]
    #[diagnostic(code(genoflow::operator_failed))]
    OperatorFailed {
        operator: String,
        #[source]
        source: Box<GenoflowError>,
    },

    #[error("Operation '{operator}' failed: {message}")]
    #[diagnostic(code(genoflow::operation_failed))]
    OperationFailed { operator: String, message: String },

    #[error("Command exited with status {exit_code}: {command}")]
    #[diagnostic(code(genoflow::command_failed), help("{stderr}"))]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Tool '{tool}' execution failed: {error}")]
    #[diagnostic(code(genoflow::tool_execution_failed))]
    ToolExecutionFailed {
        tool: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    #[error("Required tools are not installed: {}", .tools.join(", "))]
    #[diagnostic(
        code(genoflow::tools_missing),
        help("Install the listed tools and ensure they are in your PATH")
    )]
    ToolsMissing { tools: Vec<String> },

    #[error("Operator '{operator}' has no units to process")]
    #[diagnostic(
        code(genoflow::no_units),
        help("Check that the operator's inputs resolve to at least one file")
    )]
    NoUnits { operator: String },

    #[error("Operator '{operator}' failed for {} unit(s): {}", .failed_units.len(), .failed_units.join(", "))]
    #[diagnostic(code(genoflow::fan_out_failed))]
    FanOutFailed {
        operator: String,
        failed_units: Vec<String>,
        #[help]
        details: Option<String>,
    },

    #[error("Operator '{operator}' timed out after {timeout_secs}s with {pending} task(s) unfinished")]
    #[diagnostic(code(genoflow::task_timeout))]
    TaskTimeout {
        operator: String,
        timeout_secs: u64,
        pending: usize,
    },

    #[error("Unknown placeholder '{{{placeholder}}}' in command template '{template}'")]
    #[diagnostic(
        code(genoflow::unknown_placeholder),
        help("Available placeholders: input, inputs, output, outputs, reference, unit, threads, project_home")
    )]
    UnknownPlaceholder { placeholder: String, template: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(genoflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(genoflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(genoflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(genoflow::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(genoflow::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for GenoflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for GenoflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for GenoflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for GenoflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for GenoflowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl GenoflowError {
    /// Wrap an error with the path of the configuration element that raised it
    pub fn in_element(self, element: impl Into<String>) -> Self {
        Self::ElementFailed {
            element: element.into(),
            source: Box::new(self),
        }
    }

    /// Wrap an error raised while an operator was running
    pub fn in_operator(self, operator: impl Into<String>) -> Self {
        Self::OperatorFailed {
            operator: operator.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping element and operator wrappers
    pub fn root_cause(&self) -> &GenoflowError {
        match self {
            Self::ElementFailed { source, .. } | Self::OperatorFailed { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Path of the innermost configuration element named by this error, if any
    pub fn element_path(&self) -> Option<&str> {
        match self {
            Self::ElementFailed { element, source } => {
                source.element_path().or(Some(element.as_str()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_nested_wrappers() {
        let err = GenoflowError::MissingType
            .in_element("pipeline/reads")
            .in_element("pipeline")
            .in_operator("call");

        assert!(matches!(err.root_cause(), GenoflowError::MissingType));
    }

    #[test]
    fn test_element_path_is_innermost() {
        let err = GenoflowError::UnresolvedReference {
            reference: "reads".into(),
        }
        .in_element("pipeline/align/bam")
        .in_element("pipeline/align");

        assert_eq!(err.element_path(), Some("pipeline/align/bam"));
    }

    #[test]
    fn test_fan_out_message_lists_units() {
        let err = GenoflowError::FanOutFailed {
            operator: "call".into(),
            failed_units: vec!["chr3".into(), "chrX".into()],
            details: None,
        };

        assert_eq!(
            err.to_string(),
            "Operator 'call' failed for 2 unit(s): chr3, chrX"
        );
    }
}
