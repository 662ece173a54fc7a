// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! `{placeholder}` command templates
//!
//! `{{` and `}}` produce literal braces, so awk programs are written as
//! `awk '{{print $1}}'`.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::errors::{GenoflowError, GenoflowResult};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([a-z_]+)\}").expect("Invalid placeholder pattern")
    })
}

/// A command line with named placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    template: String,
}

impl CommandTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Placeholder names, in order of appearance
    pub fn placeholders(&self) -> Vec<&str> {
        placeholder_pattern()
            .captures_iter(&self.template)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Fail on any placeholder outside `allowed`
    pub fn check(&self, allowed: &[&str]) -> GenoflowResult<()> {
        match self.placeholders().into_iter().find(|p| !allowed.contains(p)) {
            Some(unknown) => Err(self.unknown(unknown)),
            None => Ok(()),
        }
    }

    /// Substitute every placeholder
    pub fn render(&self, values: &HashMap<&str, String>) -> GenoflowResult<String> {
        let mut missing = None;

        let rendered = placeholder_pattern().replace_all(&self.template, |caps: &Captures<'_>| {
            match caps.get(1) {
                None if &caps[0] == "{{" => "{".to_string(),
                None => "}".to_string(),
                Some(name) => match values.get(name.as_str()) {
                    Some(value) => value.clone(),
                    None => {
                        missing.get_or_insert_with(|| name.as_str().to_string());
                        String::new()
                    }
                },
            }
        });

        match missing {
            Some(name) => Err(self.unknown(&name)),
            None => Ok(rendered.into_owned()),
        }
    }

    fn unknown(&self, placeholder: &str) -> GenoflowError {
        GenoflowError::UnknownPlaceholder {
            placeholder: placeholder.to_string(),
            template: self.template.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> HashMap<&'static str, String> {
        HashMap::from([
            ("input", "/run/in.bam".to_string()),
            ("output", "/run/out.vcf".to_string()),
            ("unit", "chr20".to_string()),
        ])
    }

    #[test]
    fn test_render() {
        let template = CommandTemplate::new("caller -I {input} -L {unit} -o {output}");
        assert_eq!(
            template.render(&values()).unwrap(),
            "caller -I /run/in.bam -L chr20 -o /run/out.vcf"
        );
    }

    #[test]
    fn test_escaped_braces() {
        let template = CommandTemplate::new("samtools view {input} | awk '{{print $3}}'");
        assert_eq!(
            template.render(&values()).unwrap(),
            "samtools view /run/in.bam | awk '{print $3}'"
        );
        assert_eq!(template.placeholders(), vec!["input"]);
    }

    #[test]
    fn test_unknown_placeholder() {
        let template = CommandTemplate::new("tool {sample}");
        assert!(matches!(
            template.render(&values()),
            Err(GenoflowError::UnknownPlaceholder { placeholder, .. }) if placeholder == "sample"
        ));
        assert!(template.check(&["input", "output"]).is_err());
        assert!(CommandTemplate::new("tool {input}").check(&["input"]).is_ok());
    }
}
