// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! `${name}` substitution in attribute values

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::errors::{GenoflowError, GenoflowResult};

fn property_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}").expect("Invalid property pattern")
    })
}

/// Named values substituted into attribute strings
#[derive(Debug, Clone, Default)]
pub struct Properties {
    values: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Replace every `${name}` in `value`. Unknown names are an error.
    pub fn substitute(&self, value: &str) -> GenoflowResult<String> {
        let mut missing = None;

        let replaced = property_pattern().replace_all(value, |caps: &Captures<'_>| {
            let name = &caps[1];
            match self.values.get(name) {
                Some(v) => v.clone(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(name) => Err(GenoflowError::UnknownProperty {
                name,
                value: value.to_string(),
            }),
            None => Ok(replaced.into_owned()),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_known_properties() {
        let props: Properties = [("sample", "NA12878"), ("project_home", "/data/run")]
            .into_iter()
            .collect();

        let value = props.substitute("${project_home}/input/${sample}.bam").unwrap();
        assert_eq!(value, "/data/run/input/NA12878.bam");
    }

    #[test]
    fn test_plain_text_untouched() {
        let props = Properties::new();
        assert_eq!(props.substitute("samtools index {input}").unwrap(), "samtools index {input}");
    }

    #[test]
    fn test_unknown_property_is_error() {
        let props = Properties::new();
        let err = props.substitute("ref/${genome}.fa").unwrap_err();
        match err {
            GenoflowError::UnknownProperty { name, .. } => assert_eq!(name, "genome"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
