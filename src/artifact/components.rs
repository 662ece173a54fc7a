// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! `file` and `file_set` components

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ArtifactCollection, ArtifactHandle, FileArtifact};
use crate::component::{BuildContext, Component, ComponentCore, Node};
use crate::errors::{GenoflowError, GenoflowResult};

/// One file, optionally tagged with a contig
pub struct FileComponent {
    core: ComponentCore,
    artifact: Option<Arc<FileArtifact>>,
}

impl FileComponent {
    pub const KIND: &'static str = "file";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::KIND),
            artifact: None,
        }
    }
}

impl Default for FileComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for FileComponent {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn initialize(&mut self, ctx: &BuildContext<'_>, _children: &[Node]) -> GenoflowResult<()> {
        let path = ctx.run().resolve(self.core.require("path")?);

        let mut artifact = FileArtifact::new(path);
        if let Some(contig) = self.core.attribute("contig") {
            artifact = artifact.with_partition(contig.trim());
        }

        self.artifact = Some(Arc::new(artifact));
        Ok(())
    }

    fn artifacts(&self) -> Vec<Arc<dyn ArtifactHandle>> {
        self.artifact
            .iter()
            .map(|a| Arc::clone(a) as Arc<dyn ArtifactHandle>)
            .collect()
    }
}

/// A shared set of files.
///
/// Seeded at build time from child elements, an explicit `paths` list, and a
/// `pattern` glob. Operators that name it as an output append to it while the
/// pipeline runs, so later operators see what earlier ones produced.
pub struct FileSetComponent {
    core: ComponentCore,
    files: Arc<ArtifactCollection>,
}

impl FileSetComponent {
    pub const KIND: &'static str = "file_set";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::KIND),
            files: Arc::new(ArtifactCollection::new()),
        }
    }

    fn contig_regex(&self) -> GenoflowResult<Option<Regex>> {
        let Some(pattern) = self.core.attribute("contig_regex") else {
            return Ok(None);
        };

        let regex = Regex::new(pattern).map_err(|e| GenoflowError::InvalidAttribute {
            label: self.core.label().to_string(),
            attribute: "contig_regex".to_string(),
            reason: e.to_string(),
        })?;

        if regex.captures_len() < 2 {
            return Err(GenoflowError::InvalidAttribute {
                label: self.core.label().to_string(),
                attribute: "contig_regex".to_string(),
                reason: "pattern needs a capture group for the contig".to_string(),
            });
        }

        Ok(Some(regex))
    }

    fn glob(&self, pattern: &str, base: &Path) -> GenoflowResult<Vec<PathBuf>> {
        let full_pattern = if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            base.join(pattern).to_string_lossy().to_string()
        };

        let mut matches: Vec<_> = glob::glob(&full_pattern)?.filter_map(Result::ok).collect();
        matches.sort();

        if matches.is_empty() {
            tracing::warn!(file_set = %self.core.label(), %pattern, "pattern matched no files");
        }

        Ok(matches)
    }
}

impl Default for FileSetComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for FileSetComponent {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn initialize(&mut self, ctx: &BuildContext<'_>, children: &[Node]) -> GenoflowResult<()> {
        for child in children {
            self.files.extend(child.artifacts());
        }

        let contig_regex = self.contig_regex()?;
        let mut paths: Vec<PathBuf> = self
            .core
            .list("paths")
            .iter()
            .map(|p| ctx.run().resolve(p))
            .collect();

        if let Some(pattern) = self.core.attribute("pattern") {
            paths.extend(self.glob(pattern, ctx.run().project_home())?);
        }

        for path in paths {
            let mut artifact = FileArtifact::new(path);
            let contig = contig_regex.as_ref().and_then(|regex| {
                regex
                    .captures(artifact.filename())
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
            });
            if let Some(contig) = contig {
                artifact = artifact.with_partition(contig);
            }
            self.files.append(Arc::new(artifact));
        }

        tracing::debug!(file_set = %self.core.label(), files = self.files.len(), "file set initialized");
        Ok(())
    }

    fn artifacts(&self) -> Vec<Arc<dyn ArtifactHandle>> {
        self.files.snapshot()
    }

    fn collection(&self) -> Option<Arc<ArtifactCollection>> {
        Some(Arc::clone(&self.files))
    }
}
