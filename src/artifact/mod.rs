// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 genoflow contributors

//! Artifact handles
//!
//! Operators read and write files through [`ArtifactHandle`]s. The engine
//! never opens them; it only needs a path, a display name, and an optional
//! partition key (usually a contig) used to split fan-out work into units.

mod components;

pub use components::{FileComponent, FileSetComponent};

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// File-like input or output
pub trait ArtifactHandle: Send + Sync + fmt::Debug {
    fn absolute_path(&self) -> &Path;

    fn filename(&self) -> &str;

    /// Partition this artifact belongs to, e.g. `chr20`
    fn partition_key(&self) -> Option<&str> {
        None
    }
}

/// A file on local disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileArtifact {
    path: PathBuf,
    filename: String,
    partition: Option<String>,
}

impl FileArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path,
            filename,
            partition: None,
        }
    }

    pub fn with_partition(mut self, key: impl Into<String>) -> Self {
        self.partition = Some(key.into());
        self
    }
}

impl ArtifactHandle for FileArtifact {
    fn absolute_path(&self) -> &Path {
        &self.path
    }

    fn filename(&self) -> &str {
        &self.filename
    }

    fn partition_key(&self) -> Option<&str> {
        self.partition.as_deref()
    }
}

/// Append-only list of artifacts shared between components.
///
/// Safe to append from many tasks; readers get a snapshot.
#[derive(Debug, Default)]
pub struct ArtifactCollection {
    items: RwLock<Vec<Arc<dyn ArtifactHandle>>>,
}

impl ArtifactCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, artifact: Arc<dyn ArtifactHandle>) {
        self.items
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(artifact);
    }

    pub fn extend<I>(&self, artifacts: I)
    where
        I: IntoIterator<Item = Arc<dyn ArtifactHandle>>,
    {
        self.items
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(artifacts);
    }

    /// Current contents, in append order
    pub fn snapshot(&self) -> Vec<Arc<dyn ArtifactHandle>> {
        self.items
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Space-separated absolute paths, for command templates
pub fn join_paths(artifacts: &[Arc<dyn ArtifactHandle>]) -> String {
    artifacts
        .iter()
        .map(|a| a.absolute_path().display().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_artifact_name_and_partition() {
        let artifact = FileArtifact::new("/data/run/calls.chr20.vcf").with_partition("chr20");
        assert_eq!(artifact.filename(), "calls.chr20.vcf");
        assert_eq!(artifact.partition_key(), Some("chr20"));
        assert_eq!(artifact.absolute_path(), Path::new("/data/run/calls.chr20.vcf"));
    }

    #[test]
    fn test_collection_concurrent_append() {
        let collection = Arc::new(ArtifactCollection::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let collection = Arc::clone(&collection);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        collection.append(Arc::new(FileArtifact::new(format!("/tmp/{i}_{j}.bam"))));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collection.len(), 400);
    }

    #[test]
    fn test_join_paths() {
        let artifacts: Vec<Arc<dyn ArtifactHandle>> = vec![
            Arc::new(FileArtifact::new("/a/x.bam")),
            Arc::new(FileArtifact::new("/a/y.bam")),
        ];
        assert_eq!(join_paths(&artifacts), "/a/x.bam /a/y.bam");
    }
}
