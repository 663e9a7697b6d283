//! Directory scanning for snapshot construction
//!
//! Walks a project root recursively, applies the exclusion rules, and
//! produces the flat ordered list of eligible files with their metadata.
//! Excluded directories are pruned without descending into them. An
//! unreadable subdirectory is skipped with a warning; only an unreadable
//! root aborts the scan. Symbolic links are not followed and only regular
//! files are recorded.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::filter::PathFilter;
use crate::types::FileRecord;

/// Recursive scanner producing the eligible files under a root directory
#[derive(Debug)]
pub struct TreeScanner {
    root: PathBuf,
    filter: PathFilter,
}

impl TreeScanner {
    /// Create a scanner with the default exclusion rules
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            filter: PathFilter::new()?,
        })
    }

    /// Replace the exclusion rules
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Root directory this scanner walks
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the root and collect eligible files in walk order
    ///
    /// Returns an empty list when no eligible files exist; deciding whether
    /// that is acceptable is the caller's concern. Fails only when the root
    /// itself cannot be read.
    pub fn scan(&self) -> Result<Vec<FileRecord>> {
        // An unreadable or missing root is the one fatal case.
        std::fs::read_dir(&self.root)?;

        let mut records = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.filter.is_excluded(entry.file_name()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!("skipping {:?}: {}", entry.path(), err);
                    continue;
                }
            };
            let path = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            records.push(FileRecord {
                path,
                size: metadata.len(),
                modified,
                executable: is_executable(&metadata),
            });
        }

        debug!("scanned {} eligible files under {:?}", records.len(), self.root);
        Ok(records)
    }
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    false
}
