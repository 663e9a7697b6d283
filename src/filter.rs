//! Path exclusion rules for directory scanning
//!
//! Decides which filesystem entries are eligible for inclusion in a
//! snapshot. A fixed set of patterns excludes dependency caches, build
//! output, version-control metadata, environment files, logs, and OS
//! artifacts. Matching happens on the entry name alone, so a directory
//! match prunes its entire subtree without descending into it. That keeps
//! scans fast on trees with huge dependency directories and keeps secret
//! files out of snapshots even when nested.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::ffi::OsStr;
use std::path::Path;

use crate::error::{GitsnapError, Result};

/// Entry names that are always excluded from snapshots.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // dependency caches
    "node_modules",
    ".cache",
    "__pycache__",
    ".venv",
    // build output
    ".next",
    "dist",
    "build",
    "out",
    "target",
    "coverage",
    ".nyc_output",
    // version-control metadata
    ".git",
    ".svn",
    ".hg",
    // environment files
    ".env",
    ".env.*",
    // logs and scratch files
    "*.log",
    "tmp",
    "temp",
    "*.tmp",
    "*.temp",
    // OS artifacts
    ".DS_Store",
    "Thumbs.db",
];

/// Compiled exclusion rules applied to every scanned entry name
#[derive(Debug, Clone)]
pub struct PathFilter {
    globset: GlobSet,
}

impl PathFilter {
    /// Build a filter from the default exclusion set
    pub fn new() -> Result<Self> {
        Self::with_extra_patterns(&[])
    }

    /// Build a filter from the default set plus caller-supplied patterns
    pub fn with_extra_patterns(extra: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in DEFAULT_EXCLUDES.iter().copied() {
            builder.add(Self::compile(pattern)?);
        }
        for pattern in extra {
            builder.add(Self::compile(pattern)?);
        }
        let globset = builder
            .build()
            .map_err(|e| GitsnapError::invalid_configuration(format!("exclusion rules: {}", e)))?;
        Ok(Self { globset })
    }

    fn compile(pattern: &str) -> Result<Glob> {
        Glob::new(pattern).map_err(|e| {
            GitsnapError::invalid_configuration(format!(
                "invalid exclusion pattern '{}': {}",
                pattern, e
            ))
        })
    }

    /// Check whether a single entry name is excluded
    ///
    /// The check is by name, not by full path: an excluded directory name
    /// anywhere in the tree prunes everything below it.
    pub fn is_excluded(&self, name: &OsStr) -> bool {
        self.globset.is_match(Path::new(name))
    }
}
