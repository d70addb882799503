//! File listing and include/exclude path filtering shared by the
//! archive-create and file-purge tasks.

use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::config::ConfigError;
use crate::task::TaskError;

/// List regular files under `path`.
///
/// With `recurse` the full subtree is walked (symbolic links followed);
/// otherwise only direct children are listed. Paths come back in traversal
/// order, unsorted. Walk errors (unreadable directory, broken cycle) abort
/// the listing.
pub fn list_files(path: &Path, recurse: bool) -> Result<Vec<PathBuf>, TaskError> {
    let max_depth = if recurse { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(true)
    {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Compiled include/exclude patterns.
///
/// Include patterns admit a path that matches at least one of them (an empty
/// include set admits everything); exclude patterns reject a path matching
/// any one of them, regardless of include status. Matching is unanchored
/// regex search over the full path string.
#[derive(Debug, Default)]
pub struct PathFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl PathFilter {
    /// Compile the pattern lists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` for an uncompilable regex, so a
    /// bad pattern surfaces at construction time rather than mid-run.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            include: compile(include, "include")?,
            exclude: compile(exclude, "exclude")?,
        })
    }

    /// Whether `path` survives the filter.
    pub fn matches(&self, path: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(path)) {
            return false;
        }
        !self.exclude.iter().any(|re| re.is_match(path))
    }

    /// Retain only the paths admitted by the filter, preserving order.
    pub fn apply(&self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        paths
            .into_iter()
            .filter(|p| self.matches(&p.to_string_lossy()))
            .collect()
    }
}

fn compile(patterns: &[String], which: &'static str) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                which,
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}
