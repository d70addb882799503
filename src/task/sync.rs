//! Directory tree synchronization: the `directory-mirror` and
//! `directory-copy` tasks and their shared sync primitive.
//!
//! Both walk the source tree and copy what is missing or out of date into
//! the destination. Mirror additionally purges destination entries that have
//! no source counterpart, so the destination ends up an exact replica.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::ConfigError;
use crate::task::{Action, TaskError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SyncParams {
    src: PathBuf,
    dst: PathBuf,
}

/// Mirror a whole directory tree (destination-only entries are deleted).
#[derive(Debug)]
pub struct DirectoryMirror {
    src: PathBuf,
    dst: PathBuf,
}

impl DirectoryMirror {
    pub const KIND: &'static str = "directory-mirror";

    /// Build from a config parameter mapping.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParams` on missing or ill-typed fields.
    pub fn from_params(params: serde_json::Value) -> Result<Box<dyn Action>, ConfigError> {
        let p: SyncParams = serde_json::from_value(params)
            .map_err(|source| ConfigError::invalid_params(Self::KIND, source))?;
        Ok(Box::new(Self {
            src: p.src,
            dst: p.dst,
        }))
    }
}

impl Action for DirectoryMirror {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&self) -> Result<(), TaskError> {
        info!(
            "Mirroring {} into {}...",
            self.src.display(),
            self.dst.display()
        );
        sync_tree(&self.src, &self.dst, true)
    }
}

/// Copy a whole directory tree (destination-only entries are left alone).
#[derive(Debug)]
pub struct DirectoryCopy {
    src: PathBuf,
    dst: PathBuf,
}

impl DirectoryCopy {
    pub const KIND: &'static str = "directory-copy";

    /// Build from a config parameter mapping.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParams` on missing or ill-typed fields.
    pub fn from_params(params: serde_json::Value) -> Result<Box<dyn Action>, ConfigError> {
        let p: SyncParams = serde_json::from_value(params)
            .map_err(|source| ConfigError::invalid_params(Self::KIND, source))?;
        Ok(Box::new(Self {
            src: p.src,
            dst: p.dst,
        }))
    }
}

impl Action for DirectoryCopy {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&self) -> Result<(), TaskError> {
        info!(
            "Copying {} into {}...",
            self.src.display(),
            self.dst.display()
        );
        sync_tree(&self.src, &self.dst, false)
    }
}

/// Synchronize `src` into `dst`, creating `dst` if absent.
///
/// A file is copied when the destination copy is missing, differs in size,
/// or is older than the source; up-to-date files are left untouched, which
/// makes a repeated sync over an unchanged source a no-op. With `purge`,
/// destination entries without a source counterpart are removed afterwards.
///
/// Any I/O error aborts the sync; entries already copied stay copied.
pub(crate) fn sync_tree(src: &Path, dst: &Path, purge: bool) -> Result<(), TaskError> {
    if !src.is_dir() {
        return Err(TaskError::NotADirectory(src.to_path_buf()));
    }
    fs::create_dir_all(dst).map_err(|e| TaskError::io(dst, e))?;

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let rel = match entry.path().strip_prefix(src) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| TaskError::io(&target, e))?;
        } else if entry.file_type().is_file() {
            copy_if_needed(entry.path(), &target)?;
        }
    }

    if purge {
        purge_extraneous(src, dst)?;
    }
    Ok(())
}

fn copy_if_needed(src: &Path, dst: &Path) -> Result<(), TaskError> {
    let src_meta = fs::metadata(src).map_err(|e| TaskError::io(src, e))?;
    let up_to_date = match fs::metadata(dst) {
        Ok(dst_meta) => {
            let newer_src = match (src_meta.modified(), dst_meta.modified()) {
                (Ok(s), Ok(d)) => s > d,
                // No mtime on this filesystem: fall back to size comparison.
                _ => false,
            };
            dst_meta.len() == src_meta.len() && !newer_src
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(TaskError::io(dst, e)),
    };
    if up_to_date {
        return Ok(());
    }
    debug!("Copying {} -> {}", src.display(), dst.display());
    fs::copy(src, dst).map_err(|e| TaskError::io(dst, e))?;
    Ok(())
}

/// Remove destination entries with no source counterpart.
///
/// Entries are collected before any deletion so removing a directory does
/// not invalidate the walk; descendants of a removed directory are skipped
/// via the existence re-check.
fn purge_extraneous(src: &Path, dst: &Path) -> Result<(), TaskError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dst).min_depth(1) {
        let entry = entry?;
        entries.push(entry.into_path());
    }

    for path in entries {
        let rel = match path.strip_prefix(dst) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        if src.join(rel).exists() {
            continue;
        }
        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            // Already gone with a removed parent directory.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(TaskError::io(&path, e)),
        };
        debug!("Purging {}", path.display());
        if meta.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| TaskError::io(&path, e))?;
        } else {
            fs::remove_file(&path).map_err(|e| TaskError::io(&path, e))?;
        }
    }
    Ok(())
}
