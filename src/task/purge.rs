//! The `file-purge` task: delete files matching filter and age criteria.

use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use chrono::Local;
use serde::Deserialize;
use tracing::info;

use crate::config::ConfigError;
use crate::duration::IsoDuration;
use crate::task::filter::{list_files, PathFilter};
use crate::task::{Action, TaskError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PurgeParams {
    path: PathBuf,
    #[serde(default)]
    recurse: bool,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    older_than: Option<OlderThan>,
}

/// `older_than` accepts either an ISO-8601 duration string or a plain number
/// of seconds.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OlderThan {
    Seconds(f64),
    Iso(String),
}

/// Delete files under a target path.
///
/// Candidates are the direct children of `path` (or the full subtree with
/// `recurse`), narrowed by include/exclude patterns, then by the optional
/// age threshold: with `older_than` set, only files whose modification time
/// is at or before `now - older_than` are removed. The first failed stat or
/// remove aborts the task.
#[derive(Debug)]
pub struct FilePurge {
    path: PathBuf,
    recurse: bool,
    filter: PathFilter,
    older_than: Option<IsoDuration>,
}

impl FilePurge {
    pub const KIND: &'static str = "file-purge";

    /// Build from a config parameter mapping.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidParams` on missing or ill-typed fields,
    /// `ConfigError::InvalidPattern` for an uncompilable regex and
    /// `ConfigError::InvalidDuration` for an unparseable `older_than`.
    pub fn from_params(params: serde_json::Value) -> Result<Box<dyn Action>, ConfigError> {
        let p: PurgeParams = serde_json::from_value(params)
            .map_err(|source| ConfigError::invalid_params(Self::KIND, source))?;
        let filter = PathFilter::new(&p.include, &p.exclude)?;
        let older_than = match p.older_than {
            Some(OlderThan::Seconds(secs)) => Some(IsoDuration::from_seconds(secs)?),
            Some(OlderThan::Iso(text)) => Some(IsoDuration::parse(&text)?),
            None => None,
        };
        Ok(Box::new(Self {
            path: p.path,
            recurse: p.recurse,
            filter,
            older_than,
        }))
    }
}

impl Action for FilePurge {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn execute(&self) -> Result<(), TaskError> {
        info!("Purging files in {}...", self.path.display());
        if !self.path.is_dir() {
            return Err(TaskError::NotADirectory(self.path.clone()));
        }

        let files = list_files(&self.path, self.recurse)?;
        let files = self.filter.apply(files);

        let candidates = match &self.older_than {
            Some(older_than) => {
                let cutoff = SystemTime::from(older_than.subtract_from(Local::now()));
                select_stale(stat_mtimes(files)?, cutoff)
            }
            None => files,
        };

        info!("Removing {} files...", candidates.len());
        for path in &candidates {
            info!("Removing {}", path.display());
            fs::remove_file(path).map_err(|e| TaskError::io(path, e))?;
        }
        Ok(())
    }
}

/// Pair each path with its modification time (symlink metadata, so a link's
/// own age counts, not its target's).
fn stat_mtimes(files: Vec<PathBuf>) -> Result<Vec<(PathBuf, SystemTime)>, TaskError> {
    files
        .into_iter()
        .map(|path| {
            let meta = fs::symlink_metadata(&path).map_err(|e| TaskError::io(&path, e))?;
            let mtime = meta.modified().map_err(|e| TaskError::io(&path, e))?;
            Ok((path, mtime))
        })
        .collect()
}

/// Keep the files whose modification time is at or before the cutoff.
fn select_stale(entries: Vec<(PathBuf, SystemTime)>, cutoff: SystemTime) -> Vec<PathBuf> {
    entries
        .into_iter()
        .filter(|(_, mtime)| *mtime <= cutoff)
        .map(|(path, _)| path)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn test_select_stale_respects_threshold() {
        let now = SystemTime::now();
        let entries = vec![
            (PathBuf::from("ten_days"), now - 10 * DAY),
            (PathBuf::from("five_days"), now - 5 * DAY),
            (PathBuf::from("one_day"), now - DAY),
        ];
        let cutoff = now - 7 * DAY;
        let stale = select_stale(entries, cutoff);
        assert_eq!(stale, vec![PathBuf::from("ten_days")]);
    }

    #[test]
    fn test_select_stale_boundary_is_inclusive() {
        let now = SystemTime::now();
        let cutoff = now - 7 * DAY;
        let entries = vec![(PathBuf::from("exact"), cutoff)];
        assert_eq!(select_stale(entries, cutoff), vec![PathBuf::from("exact")]);
    }

    #[test]
    fn test_purge_without_threshold_removes_filtered_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("a.tmp"), "x").unwrap();
        fs::write(temp.path().join("b.tmp"), "y").unwrap();
        fs::write(temp.path().join("keep.txt"), "z").unwrap();

        let action = FilePurge::from_params(serde_json::json!({
            "path": temp.path(),
            "include": [r"\.tmp$"],
        }))
        .unwrap();
        action.execute().unwrap();

        assert!(!temp.path().join("a.tmp").exists());
        assert!(!temp.path().join("b.tmp").exists());
        assert!(temp.path().join("keep.txt").exists());
    }

    #[test]
    fn test_purge_non_recursive_leaves_subtree() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("top.tmp"), "x").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/nested.tmp"), "y").unwrap();

        let action = FilePurge::from_params(serde_json::json!({
            "path": temp.path(),
        }))
        .unwrap();
        action.execute().unwrap();

        assert!(!temp.path().join("top.tmp").exists());
        assert!(temp.path().join("sub/nested.tmp").exists());
    }

    #[test]
    fn test_purge_recursive_reaches_subtree() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub/nested.tmp"), "y").unwrap();

        let action = FilePurge::from_params(serde_json::json!({
            "path": temp.path(),
            "recurse": true,
        }))
        .unwrap();
        action.execute().unwrap();

        assert!(!temp.path().join("sub/nested.tmp").exists());
        // Directories themselves are not purge targets.
        assert!(temp.path().join("sub").exists());
    }

    #[test]
    fn test_fresh_files_survive_age_threshold() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("fresh.tmp"), "x").unwrap();

        let action = FilePurge::from_params(serde_json::json!({
            "path": temp.path(),
            "older_than": "P7D",
        }))
        .unwrap();
        action.execute().unwrap();

        assert!(temp.path().join("fresh.tmp").exists());
    }

    #[test]
    fn test_numeric_older_than_is_seconds() {
        let action = FilePurge::from_params(serde_json::json!({
            "path": "/tmp/anywhere",
            "older_than": 3600,
        }));
        assert!(action.is_ok());
    }

    #[test]
    fn test_negative_older_than_fails_construction() {
        // A cutoff in the future would mark every filtered file stale.
        let err = FilePurge::from_params(serde_json::json!({
            "path": "/tmp/anywhere",
            "older_than": -5,
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration(_)));
    }

    #[test]
    fn test_bad_duration_fails_construction() {
        let err = FilePurge::from_params(serde_json::json!({
            "path": "/tmp/anywhere",
            "older_than": "seven days",
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDuration(_)));
    }

    #[test]
    fn test_missing_target_fails_task() {
        let temp = tempfile::tempdir().expect("tempdir");
        let action = FilePurge::from_params(serde_json::json!({
            "path": temp.path().join("absent"),
        }))
        .unwrap();
        assert!(action.execute().is_err());
    }
}
