//! Config loading: a JSON task list becomes an ordered sequence of tasks.
//!
//! Expected document shape:
//!
//! ```json
//! {
//!   "tasks": [
//!     { "directory-mirror": { "src": "/data", "dst": "/backup/data" } },
//!     { "archive-create": { "archive_name": "logs_${YYYY}_${MM}_${DD}",
//!                           "src": "/var/log/app", "dst": "/backup/archives",
//!                           "include": ["\\.log$"] } },
//!     { "file-purge": { "path": "/backup/archives", "older_than": "P30D" } }
//!   ]
//! }
//! ```
//!
//! Array order is execution order. Declarations with an unknown kind are
//! skipped with a warning; malformed parameters abort the load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::duration::DurationError;
use crate::registry::TaskRegistry;
use crate::runner::run_tasks;
use crate::task::Task;

/// Errors surfaced while building tasks from configuration, before any task
/// runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown task kind '{0}'")]
    UnknownKind(String),

    #[error("invalid parameters for task '{kind}': {source}")]
    InvalidParams {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {which} pattern '{pattern}': {source}")]
    InvalidPattern {
        which: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    InvalidDuration(#[from] DurationError),
}

impl ConfigError {
    pub(crate) fn invalid_params(kind: &'static str, source: serde_json::Error) -> Self {
        ConfigError::InvalidParams { kind, source }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    tasks: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// An ordered sequence of instantiated tasks, built once per run.
#[derive(Debug, Default)]
pub struct Config {
    pub tasks: Vec<Task>,
}

/// Load a config file and instantiate its tasks through the registry.
///
/// Unknown task kinds are logged and skipped; every other construction
/// failure aborts the load.
///
/// # Errors
///
/// Returns `ConfigError` for unreadable or unparseable files and for
/// declarations with invalid parameters.
pub fn load_config(path: &Path, registry: &TaskRegistry) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigFile = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tasks = Vec::new();
    for declaration in file.tasks {
        for (kind, params) in declaration {
            match registry.create(&kind, params) {
                Ok(task) => {
                    debug!("Configured task '{}'", task.kind());
                    tasks.push(task);
                }
                Err(ConfigError::UnknownKind(name)) => {
                    warn!("Unknown task kind '{}', skipping entry", name);
                }
                Err(err) => return Err(err),
            }
        }
    }
    Ok(Config { tasks })
}

/// Execute a loaded config; true iff every task completed.
pub fn run_config(config: &mut Config) -> bool {
    run_tasks(&mut config.tasks)
}
