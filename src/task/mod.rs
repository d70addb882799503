//! Task core: status lifecycle, the work-routine trait and the `Task` wrapper.
//!
//! A task is a boxed [`Action`] (the kind-specific work routine, parameters
//! frozen at construction) paired with its current [`TaskStatus`]. Errors
//! raised by the work routine never cross [`Task::run`]: they are logged and
//! folded into `TaskStatus::Failed`, so the runner decides control flow by
//! inspecting returned status alone.

use std::path::PathBuf;

use thiserror::Error;
use tracing::error;

pub mod archive;
pub mod filter;
pub mod purge;
pub mod sync;

pub use archive::ArchiveCreate;
pub use purge::FilePurge;
pub use sync::{DirectoryCopy, DirectoryMirror};

/// Status of a task in its lifecycle.
///
/// ```text
/// Pending -> Running -> Completed
///                   \-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task has not been started yet
    Pending,
    /// Task work is in progress
    Running,
    /// Task finished successfully
    Completed,
    /// Task work raised an error
    Failed,
}

impl TaskStatus {
    /// True once execution has finished, successfully or not.
    pub fn is_stopped(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Errors raised by task work routines.
///
/// These are caught inside [`Task::run`] and converted to
/// [`TaskStatus::Failed`]; they never propagate to the runner.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("archive write failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("unresolved placeholder '${0}' in archive name")]
    Template(String),
}

impl TaskError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaskError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A kind-specific work routine.
///
/// Implementations hold their parameters immutably; all mutation happens on
/// the filesystem. `execute` returns `Err` to signal failure and must not
/// panic on expected I/O conditions.
pub trait Action: std::fmt::Debug {
    /// Stable kind name this action is registered under.
    fn kind(&self) -> &'static str;

    /// Perform the work.
    fn execute(&self) -> Result<(), TaskError>;
}

/// A single unit of work with its status lifecycle.
///
/// Owned by the `Config` that created it; transitions
/// `Pending -> Running -> {Completed, Failed}` exactly once per [`run`].
///
/// [`run`]: Task::run
pub struct Task {
    status: TaskStatus,
    action: Box<dyn Action>,
}

impl Task {
    pub fn new(action: Box<dyn Action>) -> Self {
        Self {
            status: TaskStatus::Pending,
            action,
        }
    }

    /// Kind name of the underlying action.
    pub fn kind(&self) -> &'static str {
        self.action.kind()
    }

    /// Current status.
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Run the task to completion and return the final status.
    ///
    /// Work-routine errors are logged with context and mapped to
    /// `TaskStatus::Failed`; `run` itself never returns an error.
    pub fn run(&mut self) -> TaskStatus {
        self.status = TaskStatus::Running;
        match self.action.execute() {
            Ok(()) => self.status = TaskStatus::Completed,
            Err(err) => {
                error!("Task '{}' failed: {}", self.action.kind(), err);
                self.status = TaskStatus::Failed;
            }
        }
        self.status
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("kind", &self.action.kind())
            .field("status", &self.status)
            .finish()
    }
}
