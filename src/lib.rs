//! tasker - data-driven task runner.
//!
//! A JSON config file enumerates a sequence of named operations (directory
//! mirroring, directory copying, archive creation, file purging); the
//! runner executes them in order, stopping at the first failure.
//!
//! The moving parts:
//! - [`task`] - the `Task` wrapper, its status lifecycle and the built-in
//!   task variants
//! - [`registry`] - kind-name to constructor resolution
//! - [`config`] - config file loading into an ordered task sequence
//! - [`runner`] - sequential fail-fast execution
//! - [`duration`] - ISO-8601 duration parsing for age thresholds

pub mod config;
pub mod duration;
pub mod registry;
pub mod runner;
pub mod task;

pub use config::{load_config, run_config, Config, ConfigError};
pub use registry::TaskRegistry;
pub use runner::run_tasks;
pub use task::{Task, TaskStatus};
