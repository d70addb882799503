//! Kind-name to constructor registry.
//!
//! Each task variant registers under its stable kind name; resolution is an
//! exact string lookup, no fuzzy matching. [`TaskRegistry::builtin`] wires
//! up every built-in variant, so the set of registered kinds lives here
//! rather than being scattered through the config loader.

use std::collections::HashMap;

use crate::config::ConfigError;
use crate::task::{Action, ArchiveCreate, DirectoryCopy, DirectoryMirror, FilePurge, Task};

/// Builds an action from its config parameter mapping.
pub type Constructor = fn(serde_json::Value) -> Result<Box<dyn Action>, ConfigError>;

/// Maps declarative kind names to task constructors.
pub struct TaskRegistry {
    constructors: HashMap<&'static str, Constructor>,
}

impl TaskRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registry with every built-in task variant registered.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(DirectoryMirror::KIND, DirectoryMirror::from_params);
        registry.register(DirectoryCopy::KIND, DirectoryCopy::from_params);
        registry.register(ArchiveCreate::KIND, ArchiveCreate::from_params);
        registry.register(FilePurge::KIND, FilePurge::from_params);
        registry
    }

    /// Register a constructor under a kind name, replacing any previous one.
    pub fn register(&mut self, kind: &'static str, constructor: Constructor) {
        self.constructors.insert(kind, constructor);
    }

    /// Instantiate a task from a declaration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownKind` when no constructor is registered
    /// under `kind`, or the constructor's own error for bad parameters.
    pub fn create(&self, kind: &str, params: serde_json::Value) -> Result<Task, ConfigError> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| ConfigError::UnknownKind(kind.to_string()))?;
        Ok(Task::new(constructor(params)?))
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.constructors.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
