//! Error types for behavior loading, invocation and watching.

use std::path::PathBuf;

use crate::behavior::Hook;

/// Errors that can occur while building, running or watching a behavior.
#[derive(Debug, thiserror::Error)]
pub enum BehaviorError {
    /// Reading a source file or directory failed.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Walking the source directory failed.
    #[error("Source walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// YAML parse/deserialization error in the compilation unit.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Semantic or template compile error in the compilation unit.
    #[error("Compile error: {0}")]
    Compile(String),

    /// The compilation unit defines no public behavior.
    #[error("No public Behavior definition found in {0}")]
    NoBehavior(String),

    /// The compilation unit defines more than one public behavior.
    #[error("Ambiguous behavior: {} public Behavior definitions ({})", .ids.len(), .ids.join(", "))]
    AmbiguousBehavior { ids: Vec<String> },

    /// A hook failed while running.
    #[error("Hook {hook} failed: {message}")]
    Hook { hook: Hook, message: String },

    /// Filesystem watcher error.
    #[error("Notify watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// The debounce timer thread could not be started.
    #[error("Failed to start watcher thread: {0}")]
    WatcherThread(#[source] std::io::Error),
}

impl BehaviorError {
    /// Whether this error means the sources could not be turned into a behavior.
    pub fn is_compilation(&self) -> bool {
        matches!(
            self,
            BehaviorError::Io { .. }
                | BehaviorError::Walk(_)
                | BehaviorError::Parse(_)
                | BehaviorError::Compile(_)
                | BehaviorError::NoBehavior(_)
                | BehaviorError::AmbiguousBehavior { .. }
        )
    }
}

/// Result alias for behavior operations.
pub type Result<T> = std::result::Result<T, BehaviorError>;
