//! Stage-level errors.

use lane_behavior::BehaviorError;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Loading or running the stage behavior failed.
    #[error("Behavior error: {0}")]
    Behavior(#[from] BehaviorError),

    /// The dedicated worker pool could not be built.
    #[error("Worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// The stage does not implement this operation.
    #[error("Stage '{stage}' does not support {operation}")]
    Unsupported {
        stage: String,
        operation: &'static str,
    },

    /// A producing stage was given a zero interval.
    #[error("Stage '{stage}' needs a non-zero produce interval")]
    InvalidInterval { stage: String },

    /// A stage thread could not be started.
    #[error("Failed to spawn stage thread: {0}")]
    Spawn(#[source] std::io::Error),
}
