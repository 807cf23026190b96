use thiserror::Error;

/// Errors raised while driving a session through a graph
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Task execution failed: {0}")]
    TaskExecutionFailed(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Context error: {0}")]
    ContextError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    /// Domain failure raised by a task; callers recover the concrete type with
    /// [`GraphError::downcast_ref`].
    #[error(transparent)]
    Task(#[from] anyhow::Error),
}

impl GraphError {
    /// Borrow the domain error carried by a [`GraphError::Task`], if it has type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            GraphError::Task(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
