use crate::utils::ConvertError;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker pool is closed: {0}")]
    CapacityError(String),

    #[error("Conversion task failed: {0}")]
    TaskFailed(String),

    #[error("Result channel closed before the batch finished")]
    ChannelClosed,
}

pub type WorkerResult<T> = Result<T, WorkerError>;

impl From<tokio::sync::AcquireError> for WorkerError {
    fn from(err: tokio::sync::AcquireError) -> Self {
        WorkerError::CapacityError(format!("Failed to acquire worker: {}", err))
    }
}

impl From<tokio::task::JoinError> for WorkerError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            WorkerError::TaskFailed("conversion panicked".to_string())
        } else {
            WorkerError::TaskFailed(format!("conversion aborted: {}", err))
        }
    }
}

impl From<WorkerError> for ConvertError {
    fn from(err: WorkerError) -> Self {
        ConvertError::worker(err.to_string())
    }
}
