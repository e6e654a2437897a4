use serde::{Deserialize, Serialize};
use crate::reporting::BatchSummary;

/// Progress message type
#[derive(Debug, Deserialize, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ProgressType {
    Start,
    Progress,
    Error,
}

/// Progress notification sent after every finished job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Progress type (start, progress, error)
    pub progress_type: ProgressType,
    /// Number of jobs that reached Done or Failed
    pub completed_tasks: usize,
    /// Total number of jobs in the batch
    pub total_tasks: usize,
    /// Progress percentage (0-100)
    pub progress_percentage: usize,
    /// Current status message
    pub status: String,
    /// File name of the job that just finished
    #[serde(default)]
    pub current_file: Option<String>,
    /// Error message when the job failed
    #[serde(default)]
    pub error: Option<String>,
}

impl Progress {
    /// Create a new Progress instance with basic information
    pub fn new(
        progress_type: ProgressType,
        completed_tasks: usize,
        total_tasks: usize,
        status: &str,
    ) -> Self {
        let progress_percentage = if total_tasks > 0 {
            (completed_tasks * 100) / total_tasks
        } else {
            0
        };

        Self {
            progress_type,
            completed_tasks,
            total_tasks,
            progress_percentage,
            status: status.to_string(),
            current_file: None,
            error: None,
        }
    }

    pub fn with_file(mut self, file_name: impl Into<String>) -> Self {
        self.current_file = Some(file_name.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Everything the scheduler tells the front end.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum BatchEvent {
    Progress(Progress),
    /// Terminal event, sent once when the batch completes or is cancelled
    Finished(BatchSummary),
}
