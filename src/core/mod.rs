//! Core types shared by the planner, workers and front end.
//!
//! - [`ConvertSettings`]: raw batch configuration from the front end
//! - [`JobSpec`]: one planned, immutable conversion
//! - [`ConversionResult`]: outcome of one job
//! - [`Progress`] / [`BatchEvent`]: notifications to the front end
//! - [`BatchJobState`]: per-job status owned by the scheduler

mod types;
mod task;
mod progress;
mod state;

pub use types::{ConversionResult, ConvertSettings, OutputFile, ResizeSettings, WatermarkSettings};
pub(crate) use types::serialize_millis;
pub use task::{
    CutPart,
    CutPolicy,
    JobSpec,
    OutputNaming,
    QualityPolicy,
    ResizePolicy,
    TransformStep,
    WatermarkAnchor,
    WatermarkPolicy,
};
pub use progress::{BatchEvent, Progress, ProgressType};
pub use state::{BatchJobState, JobStatus};
