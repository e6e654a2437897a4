//! Error types for the image converter.
//!
//! Two families, matching how far a failure is allowed to travel:
//! - [`ConfigError`]: invalid settings or inputs, detected while planning.
//!   Fatal to the whole batch; nothing runs.
//! - [`ConvertError`]: a single job failed. Recorded against that job only;
//!   the rest of the batch keeps going.

use std::io;
use std::path::{Path, PathBuf};
use serde::Serialize;
use thiserror::Error;

/// Invalid configuration, caught before any job is dispatched.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConfigError {
    /// No input files were given
    #[error("No input files given")]
    NoInputs,

    /// Input file does not exist
    #[error("Input file does not exist: {0}")]
    InputNotFound(PathBuf),

    /// Input path exists but is not a regular file
    #[error("Input path is not a file: {0}")]
    NotAFile(PathBuf),

    /// Input or output format is not one of the supported formats
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Quality dial outside 1..=100
    #[error("Invalid quality value: {0}. Must be between 1 and 100")]
    InvalidQuality(u32),

    /// Target size of zero bytes
    #[error("Target size must be greater than 0 KB")]
    InvalidTargetSize,

    /// Resize settings that cannot yield a positive image
    #[error("Invalid resize settings: {0}")]
    InvalidResize(String),

    /// Unknown cut mode string
    #[error("Unknown cut mode: {0}")]
    UnknownCutMode(String),

    /// Watermark text, position, size, opacity or font is unusable
    #[error("Invalid watermark settings: {0}")]
    InvalidWatermark(String),

    /// Worker count of zero
    #[error("Concurrency must be at least 1")]
    InvalidConcurrency,
}

impl ConfigError {
    pub fn resize(msg: impl Into<String>) -> Self {
        Self::InvalidResize(msg.into())
    }

    pub fn watermark(msg: impl Into<String>) -> Self {
        Self::InvalidWatermark(msg.into())
    }
}

/// A failure confined to one job.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConvertError {
    /// Source file could not be read from disk
    #[error("Cannot read '{path}': {reason}")]
    Read { path: PathBuf, reason: String },

    /// Source bytes are corrupt or not a supported image
    #[error("Decode error: {0}")]
    Decode(String),

    /// A transform could not be applied (e.g. cutting a 1px image in half)
    #[error("Transform error: {0}")]
    Transform(String),

    /// The encoder rejected the image or parameters
    #[error("Encode error: {0}")]
    Encode(String),

    /// Output could not be written
    #[error("Cannot write '{path}': {reason}")]
    IoWrite { path: PathBuf, reason: String },

    /// The worker running the job died before producing a result
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Convenience result type for per-job operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

impl ConvertError {
    pub fn read(path: &Path, err: &io::Error) -> Self {
        Self::Read { path: path.to_path_buf(), reason: err.to_string() }
    }

    pub fn decode<T: Into<String>>(msg: T) -> Self {
        Self::Decode(msg.into())
    }

    pub fn transform<T: Into<String>>(msg: T) -> Self {
        Self::Transform(msg.into())
    }

    pub fn encode<T: Into<String>>(msg: T) -> Self {
        Self::Encode(msg.into())
    }

    pub fn io_write(path: &Path, err: &io::Error) -> Self {
        Self::IoWrite { path: path.to_path_buf(), reason: err.to_string() }
    }

    pub fn worker<T: Into<String>>(msg: T) -> Self {
        Self::Worker(msg.into())
    }
}
