//! Batch summary and its human-readable report.

mod reporter;
mod summary;

pub use reporter::{format_bytes, BatchReporter};
pub use summary::{summarize, BatchSummary, FileIssue};
