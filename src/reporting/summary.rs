use std::path::PathBuf;
use std::time::Duration;
use serde::Serialize;

use crate::core::{serialize_millis, ConversionResult};

/// A file-level problem surfaced in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileIssue {
    pub path: PathBuf,
    pub reason: String,
}

/// Totals for a finished or cancelled batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total_files: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Successful jobs with a warning (size target unmet)
    pub warnings: usize,
    /// Input bytes of successful jobs
    pub input_bytes: u64,
    /// Output bytes of successful jobs
    pub output_bytes: u64,
    pub saved_bytes: i64,
    /// `(1 - output/input) * 100`, or 0 with no input
    pub savings_percentage: f64,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub failures: Vec<FileIssue>,
    pub warning_files: Vec<FileIssue>,
}

impl BatchSummary {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}

/// Folds finished results into a summary.
///
/// Order-insensitive; `cancelled` counts jobs that never ran and therefore
/// have no result.
pub fn summarize(results: &[ConversionResult], cancelled: usize, elapsed: Duration) -> BatchSummary {
    let mut summary = BatchSummary {
        total_files: results.len() + cancelled,
        succeeded: 0,
        failed: 0,
        cancelled,
        warnings: 0,
        input_bytes: 0,
        output_bytes: 0,
        saved_bytes: 0,
        savings_percentage: 0.0,
        elapsed,
        failures: Vec::new(),
        warning_files: Vec::new(),
    };

    for result in results {
        match &result.error {
            Some(err) => {
                summary.failed += 1;
                summary.failures.push(FileIssue {
                    path: result.source.clone(),
                    reason: err.to_string(),
                });
            }
            None => {
                summary.succeeded += 1;
                summary.input_bytes += result.input_bytes;
                summary.output_bytes += result.output_bytes;
                if result.size_target_unmet() {
                    summary.warnings += 1;
                    summary.warning_files.push(FileIssue {
                        path: result.source.clone(),
                        reason: format!(
                            "size target unmet; wrote {} bytes at the lowest quality",
                            result.output_bytes
                        ),
                    });
                }
            }
        }
    }

    // Sorted so the summary does not depend on completion order
    summary.failures.sort_by(|a, b| a.path.cmp(&b.path));
    summary.warning_files.sort_by(|a, b| a.path.cmp(&b.path));

    summary.saved_bytes = summary.input_bytes as i64 - summary.output_bytes as i64;
    if summary.input_bytes > 0 {
        summary.savings_percentage =
            (1.0 - summary.output_bytes as f64 / summary.input_bytes as f64) * 100.0;
    }
    summary
}
