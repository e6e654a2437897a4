use std::fmt;
use super::summary::BatchSummary;

/// Human-readable rendering of a [`BatchSummary`].
pub struct BatchReporter<'a> {
    summary: &'a BatchSummary,
}

impl<'a> BatchReporter<'a> {
    pub fn new(summary: &'a BatchSummary) -> Self {
        Self { summary }
    }

    fn average_time_ms(&self) -> f64 {
        let finished = self.summary.succeeded + self.summary.failed;
        if finished == 0 {
            0.0
        } else {
            self.summary.elapsed.as_secs_f64() * 1000.0 / finished as f64
        }
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

impl fmt::Display for BatchReporter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;
        writeln!(f, "=== Image Conversion Report ===")?;
        writeln!(f)?;

        writeln!(f, "Files:")?;
        writeln!(f, "- Total: {}", s.total_files)?;
        writeln!(f, "- Converted: {}", s.succeeded)?;
        writeln!(f, "- Failed: {}", s.failed)?;
        if s.cancelled > 0 {
            writeln!(f, "- Cancelled: {}", s.cancelled)?;
        }
        if s.warnings > 0 {
            writeln!(f, "- Warnings: {}", s.warnings)?;
        }
        writeln!(f)?;

        writeln!(f, "Sizes:")?;
        writeln!(f, "- Total: {} → {}", format_bytes(s.input_bytes), format_bytes(s.output_bytes))?;
        if s.saved_bytes >= 0 {
            writeln!(
                f,
                "- Saved: {} ({:.1}%)",
                format_bytes(s.saved_bytes.unsigned_abs()),
                s.savings_percentage
            )?;
        } else {
            writeln!(
                f,
                "- Grew: {} ({:.1}%)",
                format_bytes(s.saved_bytes.unsigned_abs()),
                -s.savings_percentage
            )?;
        }
        writeln!(f)?;

        writeln!(f, "Time:")?;
        writeln!(f, "- Elapsed: {:.2}s", s.elapsed.as_secs_f64())?;
        writeln!(f, "- Average: {:.0}ms/image", self.average_time_ms())?;

        if !s.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failures:")?;
            for issue in &s.failures {
                writeln!(f, "  └── {}: {}", issue.path.display(), issue.reason)?;
            }
        }

        if !s.warning_files.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings:")?;
            for issue in &s.warning_files {
                writeln!(f, "  └── {}: {}", issue.path.display(), issue.reason)?;
            }
        }

        Ok(())
    }
}
