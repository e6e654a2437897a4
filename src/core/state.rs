//! Batch bookkeeping owned by the scheduler's aggregator.

use serde::Serialize;
use tracing::warn;
use crate::core::ConversionResult;

/// Lifecycle of one job: `Pending -> Running -> {Done, Failed, Cancelled}`,
/// or `Pending -> Cancelled` when it never started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed(String),
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_) | Self::Cancelled)
    }
}

/// Counters and per-job status for a running batch.
///
/// Only the aggregator mutates this; workers report over a channel. Once
/// frozen it rejects every further transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJobState {
    total: usize,
    completed: usize,
    failed: usize,
    cancelled: usize,
    statuses: Vec<JobStatus>,
    bytes_before: u64,
    bytes_after: u64,
    frozen: bool,
}

impl BatchJobState {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            cancelled: 0,
            statuses: vec![JobStatus::Pending; total],
            bytes_before: 0,
            bytes_after: 0,
            frozen: false,
        }
    }

    /// `Pending -> Running`. Returns false if the transition is not allowed.
    pub fn mark_running(&mut self, slot: usize) -> bool {
        self.transition(slot, |status| matches!(status, JobStatus::Pending), JobStatus::Running)
    }

    /// `Running -> Done | Failed`, depending on the result.
    pub fn record(&mut self, slot: usize, result: &ConversionResult) -> bool {
        let next = match &result.error {
            None => JobStatus::Done,
            Some(err) => JobStatus::Failed(err.to_string()),
        };
        let failed = matches!(next, JobStatus::Failed(_));
        if !self.transition(slot, |status| matches!(status, JobStatus::Running), next) {
            return false;
        }

        self.completed += 1;
        if failed {
            self.failed += 1;
        } else {
            self.bytes_before += result.input_bytes;
            self.bytes_after += result.output_bytes;
        }
        true
    }

    /// `Pending -> Cancelled`.
    pub fn mark_cancelled(&mut self, slot: usize) -> bool {
        if !self.transition(slot, |status| matches!(status, JobStatus::Pending), JobStatus::Cancelled) {
            return false;
        }
        self.cancelled += 1;
        true
    }

    /// Moves every job still pending to `Cancelled` and rejects further updates.
    pub fn freeze(&mut self) {
        for slot in 0..self.total {
            if self.statuses[slot] == JobStatus::Pending {
                self.mark_cancelled(slot);
            }
        }
        self.frozen = true;
    }

    fn transition(
        &mut self,
        slot: usize,
        allowed: impl Fn(&JobStatus) -> bool,
        next: JobStatus,
    ) -> bool {
        if self.frozen {
            warn!("Ignoring update for job {} on a finalized batch", slot);
            return false;
        }
        match self.statuses.get_mut(slot) {
            Some(status) if allowed(status) => {
                *status = next;
                true
            }
            Some(status) => {
                warn!("Invalid transition for job {}: {:?} -> {:?}", slot, status, next);
                false
            }
            None => {
                warn!("Unknown job slot {} (batch of {})", slot, self.total);
                false
            }
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Jobs that reached Done or Failed
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }

    pub fn succeeded(&self) -> usize {
        self.completed - self.failed
    }

    pub fn status(&self, slot: usize) -> Option<&JobStatus> {
        self.statuses.get(slot)
    }

    pub fn statuses(&self) -> &[JobStatus] {
        &self.statuses
    }

    pub fn running(&self) -> usize {
        self.statuses.iter().filter(|s| **s == JobStatus::Running).count()
    }

    /// Source bytes of successful jobs
    pub fn bytes_before(&self) -> u64 {
        self.bytes_before
    }

    /// Output bytes of successful jobs
    pub fn bytes_after(&self) -> u64 {
        self.bytes_after
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn all_terminal(&self) -> bool {
        self.statuses.iter().all(JobStatus::is_terminal)
    }
}
