//! Job lifecycle stages.

use std::fmt;

/// Where a job is in its lifecycle. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobStage {
    Received,
    Acquiring,
    Gating,
    Transforming,
    Generating,
    Delivering,
    Done,
    Failed,
}

impl JobStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Acquiring => "acquiring",
            Self::Gating => "gating",
            Self::Transforming => "transforming",
            Self::Generating => "generating",
            Self::Delivering => "delivering",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records stage transitions of one job and logs each of them.
#[derive(Debug)]
pub(crate) struct StageTracker {
    current: JobStage,
}

impl StageTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: JobStage::Received,
        }
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> JobStage {
        self.current
    }

    pub(crate) fn enter(&mut self, next: JobStage) {
        debug_assert!(
            next > self.current && !self.current.is_terminal(),
            "stage moved from {} to {}",
            self.current,
            next
        );
        tracing::info!(from = %self.current, to = %next, "Job stage");
        self.current = next;
    }

    /// Mark the job failed, remembering the stage it failed in.
    pub(crate) fn fail(&mut self) -> JobStage {
        let failed_in = self.current;
        self.current = JobStage::Failed;
        failed_in
    }
}
