//! Batch Progress
//!
//! A counter of completed runners bounded by the initial queue size.

/// Whether the progress report is still live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Idle,
    Running,
    Finished,
    Canceled,
}

/// Monotonic progress over one batch.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    initial_count: usize,
    completed_count: usize,
    status: ProgressStatus,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self {
            initial_count: 0,
            completed_count: 0,
            status: ProgressStatus::Idle,
        }
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new report over `initial_count` queue items.
    pub fn reset(&mut self, initial_count: usize) {
        self.initial_count = initial_count;
        self.completed_count = 0;
        self.status = ProgressStatus::Running;
    }

    /// Count one completed runner. Saturates at the initial count.
    pub fn advance(&mut self) -> usize {
        if self.completed_count < self.initial_count {
            self.completed_count += 1;
        }
        self.completed_count
    }

    /// Mark the report finished; a canceled report stays canceled.
    pub fn finish(&mut self) {
        if self.status != ProgressStatus::Canceled {
            self.status = ProgressStatus::Finished;
        }
    }

    pub fn cancel(&mut self) {
        self.status = ProgressStatus::Canceled;
    }

    pub fn initial_count(&self) -> usize {
        self.initial_count
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    pub fn status(&self) -> ProgressStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            ProgressStatus::Finished | ProgressStatus::Canceled
        )
    }
}
