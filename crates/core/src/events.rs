//! Batch Event Types
//!
//! Events emitted by the batch controller while it runs. A front end (CLI,
//! editor integration) subscribes through an unbounded channel and renders
//! them; the controller never waits on the consumer.

use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;

/// How a message should be rendered by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    /// Regular status line
    Normal,
    /// Per-unit progress output
    StdOut,
    /// Per-unit error output
    StdErr,
    /// Batch-level error
    Error,
}

/// Severity of a task-list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSeverity {
    Warning,
    Error,
}

/// An entry for the front end's task/problem list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEntry {
    pub severity: TaskSeverity,
    pub message: String,
}

impl TaskEntry {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: TaskSeverity::Error,
            message: message.into(),
        }
    }
}

/// Event emitted by the batch controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    /// The queue was built and the first runners are being dispatched
    BatchStarted { tool_name: String, total: usize },

    /// A runner was started for a (file, tool) pair
    UnitStarted { file_path: String, tool_name: String },

    /// A runner finished and its output was read
    UnitSucceeded { file_path: String },

    /// A runner failed or its output could not be read
    UnitFailed {
        file_path: String,
        message: String,
        details: String,
    },

    /// Non-empty diagnostics for a file
    DiagnosticsAvailable {
        file_path: String,
        diagnostics: Vec<Diagnostic>,
    },

    /// Progress update, `value <= maximum`
    Progress { value: usize, maximum: usize },

    /// Progress reporting has ended
    ProgressFinished,

    /// Progress was canceled by the user
    ProgressCanceled,

    /// Free-form output line
    Message { text: String, format: MessageFormat },

    /// Task-list entry
    Task(TaskEntry),

    /// The batch could not run (fatal error)
    BatchFailed { message: String },

    /// All queued work completed
    BatchFinished {
        analyzed: usize,
        not_analyzed: usize,
        success: bool,
    },

    /// The batch was stopped before draining the queue
    BatchStopped,
}

impl BatchEvent {
    /// Whether this event ends the batch.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchEvent::BatchFinished { .. } | BatchEvent::BatchStopped
        )
    }
}
