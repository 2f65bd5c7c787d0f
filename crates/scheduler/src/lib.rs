//! Analyze Batch Scheduler
//!
//! Runs external analysis tools over a set of source files with a bounded
//! number of concurrent processes. Independent of any CLI or config layer:
//!
//! - `models` - Units, tool variants, runner outcomes and batch lifecycle
//! - `runner` - RunnerHandle/RunnerFactory seams and the tokio process runner
//! - `tools` - Clang-Tidy and Clazy invocations
//! - `results` - Analyzed / not-analyzed file sets
//! - `progress` - Progress reporting over the initial queue size
//! - `controller` - The batch controller (queue, pool, completion handling)

pub mod controller;
pub mod models;
pub mod progress;
pub mod results;
pub mod runner;
pub mod tools;

// Re-export model types
pub use models::{
    default_parallel_jobs, AnalyzeUnit, BatchState, OutputFormat, RunSettings, RunnerOutcome,
    ToolKind,
};

// Re-export runner seams
pub use runner::{
    is_file_executable, resolve_executable, CommandSpec, CompletionSender, ProcessRunner,
    RunnerCompletion, RunnerContext, RunnerFactory, RunnerHandle, RunnerId,
};

// Re-export tool variants
pub use tools::{
    runner_factories, tool_display_name, DiagnosticConfig, TidyMode, ToolExecutables,
    ToolRunnerFactory, CLAZY_STANDALONE_ENV,
};

pub use controller::{build_queue, BatchController, BatchSummary, EventSender, OutputReader, QueueItem};
pub use progress::{ProgressStatus, ProgressTracker};
pub use results::ResultSets;
