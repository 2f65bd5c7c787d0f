//! Scheduler Models
//!
//! Data structures describing units of work, tool variants, runner outcomes
//! and the batch lifecycle.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One file to analyze together with the compiler arguments the tools need.
///
/// Immutable once constructed; the queue holds one clone per applicable tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeUnit {
    /// Absolute path of the source file
    pub file_path: String,
    /// Compiler arguments, in order
    pub arguments: Vec<String>,
}

impl AnalyzeUnit {
    /// Create a new unit
    pub fn new(file_path: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            file_path: file_path.into(),
            arguments,
        }
    }
}

/// Format of the artifact a tool writes on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// clang-tidy / clazy `--export-fixes` document
    Yaml,
    /// JSON array of diagnostics
    Json,
}

impl OutputFormat {
    /// File extension used for temporary artifacts
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yaml",
            OutputFormat::Json => "json",
        }
    }
}

/// External analysis tool variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Style checker (clang-tidy)
    ClangTidy,
    /// Static analyzer running as its own executable (clazy-standalone)
    ClazyStandalone,
    /// Static analyzer hosted as a compiler plugin (clang + clazy plugin)
    ClazyPlugin,
}

impl ToolKind {
    /// Get human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ToolKind::ClangTidy => "Clang-Tidy",
            ToolKind::ClazyStandalone | ToolKind::ClazyPlugin => "Clazy",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Result delivered exactly once by every started runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunnerOutcome {
    /// The tool exited normally and wrote its artifact
    Succeeded {
        output_path: PathBuf,
        format: OutputFormat,
    },
    /// The tool could not be run to completion
    Failed { message: String, details: String },
}

impl RunnerOutcome {
    /// Create a failure outcome
    pub fn failed(message: impl Into<String>, details: impl Into<String>) -> Self {
        RunnerOutcome::Failed {
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunnerOutcome::Succeeded { .. })
    }
}

/// Lifecycle of one batch. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    NotStarted,
    Running,
    Finalized,
    Stopped,
}

impl BatchState {
    /// Check if the batch can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Finalized | BatchState::Stopped)
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchState::NotStarted => write!(f, "not_started"),
            BatchState::Running => write!(f, "running"),
            BatchState::Finalized => write!(f, "finalized"),
            BatchState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Settings that govern a single batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSettings {
    /// Maximum number of runners alive at once
    #[serde(default = "default_parallel_jobs")]
    pub parallel_jobs: usize,
    /// Whether the project is built before analysis starts
    #[serde(default)]
    pub build_before_analysis: bool,
    /// Build output directory, used for the stale-build hint
    #[serde(default)]
    pub build_directory: Option<PathBuf>,
}

/// Half the available cores, at least one.
pub fn default_parallel_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| (n.get() / 2).max(1))
        .unwrap_or(1)
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            parallel_jobs: default_parallel_jobs(),
            build_before_analysis: false,
            build_directory: None,
        }
    }
}

impl RunSettings {
    /// Set the number of parallel jobs
    pub fn with_parallel_jobs(mut self, jobs: usize) -> Self {
        self.parallel_jobs = jobs;
        self
    }

    /// Set the build directory
    pub fn with_build_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.build_directory = Some(dir.into());
        self
    }

    /// Set whether the project is built before analysis
    pub fn build_before_analysis(mut self, enabled: bool) -> Self {
        self.build_before_analysis = enabled;
        self
    }
}
