//! Runner Handles
//!
//! A runner owns exactly one external tool invocation against one file. The
//! controller creates runners through a [`RunnerFactory`], starts them with a
//! [`CompletionSender`] and later receives exactly one [`RunnerCompletion`]
//! over its channel. Terminated runners never report.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::{AnalyzeUnit, OutputFormat, RunnerOutcome};

// ============================================================================
// Completion Channel
// ============================================================================

/// Identifier of a runner within one batch.
pub type RunnerId = u64;

/// Message sent by a runner when its process has ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCompletion {
    pub runner_id: RunnerId,
    pub outcome: RunnerOutcome,
}

/// One-shot sender bound to a runner id.
///
/// `send` consumes the sender, so a runner can report at most once.
#[derive(Debug)]
pub struct CompletionSender {
    runner_id: RunnerId,
    tx: mpsc::UnboundedSender<RunnerCompletion>,
}

impl CompletionSender {
    pub fn new(runner_id: RunnerId, tx: mpsc::UnboundedSender<RunnerCompletion>) -> Self {
        Self { runner_id, tx }
    }

    pub fn runner_id(&self) -> RunnerId {
        self.runner_id
    }

    /// Deliver the outcome. A closed channel means the batch is gone.
    pub fn send(self, outcome: RunnerOutcome) {
        if self
            .tx
            .send(RunnerCompletion {
                runner_id: self.runner_id,
                outcome,
            })
            .is_err()
        {
            tracing::debug!(runner_id = self.runner_id, "completion dropped, batch closed");
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Per-dispatch information handed to a factory.
#[derive(Debug, Clone)]
pub struct RunnerContext {
    /// Id the runner will report under
    pub runner_id: RunnerId,
    /// Directory for temporary output artifacts
    pub output_dir: PathBuf,
    /// Extra environment variables for the process
    pub environment: HashMap<String, String>,
    /// Optional wall-clock limit for the process
    pub timeout: Option<Duration>,
}

impl RunnerContext {
    /// Unique artifact path for a unit inside the output directory.
    pub fn output_file_for(&self, unit: &AnalyzeUnit, format: OutputFormat) -> PathBuf {
        let stem = Path::new(&unit.file_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unit".to_string());
        self.output_dir
            .join(format!("{}-{}.{}", stem, self.runner_id, format.extension()))
    }
}

/// Handle over one external-process invocation.
pub trait RunnerHandle: Send {
    /// Tool display name
    fn name(&self) -> &str;

    /// Executable resolved when the handle was created
    fn executable(&self) -> &Path;

    /// File this runner analyzes
    fn file_to_analyze(&self) -> &str;

    /// Where the tool writes its artifact
    fn output_file_path(&self) -> &Path;

    fn output_format(&self) -> OutputFormat;

    /// Start the process. Returns false when the invocation is malformed;
    /// in that case `completion` is dropped unused.
    fn run(&mut self, completion: CompletionSender) -> bool;

    /// Kill the process without reporting a completion.
    fn terminate(&mut self);
}

/// Stateless capability creating runners for one tool.
pub trait RunnerFactory: Send + Sync {
    /// Tool display name
    fn name(&self) -> &str;

    fn create(&self, unit: &AnalyzeUnit, context: &RunnerContext) -> Box<dyn RunnerHandle>;
}

// ============================================================================
// Executable Resolution
// ============================================================================

/// Resolve a tool executable once.
///
/// Names containing a path separator are taken as-is; bare names are looked up
/// on `PATH`. Unresolvable names are returned unchanged so that the
/// executable check reports them.
pub fn resolve_executable(name: &str) -> PathBuf {
    let candidate = PathBuf::from(name);
    if name.is_empty() || candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate;
    }

    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            let full = dir.join(name);
            if is_file_executable(&full) {
                return full;
            }
            #[cfg(windows)]
            {
                let exe = dir.join(format!("{}.exe", name));
                if is_file_executable(&exe) {
                    return exe;
                }
            }
        }
    }

    candidate
}

/// Check that a path is a regular file the current user may execute.
pub fn is_file_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}

// ============================================================================
// Process Runner
// ============================================================================

/// Full description of one tool process.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Tool display name
    pub tool_name: String,
    pub executable: PathBuf,
    pub arguments: Vec<String>,
    /// Artifact the tool writes on success
    pub output_path: PathBuf,
    pub output_format: OutputFormat,
    pub environment: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

/// Runner backed by a `tokio::process` child.
pub struct ProcessRunner {
    spec: CommandSpec,
    file_path: String,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ProcessRunner {
    pub fn new(spec: CommandSpec, file_path: impl Into<String>) -> Self {
        Self {
            spec,
            file_path: file_path.into(),
            cancel: CancellationToken::new(),
            task: None,
        }
    }
}

impl RunnerHandle for ProcessRunner {
    fn name(&self) -> &str {
        &self.spec.tool_name
    }

    fn executable(&self) -> &Path {
        &self.spec.executable
    }

    fn file_to_analyze(&self) -> &str {
        &self.file_path
    }

    fn output_file_path(&self) -> &Path {
        &self.spec.output_path
    }

    fn output_format(&self) -> OutputFormat {
        self.spec.output_format
    }

    fn run(&mut self, completion: CompletionSender) -> bool {
        if self.task.is_some() || self.file_path.is_empty() {
            return false;
        }
        if self.spec.arguments.iter().any(|arg| arg.contains('\0')) {
            tracing::warn!(file = %self.file_path, "argument contains a NUL byte");
            return false;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(tool = %self.spec.tool_name, "no tokio runtime to spawn runner on");
            return false;
        };

        // Tools only write the artifact when they have findings; an empty file
        // reads as no diagnostics.
        if let Err(e) = std::fs::File::create(&self.spec.output_path) {
            tracing::warn!(
                path = %self.spec.output_path.display(),
                error = %e,
                "cannot create output file"
            );
            return false;
        }

        tracing::debug!(
            tool = %self.spec.tool_name,
            executable = %self.spec.executable.display(),
            file = %self.file_path,
            "starting runner"
        );

        let spec = self.spec.clone();
        let cancel = self.cancel.clone();
        self.task = Some(runtime.spawn(execute(spec, cancel, completion)));
        true
    }

    fn terminate(&mut self) {
        self.cancel.cancel();
        // In-flight output is discarded.
        let _ = std::fs::remove_file(&self.spec.output_path);
    }
}

impl Drop for ProcessRunner {
    fn drop(&mut self) {
        // The child is spawned with kill_on_drop; cancelling drops it.
        self.cancel.cancel();
    }
}

/// Run the process to completion unless cancelled first.
async fn execute(spec: CommandSpec, cancel: CancellationToken, completion: CompletionSender) {
    let run = async {
        let mut cmd = Command::new(&spec.executable);
        cmd.args(&spec.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &spec.environment {
            cmd.env(key, value);
        }

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return RunnerOutcome::failed(
                    format!("Failed to start {}: {}", spec.tool_name, e),
                    spec.executable.display().to_string(),
                );
            }
        };

        let output = match spec.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    return RunnerOutcome::failed(
                        format!(
                            "{} timed out after {} seconds",
                            spec.tool_name,
                            limit.as_secs()
                        ),
                        String::new(),
                    );
                }
            },
            None => child.wait_with_output().await,
        };

        match output {
            Ok(output) => {
                let details = collect_details(&output.stdout, &output.stderr);
                if output.status.success() {
                    RunnerOutcome::Succeeded {
                        output_path: spec.output_path.clone(),
                        format: spec.output_format,
                    }
                } else if let Some(code) = output.status.code() {
                    RunnerOutcome::failed(
                        format!("{} exited with code {}", spec.tool_name, code),
                        details,
                    )
                } else {
                    RunnerOutcome::failed(format!("{} crashed", spec.tool_name), details)
                }
            }
            Err(e) => RunnerOutcome::failed(
                format!("Failed to wait for {}: {}", spec.tool_name, e),
                String::new(),
            ),
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(runner_id = completion.runner_id(), "runner terminated");
        }
        outcome = run => {
            completion.send(outcome);
        }
    }
}

fn collect_details(stdout: &[u8], stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stdout = String::from_utf8_lossy(stdout);
    match (stderr.trim().is_empty(), stdout.trim().is_empty()) {
        (false, false) => format!("{}\n{}", stderr.trim_end(), stdout.trim_end()),
        (false, true) => stderr.trim_end().to_string(),
        (true, false) => stdout.trim_end().to_string(),
        (true, true) => String::new(),
    }
}
