//! Batch Controller
//!
//! Owns the pending queue and the pool of active runners for one batch:
//!
//! 1. `start` builds the queue (unit-major, factory-minor) and fills the pool
//!    up to `parallel_jobs`
//! 2. every runner completion arrives over an mpsc channel and is handled by
//!    `on_runner_completed`, which updates results and progress and refills
//!    the freed slot with the queue head
//! 3. once queue and pool are both empty the batch finalizes, exactly once
//!
//! `stop` and `cancel` kill every active process and end the batch without
//! finalizing. A missing tool executable is fatal for the whole batch, while a
//! tool that fails after starting only marks its file as not analyzed.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use analyze_batch_core::{
    BatchEvent, CoreError, CoreResult, Diagnostic, MessageFormat, TaskEntry,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{AnalyzeUnit, BatchState, OutputFormat, RunSettings, RunnerOutcome};
use crate::progress::ProgressTracker;
use crate::results::ResultSets;
use crate::runner::{
    is_file_executable, CompletionSender, RunnerCompletion, RunnerContext, RunnerFactory,
    RunnerHandle, RunnerId,
};

// ============================================================================
// Collaborators
// ============================================================================

/// Reads a tool artifact into diagnostics.
///
/// `project_files` lets the reader drop findings in files that do not belong
/// to the project (system headers, generated code).
pub trait OutputReader: Send + Sync {
    fn read(
        &self,
        format: OutputFormat,
        output_path: &Path,
        source_file: &str,
        project_files: &HashSet<String>,
    ) -> CoreResult<Vec<Diagnostic>>;
}

/// Sender half of the event channel.
pub type EventSender = mpsc::UnboundedSender<BatchEvent>;

/// A pending (unit, tool) pairing.
#[derive(Clone)]
pub struct QueueItem {
    pub unit: AnalyzeUnit,
    pub factory: Arc<dyn RunnerFactory>,
}

impl std::fmt::Debug for QueueItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueItem")
            .field("file", &self.unit.file_path)
            .field("tool", &self.factory.name())
            .finish()
    }
}

/// Build the queue: for each unit, one item per factory, in order.
pub fn build_queue(units: &[AnalyzeUnit], factories: &[Arc<dyn RunnerFactory>]) -> VecDeque<QueueItem> {
    let mut queue = VecDeque::with_capacity(units.len() * factories.len());
    for unit in units {
        for factory in factories {
            queue.push_back(QueueItem {
                unit: unit.clone(),
                factory: Arc::clone(factory),
            });
        }
    }
    queue
}

// ============================================================================
// Summary
// ============================================================================

/// What a batch produced, available once it reached a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub tool_name: String,
    pub state: BatchState,
    /// True only when the batch finalized and every file was analyzed
    pub success: bool,
    pub analyzed_files: Vec<String>,
    pub not_analyzed_files: Vec<String>,
    /// Queue size at start
    pub total_items: usize,
    pub completed_items: usize,
    pub diagnostics_count: usize,
    pub tasks: Vec<TaskEntry>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

// ============================================================================
// Controller
// ============================================================================

/// Scheduler for one batch. Create a new controller for every batch.
pub struct BatchController {
    tool_name: String,
    settings: RunSettings,
    reader: Arc<dyn OutputReader>,
    events: Option<EventSender>,
    project_files: HashSet<String>,
    environment: HashMap<String, String>,
    timeout: Option<Duration>,
    output_root: Option<PathBuf>,
    output_dir: Option<tempfile::TempDir>,

    state: BatchState,
    queue: VecDeque<QueueItem>,
    active: HashMap<RunnerId, Box<dyn RunnerHandle>>,
    next_runner_id: RunnerId,
    max_active: usize,

    results: ResultSets,
    progress: ProgressTracker,
    success: bool,
    tasks: Vec<TaskEntry>,
    diagnostics_count: usize,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,

    completion_tx: mpsc::UnboundedSender<RunnerCompletion>,
    completion_rx: mpsc::UnboundedReceiver<RunnerCompletion>,
    cancellation_token: CancellationToken,
}

impl BatchController {
    /// Create a controller with the given settings and output reader.
    pub fn new(
        tool_name: impl Into<String>,
        settings: RunSettings,
        reader: Arc<dyn OutputReader>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            tool_name: tool_name.into(),
            settings,
            reader,
            events: None,
            project_files: HashSet::new(),
            environment: HashMap::new(),
            timeout: None,
            output_root: None,
            output_dir: None,
            state: BatchState::NotStarted,
            queue: VecDeque::new(),
            active: HashMap::new(),
            next_runner_id: 1,
            max_active: 0,
            results: ResultSets::new(),
            progress: ProgressTracker::new(),
            success: true,
            tasks: Vec::new(),
            diagnostics_count: 0,
            started_at: None,
            finished_at: None,
            completion_tx,
            completion_rx,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Subscribe an event channel
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Set the files known to belong to the project
    pub fn with_project_files(mut self, files: HashSet<String>) -> Self {
        self.project_files = files;
        self
    }

    /// Set extra environment variables for every runner
    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    /// Set a per-runner timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Create the temporary output directory under `root` instead of the system temp dir
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = Some(root.into());
        self
    }

    /// Share a cancellation token with the caller
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Highest number of simultaneously active runners seen so far
    pub fn max_active(&self) -> usize {
        self.max_active
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    /// Ids of the active runners, ascending
    pub fn active_runner_ids(&self) -> Vec<RunnerId> {
        let mut ids: Vec<RunnerId> = self.active.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn results(&self) -> &ResultSets {
        &self.results
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn tasks(&self) -> &[TaskEntry] {
        &self.tasks
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Temporary directory holding artifacts while the batch runs
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_ref().map(|dir| dir.path())
    }

    /// Overall success: no runner failed and no file is marked not analyzed
    pub fn success(&self) -> bool {
        self.success && self.results.not_analyzed_count() == 0
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Build the queue and fill the runner pool.
    ///
    /// Fails without starting anything when `parallel_jobs` is zero or the
    /// output directory cannot be created. An empty queue finalizes right away.
    pub fn start(
        &mut self,
        units: &[AnalyzeUnit],
        factories: &[Arc<dyn RunnerFactory>],
    ) -> CoreResult<()> {
        if self.state != BatchState::NotStarted {
            return Err(CoreError::validation(format!(
                "batch already {}, create a new controller",
                self.state
            )));
        }

        if self.settings.parallel_jobs < 1 {
            let message = format!(
                "{}: Invalid number of parallel jobs ({}). Stopped.",
                self.tool_name, self.settings.parallel_jobs
            );
            self.fail_before_start(&message);
            return Err(CoreError::validation(message));
        }

        let output_dir = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("analyze-batch-");
            match &self.output_root {
                Some(root) => builder.tempdir_in(root),
                None => builder.tempdir(),
            }
        };
        match output_dir {
            Ok(dir) => self.output_dir = Some(dir),
            Err(e) => {
                let message = format!(
                    "{}: Failed to create temporary directory. Stopped.",
                    self.tool_name
                );
                tracing::warn!(error = %e, "{}", message);
                self.fail_before_start(&message);
                return Err(CoreError::Io(e));
            }
        }

        self.queue = build_queue(units, factories);
        self.results.clear();
        self.progress.reset(self.queue.len());
        self.success = true;
        self.started_at = Some(Utc::now());
        self.state = BatchState::Running;

        tracing::debug!(
            units = units.len(),
            tools = factories.len(),
            queued = self.queue.len(),
            parallel_jobs = self.settings.parallel_jobs,
            "batch starting"
        );

        if self.queue.is_empty() {
            self.finalize();
            return Ok(());
        }

        self.emit(BatchEvent::BatchStarted {
            tool_name: self.tool_name.clone(),
            total: self.queue.len(),
        });
        self.emit(BatchEvent::Progress {
            value: 0,
            maximum: self.progress.initial_count(),
        });

        self.fill_pool();
        Ok(())
    }

    /// Drive the batch until it is finalized or stopped.
    ///
    /// Completions are handled one at a time in arrival order; cancelling the
    /// token stops the batch.
    pub async fn run(&mut self) -> BatchSummary {
        let token = self.cancellation_token.clone();

        while self.state == BatchState::Running {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                completion = self.completion_rx.recv() => Some(completion),
            };

            match next {
                None => self.cancel(),
                Some(Some(completion)) => self.on_runner_completed(completion),
                // The controller holds a sender, so the channel never closes.
                Some(None) => break,
            }
        }

        self.summary()
    }

    /// Start `units` and run the batch to its end.
    pub async fn execute(
        &mut self,
        units: &[AnalyzeUnit],
        factories: &[Arc<dyn RunnerFactory>],
    ) -> CoreResult<BatchSummary> {
        self.start(units, factories)?;
        Ok(self.run().await)
    }

    /// Handle one runner completion.
    pub fn on_runner_completed(&mut self, completion: RunnerCompletion) {
        if self.state != BatchState::Running {
            tracing::debug!(
                runner_id = completion.runner_id,
                state = %self.state,
                "discarding completion after batch end"
            );
            return;
        }

        let Some(runner) = self.active.remove(&completion.runner_id) else {
            tracing::warn!(runner_id = completion.runner_id, "completion from unknown runner");
            return;
        };

        let file_path = runner.file_to_analyze().to_string();

        match completion.outcome {
            RunnerOutcome::Succeeded {
                output_path,
                format,
            } => {
                tracing::debug!(file = %file_path, output = %output_path.display(), "runner succeeded");
                let read = self
                    .reader
                    .read(format, &output_path, &file_path, &self.project_files);
                remove_artifact(&output_path);

                match read {
                    Ok(diagnostics) => {
                        // A file that failed with another tool stays failed.
                        if !self.results.is_not_analyzed(&file_path) {
                            self.results.mark_analyzed(&file_path);
                            self.emit(BatchEvent::UnitSucceeded {
                                file_path: file_path.clone(),
                            });
                        }
                        if !diagnostics.is_empty() {
                            self.diagnostics_count += diagnostics.len();
                            self.emit(BatchEvent::DiagnosticsAvailable {
                                file_path,
                                diagnostics,
                            });
                        }
                    }
                    Err(e) => {
                        tracing::debug!(file = %file_path, error = %e, "error reading output file");
                        self.results.mark_not_analyzed(&file_path);
                        self.success = false;
                        let text = format!("Failed to analyze \"{}\": {}", file_path, e);
                        self.message(text, MessageFormat::StdErr);
                        self.emit(BatchEvent::UnitFailed {
                            file_path,
                            message: e.to_string(),
                            details: String::new(),
                        });
                    }
                }
            }
            RunnerOutcome::Failed { message, details } => {
                tracing::debug!(file = %file_path, %message, %details, "runner failed");
                // The tool may have written a partial artifact.
                remove_artifact(runner.output_file_path());

                self.results.mark_not_analyzed(&file_path);
                self.success = false;

                let text = format!("Failed to analyze \"{}\": {}", file_path, message);
                self.message(text.clone(), MessageFormat::StdErr);
                if !details.is_empty() {
                    self.message(details.clone(), MessageFormat::StdErr);
                }
                self.add_task(TaskEntry::error(text));
                self.emit(BatchEvent::UnitFailed {
                    file_path,
                    message,
                    details,
                });
            }
        }
        drop(runner);

        let value = self.progress.advance();
        self.emit(BatchEvent::Progress {
            value,
            maximum: self.progress.initial_count(),
        });

        if self.queue.is_empty() {
            if self.active.is_empty() {
                self.finalize();
            }
        } else {
            self.fill_pool();
        }
    }

    /// Report the summary and end the batch. Only the first call from
    /// `Running` has an effect.
    pub fn finalize(&mut self) {
        if self.state != BatchState::Running {
            return;
        }
        self.state = BatchState::Finalized;
        self.finished_at = Some(Utc::now());

        let analyzed = self.results.analyzed_count();
        let not_analyzed = self.results.not_analyzed_count();
        self.message(
            format!(
                "{} finished: Processed {} files successfully, {} failed.",
                self.tool_name, analyzed, not_analyzed
            ),
            MessageFormat::Normal,
        );

        if not_analyzed != 0 {
            self.add_task(TaskEntry::error(format!(
                "{}: Not all files could be analyzed.",
                self.tool_name
            )));
            if self.needs_build_hint() {
                self.add_task(TaskEntry::error(format!(
                    "{}: You might need to build the project to generate or update source \
                     files. To build automatically, enable \"Build the project before \
                     starting analysis\".",
                    self.tool_name
                )));
            }
        }

        tracing::info!(analyzed, not_analyzed, "batch finalized");

        self.progress.finish();
        self.emit(BatchEvent::ProgressFinished);
        self.emit(BatchEvent::BatchFinished {
            analyzed,
            not_analyzed,
            success: self.success(),
        });
        self.output_dir = None;
    }

    /// Kill all active runners and drop the queue. No-op once terminal.
    pub fn stop(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        for (runner_id, mut runner) in self.active.drain() {
            tracing::debug!(runner_id, file = runner.file_to_analyze(), "terminating runner");
            runner.terminate();
        }
        self.queue.clear();
        self.state = BatchState::Stopped;
        self.finished_at = Some(Utc::now());

        tracing::info!(
            analyzed = self.results.analyzed_count(),
            not_analyzed = self.results.not_analyzed_count(),
            "batch stopped"
        );

        self.progress.finish();
        self.emit(BatchEvent::ProgressFinished);
        self.emit(BatchEvent::BatchStopped);
        self.output_dir = None;
    }

    /// User-initiated cancellation.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.progress.cancel();
        self.emit(BatchEvent::ProgressCanceled);
        self.stop();
    }

    /// Snapshot of the batch outcome.
    pub fn summary(&self) -> BatchSummary {
        let duration_ms = match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds().max(0) as u64,
            _ => 0,
        };

        BatchSummary {
            tool_name: self.tool_name.clone(),
            state: self.state,
            success: self.state == BatchState::Finalized && self.success(),
            analyzed_files: self.results.analyzed_files(),
            not_analyzed_files: self.results.not_analyzed_files(),
            total_items: self.progress.initial_count(),
            completed_items: self.progress.completed_count(),
            diagnostics_count: self.diagnostics_count,
            tasks: self.tasks.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            duration_ms,
        }
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    fn fill_pool(&mut self) {
        while self.state == BatchState::Running
            && self.active.len() < self.settings.parallel_jobs
            && !self.queue.is_empty()
        {
            self.dispatch_next();
        }
    }

    fn dispatch_next(&mut self) {
        if self.progress.is_finished() {
            return;
        }
        let Some(item) = self.queue.pop_front() else {
            return;
        };

        let runner_id = self.next_runner_id;
        self.next_runner_id += 1;

        let context = RunnerContext {
            runner_id,
            output_dir: self
                .output_dir
                .as_ref()
                .map(|dir| dir.path().to_path_buf())
                .unwrap_or_else(std::env::temp_dir),
            environment: self.environment.clone(),
            timeout: self.timeout,
        };
        let mut runner = item.factory.create(&item.unit, &context);
        tracing::debug!(runner_id, file = %item.unit.file_path, tool = runner.name(), "dispatching");

        let executable = runner.executable().to_path_buf();
        if !is_file_executable(&executable) {
            let message = format!(
                "{}: Invalid executable \"{}\". Stopped.",
                runner.name(),
                executable.display()
            );
            self.fail_batch(message);
            return;
        }

        let completion = CompletionSender::new(runner_id, self.completion_tx.clone());
        if !runner.run(completion) {
            let message = format!(
                "{}: Failed to start analysis of \"{}\". Stopped.",
                runner.name(),
                item.unit.file_path
            );
            self.fail_batch(message);
            return;
        }

        let tool_name = runner.name().to_string();
        self.active.insert(runner_id, runner);
        self.max_active = self.max_active.max(self.active.len());

        self.message(
            format!("Analyzing \"{}\" [{}].", item.unit.file_path, tool_name),
            MessageFormat::StdOut,
        );
        self.emit(BatchEvent::UnitStarted {
            file_path: item.unit.file_path,
            tool_name,
        });
    }

    // ------------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------------

    /// Fatal error while running: report and stop everything.
    fn fail_batch(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.success = false;
        self.add_task(TaskEntry::error(message.clone()));
        self.message(message.clone(), MessageFormat::Error);
        self.emit(BatchEvent::BatchFailed { message });
        self.stop();
    }

    /// Fatal error before any runner exists.
    fn fail_before_start(&mut self, message: &str) {
        self.success = false;
        self.add_task(TaskEntry::error(message));
        self.message(message.to_string(), MessageFormat::Error);
        self.emit(BatchEvent::BatchFailed {
            message: message.to_string(),
        });
        self.state = BatchState::Stopped;
        self.finished_at = Some(Utc::now());
    }

    fn needs_build_hint(&self) -> bool {
        if self.settings.build_before_analysis {
            return false;
        }
        match &self.settings.build_directory {
            Some(dir) => !dir.exists(),
            None => false,
        }
    }

    fn add_task(&mut self, task: TaskEntry) {
        self.tasks.push(task.clone());
        self.emit(BatchEvent::Task(task));
    }

    fn message(&self, text: String, format: MessageFormat) {
        self.emit(BatchEvent::Message { text, format });
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is listening.
            let _ = events.send(event);
        }
    }
}

impl Drop for BatchController {
    fn drop(&mut self) {
        for (_, mut runner) in self.active.drain() {
            runner.terminate();
        }
    }
}

/// Delete a temporary artifact; a missing file is fine.
fn remove_artifact(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), error = %e, "failed to remove artifact");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
