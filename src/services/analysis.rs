//! Analysis Service
//!
//! Glue between configuration, the compilation database and the batch
//! controller: selects the tools, builds the units and runs one batch.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use analyze_batch_core::{BatchEvent, MessageFormat};
use analyze_batch_scheduler::{
    runner_factories, tool_display_name, AnalyzeUnit, BatchController, BatchSummary, EventSender,
    RunnerFactory,
};
use tokio_util::sync::CancellationToken;

use crate::models::settings::AppConfig;
use crate::services::compilation_db::{CompilationDatabase, ExtraOptions};
use crate::services::log_reader::LogFileReader;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::resolve_against;

/// What to analyze.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// `compile_commands.json` or the directory holding it
    pub compile_commands: PathBuf,
    /// Restrict the batch to these files; empty means all
    pub files: Vec<PathBuf>,
}

impl AnalysisRequest {
    pub fn new(compile_commands: impl Into<PathBuf>) -> Self {
        Self {
            compile_commands: compile_commands.into(),
            files: Vec::new(),
        }
    }

    /// Only analyze the given files
    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }
}

/// Units and context for one batch.
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    pub project_name: String,
    pub units: Vec<AnalyzeUnit>,
    pub project_files: HashSet<String>,
}

/// Runs analysis batches for a configuration.
pub struct AnalysisService {
    config: AppConfig,
    factories: Vec<Arc<dyn RunnerFactory>>,
}

impl AnalysisService {
    /// Create a service; tool executables honor the environment overrides.
    pub fn new(config: AppConfig) -> Self {
        let executables = config.executables.clone().with_env_overrides();
        let factories = runner_factories(&config.diagnostic_config, &executables);
        Self { config, factories }
    }

    /// Replace the tool factories
    pub fn with_factories(mut self, factories: Vec<Arc<dyn RunnerFactory>>) -> Self {
        self.factories = factories;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// "Clang-Tidy", "Clazy" or "Clang-Tidy and Clazy"
    pub fn tool_name(&self) -> String {
        tool_display_name(&self.factories)
    }

    /// Load the compilation database and build the units.
    pub fn prepare(&self, request: &AnalysisRequest) -> AppResult<PreparedBatch> {
        let database = CompilationDatabase::load(&request.compile_commands)?;
        let extra = ExtraOptions::from_env()?;

        let filter = if request.files.is_empty() {
            None
        } else {
            let cwd = std::env::current_dir()?;
            Some(
                request
                    .files
                    .iter()
                    .map(|f| resolve_against(&cwd, &f.to_string_lossy()).to_string_lossy().into_owned())
                    .collect::<HashSet<String>>(),
            )
        };

        let units = database.units(filter.as_ref(), &extra)?;
        if let Some(filter) = &filter {
            if units.len() < filter.len() {
                tracing::warn!(
                    requested = filter.len(),
                    found = units.len(),
                    "some requested files are not in the compilation database"
                );
            }
        }

        Ok(PreparedBatch {
            project_name: project_name(&request.compile_commands),
            units,
            project_files: database.project_files(),
        })
    }

    /// Run one batch to its end.
    ///
    /// Progress and results are reported through `events`; cancelling `token`
    /// stops the batch.
    pub async fn run(
        &self,
        request: &AnalysisRequest,
        events: EventSender,
        token: CancellationToken,
    ) -> AppResult<BatchSummary> {
        let prepared = self.prepare(request)?;
        self.run_prepared(prepared, events, token).await
    }

    /// Run a batch over already prepared units.
    pub async fn run_prepared(
        &self,
        prepared: PreparedBatch,
        events: EventSender,
        token: CancellationToken,
    ) -> AppResult<BatchSummary> {
        let tool_name = self.tool_name();
        if self.factories.is_empty() {
            return Err(AppError::config(
                "no analysis tool enabled in the diagnostic configuration",
            ));
        }

        let _ = events.send(BatchEvent::Message {
            text: format!(
                "Running {} on {} with configuration \"{}\".",
                tool_name, prepared.project_name, self.config.diagnostic_config.display_name
            ),
            format: MessageFormat::Normal,
        });
        tracing::info!(
            tool = %tool_name,
            project = %prepared.project_name,
            units = prepared.units.len(),
            parallel_jobs = self.config.parallel_jobs,
            "starting analysis"
        );

        let mut controller =
            BatchController::new(tool_name, self.config.run_settings(), Arc::new(LogFileReader::new()))
                .with_events(events)
                .with_project_files(prepared.project_files)
                .with_cancellation_token(token);
        if let Some(timeout) = self.config.timeout() {
            controller = controller.with_timeout(timeout);
        }

        let summary = controller.execute(&prepared.units, &self.factories).await?;
        Ok(summary)
    }
}

/// Name shown for the project: the directory holding the compilation database.
fn project_name(compile_commands: &Path) -> String {
    let dir = if compile_commands.is_dir() {
        compile_commands
    } else {
        compile_commands.parent().unwrap_or(compile_commands)
    };
    let absolute = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
    absolute
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| absolute.display().to_string())
}
