//! Settings Models
//!
//! Application configuration and settings data structures.

use std::path::PathBuf;
use std::time::Duration;

use analyze_batch_scheduler::{default_parallel_jobs, DiagnosticConfig, RunSettings, ToolExecutables};
use serde::{Deserialize, Serialize};

/// Application configuration stored in config.json (or a TOML file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Maximum number of analysis processes alive at once
    #[serde(default = "default_parallel_jobs")]
    pub parallel_jobs: usize,
    /// Whether the project is built before analysis
    #[serde(default)]
    pub build_before_analysis: bool,
    /// Build output directory; used to hint at stale builds
    #[serde(default)]
    pub build_directory: Option<PathBuf>,
    /// Checks to run
    #[serde(default)]
    pub diagnostic_config: DiagnosticConfig,
    /// Tool executables
    #[serde(default)]
    pub executables: ToolExecutables,
    /// Per-file time limit in seconds, 0 for none
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            parallel_jobs: default_parallel_jobs(),
            build_before_analysis: false,
            build_directory: None,
            diagnostic_config: DiagnosticConfig::default(),
            executables: ToolExecutables::default(),
            timeout_secs: 0,
        }
    }
}

/// Settings overrides from the command line (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub parallel_jobs: Option<usize>,
    pub build_before_analysis: Option<bool>,
    pub build_directory: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(jobs) = update.parallel_jobs {
            self.parallel_jobs = jobs;
        }
        if let Some(build) = update.build_before_analysis {
            self.build_before_analysis = build;
        }
        if let Some(dir) = update.build_directory {
            self.build_directory = Some(dir);
        }
        if let Some(timeout) = update.timeout_secs {
            self.timeout_secs = timeout;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.parallel_jobs == 0 {
            return Err("parallel_jobs must be at least 1".to_string());
        }

        let executables = [
            ("clang_tidy", &self.executables.clang_tidy),
            ("clang", &self.executables.clang),
            ("clazy_plugin", &self.executables.clazy_plugin),
        ];
        for (name, value) in executables {
            if value.trim().is_empty() {
                return Err(format!("{} executable must not be empty", name));
            }
        }
        if let Some(standalone) = &self.executables.clazy_standalone {
            if standalone.trim().is_empty() {
                return Err("clazy_standalone executable must not be empty".to_string());
            }
        }

        if self.diagnostic_config.display_name.trim().is_empty() {
            return Err("diagnostic_config.display_name must not be empty".to_string());
        }

        Ok(())
    }

    /// Settings handed to the batch controller
    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            parallel_jobs: self.parallel_jobs,
            build_before_analysis: self.build_before_analysis,
            build_directory: self.build_directory.clone(),
        }
    }

    /// Per-runner timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
