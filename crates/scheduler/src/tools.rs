//! Analysis Tool Variants
//!
//! Diagnostic configuration, executable settings and the runner factories for
//! each supported tool. Which factories apply is decided here, once, before the
//! queue is built.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{AnalyzeUnit, OutputFormat, ToolKind};
use crate::runner::{
    resolve_executable, CommandSpec, ProcessRunner, RunnerContext, RunnerFactory, RunnerHandle,
};

/// Environment variable switching clazy to standalone mode.
pub const CLAZY_STANDALONE_ENV: &str = "ANALYZE_BATCH_CLAZY_STANDALONE";

// ============================================================================
// Configuration
// ============================================================================

/// How clang-tidy picks its checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TidyMode {
    /// clang-tidy is not run
    Disabled,
    /// Checks come from `tidy_checks`
    Checks,
    /// Checks come from the nearest `.clang-tidy` file
    File,
}

impl Default for TidyMode {
    fn default() -> Self {
        TidyMode::Checks
    }
}

/// Named set of checks to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticConfig {
    /// Name shown in the start message
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default)]
    pub tidy_mode: TidyMode,
    /// clang-tidy `-checks=` value
    #[serde(default)]
    pub tidy_checks: String,
    /// Comma separated clazy checks; empty disables clazy
    #[serde(default)]
    pub clazy_checks: String,
}

fn default_display_name() -> String {
    "Default Clang-Tidy checks".to_string()
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            tidy_mode: TidyMode::Checks,
            tidy_checks: "-*,bugprone-*,performance-*".to_string(),
            clazy_checks: String::new(),
        }
    }
}

impl DiagnosticConfig {
    pub fn tidy_enabled(&self) -> bool {
        self.tidy_mode != TidyMode::Disabled
    }

    pub fn clazy_enabled(&self) -> bool {
        !self.clazy_checks.trim().is_empty()
    }
}

/// Executable names or paths for every tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutables {
    #[serde(default = "default_clang_tidy")]
    pub clang_tidy: String,
    /// When set, clazy runs standalone with this executable
    #[serde(default)]
    pub clazy_standalone: Option<String>,
    /// Compiler hosting the clazy plugin
    #[serde(default = "default_clang")]
    pub clang: String,
    #[serde(default = "default_clazy_plugin")]
    pub clazy_plugin: String,
}

fn default_clang_tidy() -> String {
    "clang-tidy".to_string()
}

fn default_clang() -> String {
    "clang".to_string()
}

fn default_clazy_plugin() -> String {
    "ClazyPlugin.so".to_string()
}

impl Default for ToolExecutables {
    fn default() -> Self {
        Self {
            clang_tidy: default_clang_tidy(),
            clazy_standalone: None,
            clang: default_clang(),
            clazy_plugin: default_clazy_plugin(),
        }
    }
}

impl ToolExecutables {
    /// Apply the standalone clazy override from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var(CLAZY_STANDALONE_ENV) {
            if !path.trim().is_empty() {
                self.clazy_standalone = Some(path);
            }
        }
        self
    }
}

// ============================================================================
// Factories
// ============================================================================

/// Factory for one tool variant.
#[derive(Debug, Clone)]
pub struct ToolRunnerFactory {
    kind: ToolKind,
    executable: String,
    diagnostic_config: DiagnosticConfig,
    clazy_plugin: String,
}

impl ToolRunnerFactory {
    pub fn new(kind: ToolKind, executable: impl Into<String>, config: DiagnosticConfig) -> Self {
        Self {
            kind,
            executable: executable.into(),
            diagnostic_config: config,
            clazy_plugin: default_clazy_plugin(),
        }
    }

    /// Set the plugin library loaded by the plugin-hosted variant
    pub fn with_clazy_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.clazy_plugin = plugin.into();
        self
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    /// Build the argument list for a unit and artifact path.
    pub fn arguments(&self, unit: &AnalyzeUnit, output_path: &std::path::Path) -> Vec<String> {
        let output = output_path.display().to_string();
        let mut args = Vec::new();

        match self.kind {
            ToolKind::ClangTidy => {
                if self.diagnostic_config.tidy_mode == TidyMode::Checks
                    && !self.diagnostic_config.tidy_checks.is_empty()
                {
                    args.push(format!("-checks={}", self.diagnostic_config.tidy_checks));
                }
                args.push(format!("--export-fixes={}", output));
                args.push(unit.file_path.clone());
                args.push("--".to_string());
                args.extend(unit.arguments.iter().cloned());
            }
            ToolKind::ClazyStandalone => {
                args.push(format!("-checks={}", self.diagnostic_config.clazy_checks));
                args.push(format!("-export-fixes={}", output));
                args.push(unit.file_path.clone());
                args.push("--".to_string());
                args.extend(unit.arguments.iter().cloned());
            }
            ToolKind::ClazyPlugin => {
                args.extend(unit.arguments.iter().cloned());
                args.push("-fsyntax-only".to_string());
                for plugin_arg in [
                    "-load".to_string(),
                    self.clazy_plugin.clone(),
                    "-add-plugin".to_string(),
                    "clazy".to_string(),
                    "-plugin-arg-clazy".to_string(),
                    self.diagnostic_config.clazy_checks.clone(),
                    "-plugin-arg-clazy".to_string(),
                    format!("export-fixes={}", output),
                ] {
                    args.push("-Xclang".to_string());
                    args.push(plugin_arg);
                }
                args.push(unit.file_path.clone());
            }
        }

        args
    }
}

impl RunnerFactory for ToolRunnerFactory {
    fn name(&self) -> &str {
        self.kind.display_name()
    }

    fn create(&self, unit: &AnalyzeUnit, context: &RunnerContext) -> Box<dyn RunnerHandle> {
        let output_path = context.output_file_for(unit, OutputFormat::Yaml);
        let spec = CommandSpec {
            tool_name: self.kind.display_name().to_string(),
            executable: resolve_executable(&self.executable),
            arguments: self.arguments(unit, &output_path),
            output_path,
            output_format: OutputFormat::Yaml,
            environment: context.environment.clone(),
            timeout: context.timeout,
        };
        Box::new(ProcessRunner::new(spec, unit.file_path.clone()))
    }
}

/// Select the factories that apply to a diagnostic configuration.
///
/// clang-tidy runs unless disabled; clazy runs when it has checks, standalone
/// when an executable is configured and hosted in the compiler otherwise.
pub fn runner_factories(
    config: &DiagnosticConfig,
    executables: &ToolExecutables,
) -> Vec<Arc<dyn RunnerFactory>> {
    let mut factories: Vec<Arc<dyn RunnerFactory>> = Vec::new();

    if config.tidy_enabled() {
        factories.push(Arc::new(ToolRunnerFactory::new(
            ToolKind::ClangTidy,
            executables.clang_tidy.clone(),
            config.clone(),
        )));
    }

    if config.clazy_enabled() {
        match &executables.clazy_standalone {
            Some(standalone) => factories.push(Arc::new(ToolRunnerFactory::new(
                ToolKind::ClazyStandalone,
                standalone.clone(),
                config.clone(),
            ))),
            None => factories.push(Arc::new(
                ToolRunnerFactory::new(ToolKind::ClazyPlugin, executables.clang.clone(), config.clone())
                    .with_clazy_plugin(executables.clazy_plugin.clone()),
            )),
        }
    }

    factories
}

/// Display name for the set of factories, e.g. "Clang-Tidy and Clazy".
pub fn tool_display_name(factories: &[Arc<dyn RunnerFactory>]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for factory in factories {
        if !names.contains(&factory.name()) {
            names.push(factory.name());
        }
    }
    if names.is_empty() {
        "Clang Tools".to_string()
    } else {
        names.join(" and ")
    }
}
