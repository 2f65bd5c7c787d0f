//! Tool Output Reader
//!
//! Reads the artifacts written by the analysis tools into diagnostics:
//! clang-tidy / clazy `--export-fixes` YAML documents and JSON diagnostic
//! arrays. Findings outside the project are dropped.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use analyze_batch_core::{
    CoreError, CoreResult, Diagnostic, DiagnosticLocation, DiagnosticSeverity,
};
use analyze_batch_scheduler::{OutputFormat, OutputReader};
use serde::Deserialize;

use crate::utils::error::AppResult;

// ============================================================================
// Export-fixes document
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExportFixes {
    #[serde(default)]
    main_source_file: Option<String>,
    #[serde(default)]
    diagnostics: Vec<ExportedDiagnostic>,
}

/// Newer tools nest the message; older ones put its fields at the top level.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExportedDiagnostic {
    diagnostic_name: String,
    #[serde(default)]
    diagnostic_message: Option<ExportedMessage>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    file_offset: Option<usize>,
    #[serde(default)]
    level: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExportedMessage {
    message: String,
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    file_offset: usize,
}

// ============================================================================
// Reader
// ============================================================================

/// `OutputReader` for tool artifacts on disk.
#[derive(Debug, Clone, Default)]
pub struct LogFileReader;

impl LogFileReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse an export-fixes document.
    pub fn read_yaml(&self, content: &str, source_file: &str) -> AppResult<Vec<Diagnostic>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let fixes: ExportFixes = serde_yaml::from_str(content)?;
        let main_file = fixes
            .main_source_file
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| source_file.to_string());

        let mut offsets = OffsetCache::default();
        let diagnostics = fixes
            .diagnostics
            .into_iter()
            .map(|exported| {
                let (message, file_path, offset) = match exported.diagnostic_message {
                    Some(nested) => (nested.message, nested.file_path, nested.file_offset),
                    None => (
                        exported.message.unwrap_or_default(),
                        exported.file_path.unwrap_or_default(),
                        exported.file_offset.unwrap_or_default(),
                    ),
                };
                let file_path = if file_path.is_empty() {
                    main_file.clone()
                } else {
                    file_path
                };
                let (line, column) = offsets.line_column(&file_path, offset);

                Diagnostic {
                    name: exported.diagnostic_name,
                    message,
                    location: DiagnosticLocation {
                        file_path,
                        line,
                        column,
                    },
                    severity: exported
                        .level
                        .as_deref()
                        .map(DiagnosticSeverity::from_level)
                        .unwrap_or_default(),
                }
            })
            .collect();

        Ok(diagnostics)
    }

    /// Parse a JSON diagnostic array.
    pub fn read_json(&self, content: &str) -> AppResult<Vec<Diagnostic>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(content)?)
    }
}

impl OutputReader for LogFileReader {
    fn read(
        &self,
        format: OutputFormat,
        output_path: &Path,
        source_file: &str,
        project_files: &HashSet<String>,
    ) -> CoreResult<Vec<Diagnostic>> {
        let content = fs::read_to_string(output_path).map_err(|e| {
            CoreError::not_found(format!("{}: {}", output_path.display(), e))
        })?;

        let diagnostics = match format {
            OutputFormat::Yaml => self.read_yaml(&content, source_file)?,
            OutputFormat::Json => self.read_json(&content)?,
        };

        let total = diagnostics.len();
        let kept = filter_project_diagnostics(diagnostics, source_file, project_files);
        tracing::debug!(
            file = source_file,
            total,
            kept = kept.len(),
            "read diagnostics"
        );
        Ok(kept)
    }
}

/// Keep diagnostics in the analyzed file or in known project files.
/// An empty `project_files` keeps everything.
pub fn filter_project_diagnostics(
    diagnostics: Vec<Diagnostic>,
    source_file: &str,
    project_files: &HashSet<String>,
) -> Vec<Diagnostic> {
    if project_files.is_empty() {
        return diagnostics;
    }
    diagnostics
        .into_iter()
        .filter(|d| {
            d.location.file_path == source_file || project_files.contains(&d.location.file_path)
        })
        .collect()
}

/// Maps byte offsets to 1-based line and column, reading each file once.
#[derive(Default)]
struct OffsetCache {
    line_starts: HashMap<String, Option<Vec<usize>>>,
}

impl OffsetCache {
    fn line_column(&mut self, file_path: &str, offset: usize) -> (u32, u32) {
        let starts = self
            .line_starts
            .entry(file_path.to_string())
            .or_insert_with(|| fs::read(file_path).ok().map(|bytes| line_starts(&bytes)));

        match starts {
            Some(starts) => {
                let line = starts.partition_point(|&start| start <= offset).max(1);
                let column = offset - starts[line - 1] + 1;
                (line as u32, column as u32)
            }
            None => (0, 0),
        }
    }
}

fn line_starts(bytes: &[u8]) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        bytes
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .map(|(i, _)| i + 1),
    );
    starts
}
