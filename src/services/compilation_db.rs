//! Compilation Database
//!
//! Turns `compile_commands.json` entries into analysis units. Each unit keeps
//! the compile flags of its entry with the compiler, `-c`, `-o <out>` and the
//! source path removed, wrapped by the extra options from the environment.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use analyze_batch_scheduler::AnalyzeUnit;

use crate::models::compile_db::CompileCommand;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::resolve_against;

/// Arguments placed before every unit's compile flags.
pub const CMD_PREPEND_ENV: &str = "ANALYZE_BATCH_CMD_PREPEND";
/// Arguments placed after every unit's compile flags.
pub const CMD_APPEND_ENV: &str = "ANALYZE_BATCH_CMD_APPEND";

// ============================================================================
// Extra options
// ============================================================================

/// Extra arguments wrapped around every unit's compile flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraOptions {
    pub prepend: Vec<String>,
    pub append: Vec<String>,
}

impl ExtraOptions {
    /// Read both environment variables.
    pub fn from_env() -> AppResult<Self> {
        let prepend = env_options(CMD_PREPEND_ENV)?;
        if !prepend.is_empty() {
            tracing::warn!(options = ?prepend, "analysis options are prepended");
        }
        let append = env_options(CMD_APPEND_ENV)?;
        if !append.is_empty() {
            tracing::warn!(options = ?append, "analysis options are appended");
        }
        Ok(Self { prepend, append })
    }

    /// `prepend + arguments + append`
    pub fn wrap(&self, arguments: Vec<String>) -> Vec<String> {
        let mut wrapped = Vec::with_capacity(self.prepend.len() + arguments.len() + self.append.len());
        wrapped.extend(self.prepend.iter().cloned());
        wrapped.extend(arguments);
        wrapped.extend(self.append.iter().cloned());
        wrapped
    }
}

fn env_options(name: &str) -> AppResult<Vec<String>> {
    match std::env::var(name) {
        Ok(value) => split_args(&value)
            .map_err(|e| AppError::config(format!("{}: {}", name, e))),
        Err(_) => Ok(Vec::new()),
    }
}

/// Split a command line into arguments using shell quoting rules.
pub fn split_args(input: &str) -> AppResult<Vec<String>> {
    shell_words::split(input).map_err(|e| AppError::validation(e.to_string()))
}

// ============================================================================
// Database
// ============================================================================

/// A loaded compilation database.
#[derive(Debug, Clone, Default)]
pub struct CompilationDatabase {
    entries: Vec<CompileCommand>,
}

impl CompilationDatabase {
    /// Load `compile_commands.json`, or the file of that name inside a directory.
    pub fn load(path: &Path) -> AppResult<Self> {
        let path: PathBuf = if path.is_dir() {
            path.join("compile_commands.json")
        } else {
            path.to_path_buf()
        };
        if !path.exists() {
            return Err(AppError::not_found(format!(
                "compilation database {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(&path)?;
        let entries: Vec<CompileCommand> = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), entries = entries.len(), "loaded compilation database");
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<CompileCommand>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CompileCommand] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Absolute paths of every source file in the database.
    pub fn project_files(&self) -> HashSet<String> {
        self.entries.iter().map(entry_file).collect()
    }

    /// Build one unit per distinct source file, in database order.
    ///
    /// When `filter` is given only files in it are kept.
    pub fn units(
        &self,
        filter: Option<&HashSet<String>>,
        extra: &ExtraOptions,
    ) -> AppResult<Vec<AnalyzeUnit>> {
        let mut seen = HashSet::new();
        let mut units = Vec::new();

        for entry in &self.entries {
            let file = entry_file(entry);
            if let Some(filter) = filter {
                if !filter.contains(&file) {
                    continue;
                }
            }
            if !seen.insert(file.clone()) {
                tracing::debug!(file = %file, "skipping duplicate compile command");
                continue;
            }

            let raw = match (&entry.arguments, &entry.command) {
                (Some(arguments), _) => arguments.clone(),
                (None, Some(command)) => split_args(command)?,
                (None, None) => {
                    return Err(AppError::validation(format!(
                        "compile command for {} has neither arguments nor command",
                        entry.file
                    )))
                }
            };

            let flags = strip_compile_arguments(&raw, &entry.file, &file);
            units.push(AnalyzeUnit::new(file, extra.wrap(flags)));
        }

        Ok(units)
    }
}

fn entry_file(entry: &CompileCommand) -> String {
    resolve_against(Path::new(&entry.directory), &entry.file)
        .to_string_lossy()
        .into_owned()
}

/// Drop the compiler, `-c`, `-o <out>` and the source file from a compile command.
pub fn strip_compile_arguments(arguments: &[String], raw_file: &str, resolved_file: &str) -> Vec<String> {
    let mut flags = Vec::with_capacity(arguments.len());
    let mut iter = arguments.iter().skip(1);

    while let Some(arg) = iter.next() {
        if arg == "-c" || arg == raw_file || arg == resolved_file {
            continue;
        }
        if arg == "-o" {
            iter.next();
            continue;
        }
        if arg.starts_with("-o") && arg.len() > 2 {
            continue;
        }
        flags.push(arg.clone());
    }

    flags
}
