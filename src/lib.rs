//! analyze-batch
//!
//! Runs clang-tidy and clazy over the files of a compilation database with a
//! bounded number of concurrent processes. It includes:
//! - Configuration (JSON or TOML) and command-line overrides
//! - Compilation database loading
//! - Tool output reading (export-fixes YAML, JSON)
//! - The analysis service driving one batch
//!
//! The scheduling itself lives in the `analyze-batch-scheduler` crate.

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::settings::{AppConfig, SettingsUpdate};
pub use services::{AnalysisRequest, AnalysisService, CompilationDatabase, LogFileReader};
pub use storage::config::ConfigService;
pub use utils::error::{AppError, AppResult};
