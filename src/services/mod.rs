//! Services
//!
//! Compilation database loading, tool output reading and batch execution.

pub mod analysis;
pub mod compilation_db;
pub mod log_reader;

pub use analysis::{AnalysisRequest, AnalysisService, PreparedBatch};
pub use compilation_db::{split_args, CompilationDatabase, ExtraOptions};
pub use log_reader::LogFileReader;
