//! Integration Tests Module
//!
//! End-to-end tests for analyze-batch: configuration loading, compilation
//! database handling, output reading and full batches against fake tools.

// Configuration file and override tests
mod config_test;

// Compilation database loading tests
mod compilation_db_test;

// Export-fixes reading tests
mod log_reader_test;

// Full batch runs with scripted tools (unix only)
#[cfg(unix)]
mod analysis_test;
