//! analyze-batch Core
//!
//! Foundational types shared by the analyze-batch workspace crates. This crate
//! has no dependency on process spawning, configuration files or the CLI.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `diagnostic` - Tool-agnostic diagnostic records
//! - `events` - Events emitted by the batch controller

pub mod diagnostic;
pub mod error;
pub mod events;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Diagnostics ────────────────────────────────────────────────────────
pub use diagnostic::{Diagnostic, DiagnosticLocation, DiagnosticSeverity};

// ── Events ─────────────────────────────────────────────────────────────
pub use events::{BatchEvent, MessageFormat, TaskEntry, TaskSeverity};
