//! Data Models
//!
//! Configuration and compilation database records.

pub mod compile_db;
pub mod settings;

pub use compile_db::*;
pub use settings::*;
