//! Utilities
//!
//! Error types and path helpers shared by the services.

pub mod error;
pub mod paths;

pub use error::{AppError, AppResult};
pub use paths::*;
