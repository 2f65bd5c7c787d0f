//! Storage Layer
//!
//! Handles configuration persistence (JSON or TOML).

pub mod config;

pub use config::*;
