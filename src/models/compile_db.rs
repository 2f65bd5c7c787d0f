//! Compilation Database Models
//!
//! Entries of a `compile_commands.json` file.

use serde::{Deserialize, Serialize};

/// One entry of a compilation database.
///
/// Either `arguments` or `command` is present; `arguments` wins when both are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileCommand {
    /// Working directory of the compiler invocation
    pub directory: String,
    /// Source file, absolute or relative to `directory`
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}
