//! Diagnostic Records
//!
//! Tool-agnostic diagnostic records produced by output readers and forwarded
//! by the scheduler. The scheduler never interprets them.

use serde::{Deserialize, Serialize};

/// Severity reported by an analysis tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Note,
    Remark,
    Warning,
    Error,
    Fatal,
}

impl DiagnosticSeverity {
    /// Parse a tool level string ("Warning", "error", ...). Unknown levels map to warning.
    pub fn from_level(level: &str) -> Self {
        match level.to_ascii_lowercase().as_str() {
            "note" => DiagnosticSeverity::Note,
            "remark" => DiagnosticSeverity::Remark,
            "error" => DiagnosticSeverity::Error,
            "fatal" => DiagnosticSeverity::Fatal,
            _ => DiagnosticSeverity::Warning,
        }
    }
}

impl Default for DiagnosticSeverity {
    fn default() -> Self {
        DiagnosticSeverity::Warning
    }
}

impl std::fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticSeverity::Note => write!(f, "note"),
            DiagnosticSeverity::Remark => write!(f, "remark"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Fatal => write!(f, "fatal"),
        }
    }
}

/// Source position of a diagnostic. Lines and columns are 1-based; 0 means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticLocation {
    pub file_path: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

/// A single finding reported by an analysis tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Check name (e.g. "modernize-use-nullptr")
    pub name: String,
    /// Human-readable message
    pub message: String,
    /// Where the finding points to
    pub location: DiagnosticLocation,
    #[serde(default)]
    pub severity: DiagnosticSeverity,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {} [{}]",
            self.location.file_path,
            self.location.line,
            self.location.column,
            self.severity,
            self.message,
            self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_level() {
        assert_eq!(DiagnosticSeverity::from_level("Warning"), DiagnosticSeverity::Warning);
        assert_eq!(DiagnosticSeverity::from_level("Error"), DiagnosticSeverity::Error);
        assert_eq!(DiagnosticSeverity::from_level("note"), DiagnosticSeverity::Note);
        assert_eq!(DiagnosticSeverity::from_level("bogus"), DiagnosticSeverity::Warning);
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic {
            name: "modernize-use-nullptr".to_string(),
            message: "use nullptr".to_string(),
            location: DiagnosticLocation {
                file_path: "/src/main.cpp".to_string(),
                line: 12,
                column: 5,
            },
            severity: DiagnosticSeverity::Warning,
        };
        assert_eq!(
            diagnostic.to_string(),
            "/src/main.cpp:12:5: warning: use nullptr [modernize-use-nullptr]"
        );
    }

    #[test]
    fn test_diagnostic_json_defaults() {
        let json = r#"{"name":"a","message":"b","location":{"filePath":"/x.cpp"}}"#;
        let diagnostic: Diagnostic = serde_json::from_str(json).unwrap();
        assert_eq!(diagnostic.location.line, 0);
        assert_eq!(diagnostic.severity, DiagnosticSeverity::Warning);
    }
}
