//! Output Reader Integration Tests
//!
//! Reading export-fixes artifacts from disk, with offsets resolved against
//! the real source file.

use std::collections::HashSet;
use std::fs;

use analyze_batch::LogFileReader;
use analyze_batch_core::{CoreError, DiagnosticSeverity};
use analyze_batch_scheduler::{OutputFormat, OutputReader};

#[test]
fn test_read_export_fixes_with_locations() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("widget.cpp");
    let header = temp.path().join("widget.h");
    fs::write(&source, "#include \"widget.h\"\n\nvoid f() {\n    int *p = 0;\n}\n").unwrap();
    fs::write(&header, "#pragma once\n").unwrap();
    let source = source.to_string_lossy().into_owned();

    // Offset 45 is the `0` on line 4.
    let artifact = temp.path().join("widget.cpp-1.yaml");
    fs::write(
        &artifact,
        format!(
            "---\nMainSourceFile: '{src}'\nDiagnostics:\n  - DiagnosticName: modernize-use-nullptr\n    DiagnosticMessage:\n      Message: use nullptr\n      FilePath: '{src}'\n      FileOffset: 45\n      Replacements: []\n    Level: Warning\n  - DiagnosticName: clazy-foo\n    DiagnosticMessage:\n      Message: outside\n      FilePath: '/usr/include/vector'\n      FileOffset: 0\n    Level: Error\n...\n",
            src = source
        ),
    )
    .unwrap();

    let project_files: HashSet<String> = [header.to_string_lossy().into_owned()]
        .into_iter()
        .collect();
    let diagnostics = LogFileReader::new()
        .read(OutputFormat::Yaml, &artifact, &source, &project_files)
        .unwrap();

    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.name, "modernize-use-nullptr");
    assert_eq!(diagnostic.severity, DiagnosticSeverity::Warning);
    assert_eq!(diagnostic.location.file_path, source);
    assert_eq!(diagnostic.location.line, 4);
    assert_eq!(diagnostic.location.column, 14);
}

#[test]
fn test_read_json_artifact() {
    let temp = tempfile::tempdir().unwrap();
    let artifact = temp.path().join("a.json");
    fs::write(
        &artifact,
        r#"[{"name": "bugprone-x", "message": "m", "location": {"filePath": "/src/a.cpp", "line": 2, "column": 7}, "severity": "error"}]"#,
    )
    .unwrap();

    let diagnostics = LogFileReader::new()
        .read(OutputFormat::Json, &artifact, "/src/a.cpp", &HashSet::new())
        .unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, DiagnosticSeverity::Error);
    assert_eq!(diagnostics[0].location.line, 2);
}

#[test]
fn test_malformed_artifact_is_error() {
    let temp = tempfile::tempdir().unwrap();
    let artifact = temp.path().join("a.yaml");
    fs::write(&artifact, "Diagnostics:\n  - DiagnosticName: [unclosed\n").unwrap();

    let err = LogFileReader::new()
        .read(OutputFormat::Yaml, &artifact, "/src/a.cpp", &HashSet::new())
        .unwrap_err();
    assert!(matches!(err, CoreError::Parse(_)));
}
