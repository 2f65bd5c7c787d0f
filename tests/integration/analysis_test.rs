//! Analysis Integration Tests
//!
//! Full batches through `AnalysisService` with a scripted stand-in for
//! clang-tidy that writes export-fixes documents.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use analyze_batch::services::{AnalysisRequest, AnalysisService};
use analyze_batch::AppConfig;
use analyze_batch_core::{BatchEvent, MessageFormat};
use analyze_batch_scheduler::BatchState;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Helper Functions
// ============================================================================

/// Stand-in for clang-tidy: fails for files named `broken*`, sleeps for
/// `slow*`, writes nothing for `clean*` and otherwise reports one warning at
/// offset 0.
const FAKE_TIDY: &str = r#"#!/bin/sh
out=""
src=""
for arg in "$@"; do
  case "$arg" in
    --export-fixes=*) out="${arg#--export-fixes=}" ;;
    --) break ;;
    -*) ;;
    *) src="$arg" ;;
  esac
done
case "$src" in
  *broken*) echo "error: unknown type name 'foo'" >&2; exit 1 ;;
  *slow*) sleep 30 ;;
  *clean*) exit 0 ;;
esac
cat > "$out" <<EOF
---
MainSourceFile: '$src'
Diagnostics:
  - DiagnosticName: misc-fake-check
    DiagnosticMessage:
      Message: 'fake finding'
      FilePath: '$src'
      FileOffset: 0
      Replacements: []
    Level: Warning
...
EOF
"#;

fn write_tool(dir: &Path) -> PathBuf {
    let path = dir.join("fake-clang-tidy");
    fs::write(&path, FAKE_TIDY).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn create_project(temp: &TempDir, files: &[&str]) -> PathBuf {
    let src = temp.path().join("src");
    let build = temp.path().join("build");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&build).unwrap();

    let entries: Vec<serde_json::Value> = files
        .iter()
        .map(|name| {
            let file = src.join(name);
            fs::write(&file, "int x;\n").unwrap();
            serde_json::json!({
                "directory": build.to_string_lossy(),
                "file": file.to_string_lossy(),
                "arguments": ["c++", "-std=c++17", "-c", file.to_string_lossy()],
            })
        })
        .collect();
    let db = build.join("compile_commands.json");
    fs::write(&db, serde_json::to_string(&entries).unwrap()).unwrap();
    db
}

fn config_for(tool: &Path, jobs: usize) -> AppConfig {
    let mut config = AppConfig::default();
    config.parallel_jobs = jobs;
    config.executables.clang_tidy = tool.to_string_lossy().into_owned();
    config
}

fn drain(rx: &mut mpsc::UnboundedReceiver<BatchEvent>) -> Vec<BatchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_batch_analyzes_every_file() {
    let temp = TempDir::new().unwrap();
    let tool = write_tool(temp.path());
    let db = create_project(&temp, &["a.cpp", "b.cpp", "c.cpp"]);

    let service = AnalysisService::new(config_for(&tool, 2));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let summary = service
        .run(&AnalysisRequest::new(&db), tx, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.state, BatchState::Finalized);
    assert!(summary.success);
    assert_eq!(summary.analyzed_files.len(), 3);
    assert!(summary.not_analyzed_files.is_empty());
    assert_eq!(summary.diagnostics_count, 3);
    assert!(summary.started_at.is_some());
    assert!(summary.finished_at.is_some());

    let events = drain(&mut rx);
    assert!(matches!(
        events.first(),
        Some(BatchEvent::Message { text, format: MessageFormat::Normal })
            if text == "Running Clang-Tidy on build with configuration \"Default Clang-Tidy checks\"."
    ));
    assert!(events.contains(&BatchEvent::Message {
        text: "Clang-Tidy finished: Processed 3 files successfully, 0 failed.".to_string(),
        format: MessageFormat::Normal,
    }));
    let diagnostics: usize = events
        .iter()
        .map(|e| match e {
            BatchEvent::DiagnosticsAvailable { diagnostics, .. } => diagnostics.len(),
            _ => 0,
        })
        .sum();
    assert_eq!(diagnostics, 3);
}

#[tokio::test]
async fn test_failing_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let tool = write_tool(temp.path());
    let db = create_project(&temp, &["ok.cpp", "broken.cpp"]);

    let service = AnalysisService::new(config_for(&tool, 2));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let summary = service
        .run(&AnalysisRequest::new(&db), tx, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.state, BatchState::Finalized);
    assert!(!summary.success);
    assert_eq!(summary.analyzed_files.len(), 1);
    assert_eq!(summary.not_analyzed_files.len(), 1);
    assert!(summary.not_analyzed_files[0].ends_with("broken.cpp"));
    assert!(summary
        .tasks
        .iter()
        .any(|t| t.message == "Clang-Tidy: Not all files could be analyzed."));

    let failure = drain(&mut rx).into_iter().find_map(|e| match e {
        BatchEvent::UnitFailed {
            message, details, ..
        } => Some((message, details)),
        _ => None,
    });
    let (message, details) = failure.unwrap();
    assert_eq!(message, "Clang-Tidy exited with code 1");
    assert!(details.contains("unknown type name"));
}

#[tokio::test]
async fn test_file_without_findings_is_analyzed() {
    let temp = TempDir::new().unwrap();
    let tool = write_tool(temp.path());
    let db = create_project(&temp, &["clean.cpp", "a.cpp"]);

    let service = AnalysisService::new(config_for(&tool, 2));
    let (tx, _rx) = mpsc::unbounded_channel();
    let summary = service
        .run(&AnalysisRequest::new(&db), tx, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.state, BatchState::Finalized);
    assert!(summary.success);
    assert_eq!(summary.analyzed_files.len(), 2);
    assert!(summary.not_analyzed_files.is_empty());
    assert_eq!(summary.diagnostics_count, 1);
}

#[tokio::test]
async fn test_missing_tool_stops_batch() {
    let temp = TempDir::new().unwrap();
    let db = create_project(&temp, &["a.cpp", "b.cpp"]);
    let missing = temp.path().join("bin").join("clang-tidy");

    let service = AnalysisService::new(config_for(&missing, 2));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let summary = service
        .run(&AnalysisRequest::new(&db), tx, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.state, BatchState::Stopped);
    assert!(!summary.success);
    assert!(summary.analyzed_files.is_empty());

    let events = drain(&mut rx);
    let failed: Vec<&BatchEvent> = events
        .iter()
        .filter(|e| matches!(e, BatchEvent::BatchFailed { .. }))
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(!events
        .iter()
        .any(|e| matches!(e, BatchEvent::BatchFinished { .. })));
}

#[tokio::test]
async fn test_empty_database_finalizes() {
    let temp = TempDir::new().unwrap();
    let tool = write_tool(temp.path());
    let db = create_project(&temp, &[]);

    let service = AnalysisService::new(config_for(&tool, 2));
    let (tx, _rx) = mpsc::unbounded_channel();
    let summary = service
        .run(&AnalysisRequest::new(&db), tx, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.state, BatchState::Finalized);
    assert!(summary.success);
    assert_eq!(summary.total_items, 0);
}

#[tokio::test]
async fn test_timeout_marks_file_not_analyzed() {
    let temp = TempDir::new().unwrap();
    let tool = write_tool(temp.path());
    let db = create_project(&temp, &["slow.cpp", "fast.cpp"]);

    let mut config = config_for(&tool, 2);
    config.timeout_secs = 1;
    let service = AnalysisService::new(config);
    let (tx, _rx) = mpsc::unbounded_channel();
    let summary = service
        .run(&AnalysisRequest::new(&db), tx, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.state, BatchState::Finalized);
    assert_eq!(summary.analyzed_files.len(), 1);
    assert!(summary.not_analyzed_files[0].ends_with("slow.cpp"));
}

#[tokio::test]
async fn test_cancellation_stops_running_tools() {
    let temp = TempDir::new().unwrap();
    let tool = write_tool(temp.path());
    let db = create_project(&temp, &["slow1.cpp", "slow2.cpp", "slow3.cpp", "slow4.cpp"]);

    let service = AnalysisService::new(config_for(&tool, 2));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let summary = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        service.run(&AnalysisRequest::new(&db), tx, token),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(summary.state, BatchState::Stopped);
    assert!(summary.analyzed_files.is_empty());
    let events = drain(&mut rx);
    assert!(events.contains(&BatchEvent::ProgressCanceled));
    assert!(events.contains(&BatchEvent::BatchStopped));
}
