//! Compilation Database Integration Tests
//!
//! Loading `compile_commands.json` from disk and turning it into units.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use analyze_batch::services::{AnalysisRequest, AnalysisService, CompilationDatabase, ExtraOptions};
use analyze_batch::{AppConfig, AppError};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

/// Create `<temp>/build/compile_commands.json` for sources in `<temp>/src`.
fn create_project(temp: &TempDir, files: &[&str]) -> PathBuf {
    let src = temp.path().join("src");
    let build = temp.path().join("build");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&build).unwrap();

    let entries: Vec<serde_json::Value> = files
        .iter()
        .map(|name| {
            fs::write(src.join(name), "int main() { return 0; }\n").unwrap();
            serde_json::json!({
                "directory": build.to_string_lossy(),
                "file": format!("../src/{}", name),
                "command": format!("/usr/bin/c++ -DPROJECT -I../include -o {}.o -c ../src/{}", name, name),
            })
        })
        .collect();
    fs::write(
        build.join("compile_commands.json"),
        serde_json::to_string_pretty(&entries).unwrap(),
    )
    .unwrap();
    build
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_load_from_build_directory() {
    let temp = TempDir::new().unwrap();
    let build = create_project(&temp, &["a.cpp", "b.cpp"]);

    let database = CompilationDatabase::load(&build).unwrap();
    assert_eq!(database.entries().len(), 2);

    let units = database.units(None, &ExtraOptions::default()).unwrap();
    let expected_a = temp.path().join("src").join("a.cpp");
    assert_eq!(units[0].file_path, expected_a.to_string_lossy());
    assert_eq!(units[0].arguments, vec!["-DPROJECT", "-I../include"]);

    let project_files = database.project_files();
    assert!(project_files.contains(&units[1].file_path));
}

#[test]
fn test_extra_options_wrap_every_unit() {
    let temp = TempDir::new().unwrap();
    let build = create_project(&temp, &["a.cpp", "b.cpp"]);
    let database = CompilationDatabase::load(&build.join("compile_commands.json")).unwrap();

    let extra = ExtraOptions {
        prepend: vec!["-Wno-everything".to_string()],
        append: vec!["-DANALYZING".to_string()],
    };
    for unit in database.units(None, &extra).unwrap() {
        assert_eq!(unit.arguments.first().map(String::as_str), Some("-Wno-everything"));
        assert_eq!(unit.arguments.last().map(String::as_str), Some("-DANALYZING"));
    }
}

#[test]
fn test_file_filter_restricts_units() {
    let temp = TempDir::new().unwrap();
    let build = create_project(&temp, &["a.cpp", "b.cpp", "c.cpp"]);
    let database = CompilationDatabase::load(&build).unwrap();

    let wanted = temp.path().join("src").join("c.cpp").to_string_lossy().into_owned();
    let filter: HashSet<String> = [wanted.clone()].into_iter().collect();
    let units = database.units(Some(&filter), &ExtraOptions::default()).unwrap();

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].file_path, wanted);
    // The known project files still cover the whole database
    assert_eq!(database.project_files().len(), 3);
}

#[test]
fn test_prepare_through_service() {
    let temp = TempDir::new().unwrap();
    let build = create_project(&temp, &["main.cpp", "util.cpp"]);

    let service = AnalysisService::new(AppConfig::default());
    let request = AnalysisRequest::new(&build)
        .with_files(vec![temp.path().join("src").join("util.cpp")]);
    let prepared = service.prepare(&request).unwrap();

    assert_eq!(prepared.project_name, "build");
    assert_eq!(prepared.units.len(), 1);
    assert!(prepared.units[0].file_path.ends_with("util.cpp"));
    assert_eq!(prepared.project_files.len(), 2);
}

#[test]
fn test_malformed_database() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("compile_commands.json");
    fs::write(&path, "[{\"directory\": 1}]").unwrap();

    assert!(matches!(
        CompilationDatabase::load(&path).unwrap_err(),
        AppError::Serialization(_)
    ));
}
