//! Configuration Integration Tests
//!
//! Loading JSON and TOML configuration files and applying command-line overrides.

use std::fs;
use std::time::Duration;

use analyze_batch::storage::ConfigService;
use analyze_batch::{AppError, SettingsUpdate};
use analyze_batch_scheduler::TidyMode;

#[test]
fn test_json_config_with_overrides() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("analyze.json");
    fs::write(
        &path,
        r#"{
            "parallel_jobs": 2,
            "build_directory": "/work/build",
            "diagnostic_config": {
                "display_name": "Project checks",
                "tidy_mode": "file"
            },
            "executables": { "clang_tidy": "/opt/llvm/bin/clang-tidy" }
        }"#,
    )
    .unwrap();

    let mut service = ConfigService::load(Some(&path)).unwrap();
    assert_eq!(service.get_config().parallel_jobs, 2);
    assert_eq!(service.get_config().diagnostic_config.tidy_mode, TidyMode::File);
    assert_eq!(
        service.get_config().executables.clang_tidy,
        "/opt/llvm/bin/clang-tidy"
    );
    // Unset executables fall back to their defaults
    assert_eq!(service.get_config().executables.clang, "clang");

    let config = service
        .apply_overrides(SettingsUpdate {
            parallel_jobs: Some(8),
            timeout_secs: Some(90),
            ..Default::default()
        })
        .unwrap()
        .clone();
    assert_eq!(config.parallel_jobs, 8);
    assert_eq!(config.timeout(), Some(Duration::from_secs(90)));
    assert_eq!(config.run_settings().parallel_jobs, 8);

    // Overrides stay in memory
    let reloaded = ConfigService::load(Some(&path)).unwrap();
    assert_eq!(reloaded.get_config().parallel_jobs, 2);
}

#[test]
fn test_toml_config() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("analyze.toml");
    fs::write(
        &path,
        r#"
parallel_jobs = 4
build_before_analysis = true

[diagnostic_config]
display_name = "Qt checks"
tidy_mode = "disabled"
clazy_checks = "level0,level1"

[executables]
clazy_standalone = "/usr/bin/clazy-standalone"
"#,
    )
    .unwrap();

    let service = ConfigService::load(Some(&path)).unwrap();
    let config = service.get_config();
    assert_eq!(config.parallel_jobs, 4);
    assert!(config.build_before_analysis);
    assert!(!config.diagnostic_config.tidy_enabled());
    assert!(config.diagnostic_config.clazy_enabled());
    assert_eq!(
        config.executables.clazy_standalone.as_deref(),
        Some("/usr/bin/clazy-standalone")
    );
}

#[test]
fn test_malformed_config_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let json = temp.path().join("broken.json");
    fs::write(&json, "{ parallel_jobs: ").unwrap();
    assert!(matches!(
        ConfigService::load(Some(&json)).unwrap_err(),
        AppError::Serialization(_)
    ));

    let toml = temp.path().join("broken.toml");
    fs::write(&toml, "parallel_jobs = [").unwrap();
    assert!(matches!(
        ConfigService::load(Some(&toml)).unwrap_err(),
        AppError::Toml(_)
    ));
}

#[test]
fn test_empty_executable_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("analyze.json");
    fs::write(&path, r#"{"executables": {"clang_tidy": ""}}"#).unwrap();

    let err = ConfigService::load(Some(&path)).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(err.to_string().contains("clang_tidy"));
}
