//! Cross-Platform Path Utilities
//!
//! Functions for resolving application directories across platforms.
//! Handles ~/.analyze-batch/ and path normalization for compilation databases.

use std::path::{Component, Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the application directory (~/.analyze-batch/)
pub fn app_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".analyze-batch"))
}

/// Get the config file path (~/.analyze-batch/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(app_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the application directory, creating if it doesn't exist
pub fn ensure_app_dir() -> AppResult<PathBuf> {
    let path = app_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}

/// Lexically normalize a path: drop `.` and resolve `..` without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Resolve `file` against `directory` unless already absolute, then normalize.
pub fn resolve_against(directory: &Path, file: &str) -> PathBuf {
    let file = Path::new(file);
    if file.is_absolute() {
        normalize_path(file)
    } else {
        normalize_path(&directory.join(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_dir() {
        let dir = app_dir();
        assert!(dir.is_ok());
        assert!(dir.unwrap().to_string_lossy().contains(".analyze-batch"));
    }

    #[test]
    fn test_config_path() {
        let path = config_path().unwrap();
        assert!(path.to_string_lossy().ends_with("config.json"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/src/./lib/../main.cpp")),
            PathBuf::from("/src/main.cpp")
        );
    }

    #[test]
    fn test_resolve_against() {
        let dir = Path::new("/work/build");
        assert_eq!(
            resolve_against(dir, "../src/a.cpp"),
            PathBuf::from("/work/src/a.cpp")
        );
        assert_eq!(resolve_against(dir, "/abs/b.cpp"), PathBuf::from("/abs/b.cpp"));
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
