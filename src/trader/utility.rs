//! General utility functions.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Name of the application folder holding settings and logs
pub const APP_FOLDER_NAME: &str = ".backtest_chart";

/// Resolve the application folder.
///
/// A folder named `.backtest_chart` in the working directory wins; otherwise
/// it is created under the user's home directory.
fn get_app_dir(folder_name: &str) -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let local_path = cwd.join(folder_name);
    if local_path.exists() {
        return local_path;
    }

    let home_path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let app_path = home_path.join(folder_name);
    if !app_path.exists() {
        let _ = fs::create_dir_all(&app_path);
    }
    app_path
}

/// Application directory
pub static APP_DIR: LazyLock<PathBuf> = LazyLock::new(|| get_app_dir(APP_FOLDER_NAME));

/// Get path for a file inside the application folder
pub fn get_file_path(filename: &str) -> PathBuf {
    APP_DIR.join(filename)
}

/// Get path for a sub folder of the application folder, creating it if needed
pub fn get_folder_path(folder_name: &str) -> PathBuf {
    ensure_folder(&APP_DIR.join(folder_name))
}

fn ensure_folder(path: &Path) -> PathBuf {
    if !path.exists() {
        let _ = fs::create_dir_all(path);
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_path_in_app_dir() {
        let path = get_file_path("chart_setting.json");
        assert!(path.ends_with("chart_setting.json"));
        assert_eq!(path.parent(), Some(APP_DIR.as_path()));
    }

    #[test]
    fn test_ensure_folder_creates() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("log");
        assert!(!target.exists());
        ensure_folder(&target);
        assert!(target.exists());
    }
}
