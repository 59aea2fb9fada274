//! Path utilities for tether
//!
//! Handles XDG Base Directory specification compliance for config,
//! state and runtime directories, plus the location of the on-disk
//! companion discovery record.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Application identifier for XDG directories
const APP_NAME: &str = "tether";

/// Longest sanitized workspace component kept in a discovery file name.
/// Collisions are harmless: the record embeds the workspace path and the
/// resolver rejects a record naming a different workspace.
const MAX_DISCOVERY_STEM: usize = 96;

/// Get project directories (cached)
fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the runtime directory
///
/// Location: `$XDG_RUNTIME_DIR/tether` or `/tmp/tether-$UID`
pub fn runtime_dir() -> PathBuf {
    if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(xdg_runtime).join(APP_NAME)
    } else {
        // Fallback to /tmp with UID for security
        // SAFETY: getuid() is always safe to call
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/{}-{}", APP_NAME, uid))
    }
}

/// Get the directory holding companion discovery records
///
/// Location: `$XDG_RUNTIME_DIR/tether/ide`
pub fn discovery_dir() -> PathBuf {
    runtime_dir().join("ide")
}

/// Get the discovery record path for a workspace
///
/// The file name is derived from the workspace path so that companions
/// serving different workspaces never overwrite each other's records.
pub fn discovery_file(workspace: &Path) -> PathBuf {
    discovery_dir().join(format!("{}.json", sanitize_stem(workspace)))
}

/// Get the configuration directory
///
/// Location: `$XDG_CONFIG_HOME/tether` or `~/.config/tether`
pub fn config_dir() -> PathBuf {
    project_dirs()
        .map(|p| p.config_dir().to_path_buf())
        .unwrap_or_else(fallback_config_dir)
}

/// Get the main configuration file path
///
/// Location: `$XDG_CONFIG_HOME/tether/config.toml`
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the state directory (persistent state)
///
/// Location: `$XDG_STATE_HOME/tether` or `~/.local/state/tether`
pub fn state_dir() -> PathBuf {
    project_dirs()
        .and_then(|p| p.state_dir().map(|d| d.to_path_buf()))
        .unwrap_or_else(fallback_state_dir)
}

/// Get the log directory
///
/// Location: `$XDG_STATE_HOME/tether/log` or `~/.local/state/tether/log`
pub fn log_dir() -> PathBuf {
    state_dir().join("log")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &PathBuf) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Map a workspace path onto a filesystem-safe file stem.
///
/// Keeps the trailing characters when the path is long: the tail carries
/// the project directory name, which is what distinguishes workspaces.
fn sanitize_stem(workspace: &Path) -> String {
    let sanitized: String = workspace
        .to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();

    let start = sanitized.len().saturating_sub(MAX_DISCOVERY_STEM);
    sanitized[start..].to_string()
}

// Fallback implementations when ProjectDirs is unavailable

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn fallback_config_dir() -> PathBuf {
    home_dir().join(".config").join(APP_NAME)
}

fn fallback_state_dir() -> PathBuf {
    home_dir().join(".local").join("state").join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Runtime Dir Tests ====================

    #[test]
    fn test_runtime_dir_contains_tether() {
        let path = runtime_dir();
        assert!(path.to_string_lossy().contains("tether"));
    }

    // ==================== Discovery Path Tests ====================

    #[test]
    fn test_discovery_dir_is_under_runtime() {
        assert!(discovery_dir().starts_with(runtime_dir()));
    }

    #[test]
    fn test_discovery_file_is_json() {
        let path = discovery_file(Path::new("/home/user/project"));
        assert!(path.to_string_lossy().ends_with(".json"));
        assert!(path.starts_with(discovery_dir()));
    }

    #[test]
    fn test_discovery_file_is_deterministic() {
        let a = discovery_file(Path::new("/home/user/project"));
        let b = discovery_file(Path::new("/home/user/project"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_discovery_file_distinguishes_workspaces() {
        let a = discovery_file(Path::new("/home/user/project-a"));
        let b = discovery_file(Path::new("/home/user/project-b"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_sanitize_stem_has_no_separators() {
        let stem = sanitize_stem(Path::new("/home/user/my project/sub:dir"));
        assert!(!stem.contains('/'));
        assert!(!stem.contains(' '));
        assert!(!stem.contains(':'));
    }

    #[test]
    fn test_sanitize_stem_keeps_trailing_segment() {
        let long_prefix = "/very/deep".repeat(30);
        let stem = sanitize_stem(Path::new(&format!("{long_prefix}/my-project")));
        assert!(stem.len() <= MAX_DISCOVERY_STEM);
        assert!(stem.ends_with("my-project"));
    }

    // ==================== Config Path Tests ====================

    #[test]
    fn test_config_file_is_toml() {
        let path = config_file();
        assert!(path.to_string_lossy().ends_with(".toml"));
    }

    #[test]
    fn test_config_file_in_config_dir() {
        assert!(config_file().starts_with(config_dir()));
    }

    // ==================== Log Dir Tests ====================

    #[test]
    fn test_log_dir_is_under_state() {
        assert!(log_dir().starts_with(state_dir()));
    }

    #[test]
    fn test_log_dir_name() {
        assert_eq!(log_dir().file_name().unwrap().to_str().unwrap(), "log");
    }

    // ==================== ensure_dir Tests ====================

    #[test]
    fn test_ensure_dir_creates_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("nested").join("deep");

        ensure_dir(&test_dir).unwrap();
        assert!(test_dir.is_dir());
    }

    #[test]
    fn test_ensure_dir_already_exists() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("existing");
        std::fs::create_dir_all(&test_dir).unwrap();

        assert!(ensure_dir(&test_dir).is_ok());
    }
}
