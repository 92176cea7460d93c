//! Centralized directory structure management for Chat Replay
//!
//! Directory layout:
//! ```text
//! chat_replay_data/
//! ├── sessions/        # Persisted session records (one JSON file per key)
//! └── sounds/          # Optional notification sounds
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable that pins the storage root.
pub const ROOT_ENV: &str = "REPLAY_ROOT";

/// Directory name used under the platform config dir.
pub const APP_DIR: &str = "chat-replay";

#[derive(Serialize, Deserialize, Debug, Default)]
struct RootConfig {
    replay_root: Option<PathBuf>,
}

/// Platform config directory for the application
pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}

fn get_config_path() -> Option<PathBuf> {
    app_config_dir().map(|d| d.join("config.json"))
}

/// Read the persistent root from a specific config file
pub fn read_root_config(path: &Path) -> Option<PathBuf> {
    if !path.exists() {
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<RootConfig>(&content) {
            Ok(config) => config.replay_root,
            Err(e) => {
                warn!("Failed to parse config file at {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to read config file at {:?}: {}", path, e);
            None
        }
    }
}

/// Write a root into a specific config file
pub fn write_root_config(path: &Path, root: PathBuf) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let config = RootConfig {
        replay_root: Some(root),
    };
    let json = serde_json::to_string_pretty(&config)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load the persistent root from the global config file
pub fn load_persistent_root() -> Option<PathBuf> {
    read_root_config(&get_config_path()?)
}

/// Save a path as the persistent storage root
pub fn save_persistent_root(root: PathBuf) -> anyhow::Result<()> {
    let path =
        get_config_path().ok_or_else(|| anyhow::anyhow!("Could not determine config dir"))?;
    write_root_config(&path, root)
}

/// Get the storage root from environment, persistent config, or default
pub fn replay_root() -> PathBuf {
    if let Ok(val) = std::env::var(ROOT_ENV) {
        return PathBuf::from(val);
    }

    if let Some(root) = load_persistent_root() {
        return root;
    }

    PathBuf::from("chat_replay_data")
}

/// Sessions directory under an explicit root
pub fn sessions_dir_in(root: &Path) -> PathBuf {
    root.join("sessions")
}

/// Persisted session records directory
pub fn sessions_dir() -> PathBuf {
    sessions_dir_in(&replay_root())
}

/// Notification sounds directory
pub fn sounds_dir() -> PathBuf {
    replay_root().join("sounds")
}

/// Turn a session key into a safe file stem.
///
/// Anything outside `[A-Za-z0-9_-]` becomes `_`, so keys can never escape
/// the sessions directory.
pub fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Full path of the record stored under `key` inside `dir`
pub fn session_path_in(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.json", sanitize_key(key)))
}

/// Full path of the record stored under `key` in the default sessions dir
pub fn session_path(key: &str) -> PathBuf {
    session_path_in(&sessions_dir(), key)
}

/// Ensure a single directory exists
pub fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        info!("Created directory: {:?}", path);
    }
    Ok(())
}

/// Initialize the directory structure under `root`
pub fn init_structure_in(root: &Path) -> anyhow::Result<PathBuf> {
    ensure_dir(root)?;
    ensure_dir(&sessions_dir_in(root))?;
    ensure_dir(&root.join("sounds"))?;

    let canonical = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    info!("Chat Replay directory structure initialized at: {:?}", canonical);

    Ok(canonical)
}

/// Initialize the complete directory structure
/// Call this once at startup before touching the session store
pub fn init_structure() -> anyhow::Result<PathBuf> {
    init_structure_in(&replay_root())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("chatData"), "chatData");
        assert_eq!(sanitize_key("../etc/passwd"), "___etc_passwd");
        assert_eq!(sanitize_key("demo session"), "demo_session");
        assert_eq!(sanitize_key(""), "_");
    }

    #[test]
    fn test_session_path_stays_inside_dir() {
        let dir = PathBuf::from("/tmp/sessions");
        let path = session_path_in(&dir, "../../escape");
        assert_eq!(path.parent(), Some(dir.as_path()));
        assert!(path.to_string_lossy().ends_with(".json"));
    }

    #[test]
    fn test_init_structure_creates_dirs() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("replay");
        let canonical = init_structure_in(&root).unwrap();

        assert!(canonical.is_absolute());
        assert!(sessions_dir_in(&root).is_dir());
        assert!(root.join("sounds").is_dir());
    }

    #[test]
    fn test_root_config_round_trip() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("nested").join("config.json");

        assert_eq!(read_root_config(&config), None);
        write_root_config(&config, PathBuf::from("/data/replay")).unwrap();
        assert_eq!(read_root_config(&config), Some(PathBuf::from("/data/replay")));
    }

    #[test]
    fn test_corrupt_root_config_is_ignored() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("config.json");
        fs::write(&config, "{ not json").unwrap();
        assert_eq!(read_root_config(&config), None);
    }
}
