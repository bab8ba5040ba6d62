use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use which::which;

use crate::{is_valid_key, MoodError, Result, DEFAULT_PHASE_SECS, DEFAULT_STORAGE_KEY};

const CONFIG_FILE_NAME: &str = "config.json";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the key-value store files
    pub data_dir: PathBuf,

    /// Key the entry list is stored under
    pub storage_key: String,

    /// Seconds per breathing phase
    pub breathing_phase_secs: u32,

    /// Number of entries `history` shows by default
    pub history_limit: usize,

    /// Editor used for writing check-in notes
    pub editor_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".moodlog"));

        Self {
            data_dir,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            breathing_phase_secs: DEFAULT_PHASE_SECS,
            history_limit: 10,
            editor_command: None,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "moodlog")
}

impl Config {
    /// Location of the config file when none is given explicitly.
    pub fn default_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(".moodlog").join(CONFIG_FILE_NAME))
    }

    /// Reads the config at `path` (or the default location). A missing file
    /// yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&contents).map_err(|e| MoodError::ConfigError {
            message: format!("{}: {}", path.display(), e),
        })?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes the config as pretty JSON, replacing the file atomically.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        self.validate()?;
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|_| MoodError::DirectoryError {
            path: dir.to_path_buf(),
        })?;

        let mut temp_file = NamedTempFile::new_in(dir)?;
        temp_file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        temp_file.flush()?;
        temp_file.persist(&path).map_err(|e| MoodError::Io(e.error))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !is_valid_key(&self.storage_key) {
            return Err(MoodError::ConfigError {
                message: format!(
                    "storage_key '{}' must be non-empty and use only letters, digits, '_' or '-'",
                    self.storage_key
                ),
            });
        }
        if self.breathing_phase_secs == 0 {
            return Err(MoodError::ConfigError {
                message: "breathing_phase_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    // This method provides smart fallbacks when no editor is configured
    pub fn get_editor_command(&self) -> String {
        // First try the configured editor
        if let Some(editor) = &self.editor_command {
            return editor.clone();
        }

        // Then try environment variable
        if let Ok(editor) = std::env::var("EDITOR") {
            return editor;
        }

        // Fall back to platform defaults
        if cfg!(windows) {
            "notepad".to_string()
        } else if cfg!(target_os = "macos") {
            "open -W -t".to_string()
        } else {
            for editor in &["nano", "vim", "vi"] {
                if which(editor).is_ok() {
                    return editor.to_string();
                }
            }
            "nano".to_string()
        }
    }
}
