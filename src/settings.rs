//! Persisted user settings: API key, selected model, last directory and
//! saved custom prompts.
//!
//! Stored as pretty JSON at `<config dir>/pdfview/settings.json`
//! (`~/.config/pdfview/settings.json` on Linux). Writes go through a
//! temporary file in the same directory and are renamed into place, so a
//! crash mid-write never leaves a truncated file behind.

use crate::error::ViewerError;
use crate::pipeline::llm::{AVAILABLE_MODELS, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A user-defined action saved in settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPrompt {
    /// Name shown in menus and used as the result label.
    pub name: String,
    /// Prompt template; `{text}` is replaced by the page text.
    pub template: String,
    /// Optional key binding, e.g. "Ctrl+T".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub last_directory: Option<PathBuf>,
    pub custom_prompts: Vec<CustomPrompt>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("last_directory", &self.last_directory)
            .field("custom_prompts", &self.custom_prompts)
            .finish()
    }
}

/// Default settings file location.
pub fn settings_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(std::env::temp_dir)
        .join("pdfview")
        .join("settings.json")
}

impl Settings {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings at {}; using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ViewerError::SettingsReadFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings: Settings =
            serde_json::from_str(&raw).map_err(|e| ViewerError::SettingsParseFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ViewerError> {
        let write_err = |source: std::io::Error| ViewerError::SettingsWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ViewerError::Internal(format!("settings serialisation: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.write_all(b"\n").map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// The saved model if it is one of [`AVAILABLE_MODELS`], else
    /// [`DEFAULT_MODEL`].
    pub fn effective_model(&self) -> &str {
        match self.model.as_deref() {
            Some(m) if AVAILABLE_MODELS.contains(&m) => m,
            Some(m) => {
                warn!("Saved model '{}' is not available; using {}", m, DEFAULT_MODEL);
                DEFAULT_MODEL
            }
            None => DEFAULT_MODEL,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    pub fn find_prompt(&self, name: &str) -> Option<&CustomPrompt> {
        self.custom_prompts
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Add or replace (by name) a custom prompt.
    pub fn upsert_prompt(&mut self, prompt: CustomPrompt) {
        match self
            .custom_prompts
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(&prompt.name))
        {
            Some(existing) => *existing = prompt,
            None => self.custom_prompts.push(prompt),
        }
    }

    /// Record the directory holding `file` as the last one opened from.
    /// Returns whether the saved directory changed.
    pub fn remember_directory(&mut self, file: &Path) -> bool {
        let file = std::fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        let dir = file
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf);
        if dir.is_none() || dir == self.last_directory {
            return false;
        }
        debug!("Last directory now {:?}", dir);
        self.last_directory = dir;
        true
    }

    /// Remove a custom prompt by name. Returns whether one was removed.
    pub fn remove_prompt(&mut self, name: &str) -> bool {
        let before = self.custom_prompts.len();
        self.custom_prompts
            .retain(|p| !p.name.eq_ignore_ascii_case(name));
        self.custom_prompts.len() != before
    }
}
