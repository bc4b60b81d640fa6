//! Persistent user settings.
//!
//! Stored as JSON in the user config directory. Loading never fails: a
//! missing or unreadable file falls back to defaults so the front-end can
//! always come up.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default working language for recognition sessions.
pub const DEFAULT_LANGUAGE: &str = "en-US";

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// BCP-47 language tag passed to the engine.
    #[serde(default = "default_language")]
    pub language: String,

    /// Preferred microphone device; the default input device when None.
    #[serde(default)]
    pub microphone_device: Option<String>,

    /// Deepgram API key. The DEEPGRAM_API_KEY environment variable is the
    /// fallback when unset.
    #[serde(default)]
    pub deepgram_api_key: Option<String>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: default_language(),
            microphone_device: None,
            deepgram_api_key: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dicta").join(SETTINGS_FILE))
    }

    /// Load settings from disk, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                crate::verbose!("settings: failed to parse {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Write settings to the config directory, creating it if needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().context("No config directory on this system")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// API key from settings, then the environment.
    pub fn api_key(&self) -> Option<String> {
        self.deepgram_api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| {
                std::env::var("DEEPGRAM_API_KEY")
                    .ok()
                    .filter(|key| !key.is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.language, DEFAULT_LANGUAGE);
        assert_eq!(settings.microphone_device, None);
        assert_eq!(settings.deepgram_api_key, None);
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings {
            language: "de-DE".to_string(),
            microphone_device: Some("USB Microphone".to_string()),
            deepgram_api_key: Some("key".to_string()),
        };
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.language, "de-DE");
        assert_eq!(parsed.microphone_device.as_deref(), Some("USB Microphone"));
    }

    #[test]
    fn empty_configured_key_counts_as_absent() {
        let settings = Settings {
            deepgram_api_key: Some(String::new()),
            ..Settings::default()
        };
        // Falls through to the environment, which may or may not be set;
        // the configured empty string must not win either way.
        assert_ne!(settings.api_key(), Some(String::new()));
    }
}
