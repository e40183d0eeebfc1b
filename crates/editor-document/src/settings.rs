//! Document settings.
//!
//! Documents read their policy switches through the [`SettingsProvider`] trait so hosts can
//! back them with whatever configuration system they use. [`DocumentSettings`] is a plain
//! implementation that can be deserialized from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    /// Reading the settings file failed.
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    /// The settings file is not valid JSON for [`DocumentSettings`].
    Json(#[from] serde_json::Error),
}

/// Read-only policy switches consulted by a document.
pub trait SettingsProvider {
    /// Hide the trailing newline of a file on load and add it back on save.
    fn hide_trailing_newline(&self) -> bool;

    /// Place the cursor at the position stored in metadata when a file is loaded.
    fn restore_cursor_position(&self) -> bool;

    /// Highlight occurrences of the search pattern.
    fn search_highlighting(&self) -> bool {
        true
    }

    /// Highlight matching brackets around the cursor.
    fn bracket_matching(&self) -> bool {
        true
    }

    /// Maximum number of undo steps kept by the buffer.
    fn max_undo_actions(&self) -> usize {
        DocumentSettings::DEFAULT_MAX_UNDO_ACTIONS
    }
}

/// Plain, serializable [`SettingsProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    /// See [`SettingsProvider::hide_trailing_newline`].
    pub hide_trailing_newline: bool,
    /// See [`SettingsProvider::restore_cursor_position`].
    pub restore_cursor_position: bool,
    /// See [`SettingsProvider::search_highlighting`].
    pub search_highlighting: bool,
    /// See [`SettingsProvider::bracket_matching`].
    pub bracket_matching: bool,
    /// See [`SettingsProvider::max_undo_actions`].
    pub max_undo_actions: usize,
}

impl DocumentSettings {
    /// Default undo depth.
    pub const DEFAULT_MAX_UNDO_ACTIONS: usize = 2000;

    /// Parse settings from a JSON object. Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            hide_trailing_newline: true,
            restore_cursor_position: true,
            search_highlighting: true,
            bracket_matching: true,
            max_undo_actions: Self::DEFAULT_MAX_UNDO_ACTIONS,
        }
    }
}

impl SettingsProvider for DocumentSettings {
    fn hide_trailing_newline(&self) -> bool {
        self.hide_trailing_newline
    }

    fn restore_cursor_position(&self) -> bool {
        self.restore_cursor_position
    }

    fn search_highlighting(&self) -> bool {
        self.search_highlighting
    }

    fn bracket_matching(&self) -> bool {
        self.bracket_matching
    }

    fn max_undo_actions(&self) -> usize {
        self.max_undo_actions
    }
}
