// ABOUTME: Loader configuration for template discovery and rendering behaviour
// ABOUTME: Defines directory priorities, auto-reload, action delimiters, and file extension

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Native action delimiters of the template engine.
pub(crate) const NATIVE_DELIM_LEFT: &str = "{{";
pub(crate) const NATIVE_DELIM_RIGHT: &str = "}}";

/// Controls the behaviour of template loading and rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File paths to search for templates, ordered by descending priority.
    pub directories: Vec<PathBuf>,

    /// Whether templates are reloaded on every render.
    /// Useful in development, should be disabled in production.
    pub auto_reload: bool,

    /// Delimiter that marks the start of a template action.
    pub delim_left: String,

    /// Delimiter that marks the end of a template action.
    pub delim_right: String,

    /// File extension that qualifies a scanned file as a template source.
    pub extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            auto_reload: false,
            delim_left: NATIVE_DELIM_LEFT.to_string(),
            delim_right: NATIVE_DELIM_RIGHT.to_string(),
            extension: ".html".to_string(),
        }
    }
}

impl Config {
    /// Empty delimiter or extension fields fall back to their defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.delim_left.is_empty() {
            self.delim_left = NATIVE_DELIM_LEFT.to_string();
        }
        if self.delim_right.is_empty() {
            self.delim_right = NATIVE_DELIM_RIGHT.to_string();
        }
        if self.extension.is_empty() {
            self.extension = ".html".to_string();
        }
        self
    }

    pub(crate) fn uses_native_delimiters(&self) -> bool {
        self.delim_left == NATIVE_DELIM_LEFT && self.delim_right == NATIVE_DELIM_RIGHT
    }
}
