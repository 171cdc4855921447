// SPDX-License-Identifier: MIT OR Apache-2.0
//! Script settings and configuration.
//!
//! Settings live in a RON file next to the graph assets and control how
//! graphs are translated:
//! - Namespace, imports and base class of generated classes
//! - The method receiving event subscriptions
//! - Trace instrumentation
//! - Where graph assets are found
//! - An optional external compiler

use ordoplay_script_graph::GRAPH_FILE_EXTENSION;
use ordoplay_script_translator::TranslationOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "script_settings.ron";

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer editor
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },
}

/// External compiler invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Compiler executable
    pub program: PathBuf,
    /// Arguments; the source is passed on stdin
    #[serde(default)]
    pub args: Vec<String>,
}

/// Script compilation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSettings {
    /// Format version
    pub version: u32,
    /// Namespace wrapping generated classes
    #[serde(default)]
    pub namespace: Option<String>,
    /// Extra namespaces imported by every generated class
    #[serde(default)]
    pub usings: Vec<String>,
    /// Base class overriding the graph's stencil
    #[serde(default)]
    pub base_class: Option<String>,
    /// Method receiving event subscriptions
    #[serde(default = "default_registration_method")]
    pub registration_method: String,
    /// Emit trace hooks for live highlighting
    #[serde(default)]
    pub trace: bool,
    /// Directory holding graph assets, relative to the settings file
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,
    /// Extension of graph asset files
    #[serde(default = "default_graph_extension")]
    pub graph_extension: String,
    /// Compiler run on generated sources; none skips compilation
    #[serde(default)]
    pub compiler: Option<CompilerSettings>,
}

fn default_registration_method() -> String {
    "Start".to_string()
}

fn default_asset_dir() -> PathBuf {
    PathBuf::from("scripts")
}

fn default_graph_extension() -> String {
    GRAPH_FILE_EXTENSION.to_string()
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            namespace: None,
            usings: Vec::new(),
            base_class: None,
            registration_method: default_registration_method(),
            trace: false,
            asset_dir: default_asset_dir(),
            graph_extension: default_graph_extension(),
            compiler: None,
        }
    }
}

impl ScriptSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings: ScriptSettings = ron::from_str(&content)?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        Ok(settings)
    }

    /// Load the settings file of a project directory, or defaults when missing
    pub fn load_or_default(project_dir: &Path) -> Result<Self, SettingsError> {
        let path = Self::settings_file_path(project_dir);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "No script settings, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Settings file path for a project directory
    pub fn settings_file_path(project_dir: &Path) -> PathBuf {
        project_dir.join(SETTINGS_FILE_NAME)
    }

    /// Translation options for one graph
    pub fn translation_options(&self) -> TranslationOptions {
        TranslationOptions {
            namespace: self.namespace.clone(),
            class_name: None,
            base_class: self.base_class.clone(),
            usings: self.usings.clone(),
            registration_method: self.registration_method.clone(),
            trace: self.trace,
        }
    }
}
