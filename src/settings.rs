//! Player settings
//!
//! Stored as XML in `<config_dir>/hwplay/settings.xml`. Command line flags
//! override individual values after loading.

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::video::{AccelBackend, ScalingAlgorithm, SessionOptions};

/// Persistent player preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "PlayerSettings")]
pub struct PlayerSettings {
    /// Try hardware decoding before falling back to software
    #[serde(rename = "preferHardware", default = "default_prefer_hardware")]
    pub prefer_hardware: bool,

    /// Allowed hardware backends, by FFmpeg device type name
    #[serde(rename = "backend", default = "default_backends")]
    pub backends: Vec<String>,

    /// Filter for the RGB conversion
    #[serde(rename = "scaling", default)]
    pub scaling: ScalingAlgorithm,

    /// Initial window size as a fraction of the primary monitor (0.1-1.0)
    #[serde(rename = "windowScale", default = "default_window_scale")]
    pub window_scale: f32,

    #[serde(rename = "windowTitle", default = "default_window_title")]
    pub window_title: String,

    /// Log filter used when no environment override is set
    #[serde(rename = "logLevel", default = "default_log_level")]
    pub log_level: String,
}

fn default_prefer_hardware() -> bool {
    true
}

fn default_backends() -> Vec<String> {
    AccelBackend::default_allow_list()
        .iter()
        .map(|backend| backend.name().to_string())
        .collect()
}

fn default_window_scale() -> f32 {
    0.5
}

fn default_window_title() -> String {
    "hwplay".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            prefer_hardware: default_prefer_hardware(),
            backends: default_backends(),
            scaling: ScalingAlgorithm::default(),
            window_scale: default_window_scale(),
            window_title: default_window_title(),
            log_level: default_log_level(),
        }
    }
}

impl PlayerSettings {
    /// Clamp window scale to valid range (0.1-1.0)
    pub fn clamp_window_scale(&mut self) {
        if !self.window_scale.is_finite() {
            self.window_scale = default_window_scale();
        }
        self.window_scale = self.window_scale.clamp(0.1, 1.0);
    }

    /// Parsed allow-list; unknown names are skipped with a warning
    pub fn allow_list(&self) -> Vec<AccelBackend> {
        self.backends
            .iter()
            .filter_map(|name| match name.parse::<AccelBackend>() {
                Ok(backend) => Some(backend),
                Err(e) => {
                    tracing::warn!("Ignoring hardware backend in settings: {}", e);
                    None
                }
            })
            .collect()
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            prefer_hardware: self.prefer_hardware,
            allow_list: self.allow_list(),
            scaling: self.scaling,
        }
    }

    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("hwplay");
            p.push("settings.xml");
            p
        })
    }

    /// Load from the default location, or defaults if there is no file
    pub fn load() -> Result<Self, SettingsError> {
        match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`, or defaults if it does not exist
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Load from an explicit path
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        let mut settings: Self = from_str(&contents)?;
        settings.clamp_window_scale();
        Ok(settings)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let xml = to_string(self)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);

        fs::write(path, formatted)?;
        Ok(())
    }

    /// Save to the default location
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::default_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to_file(&path)
    }
}

/// Settings-related errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::DeError),
    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::SeError),
    #[error("Could not find config directory")]
    NoConfigDir,
}
