// User settings
// Loaded from ~/.config/smeta/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read {path}: {message}")]
    Read { path: String, message: String },
    #[error("invalid settings in {path}: {message}")]
    Parse { path: String, message: String },
    #[error("cannot write {path}: {message}")]
    Write { path: String, message: String },
}

/// Reference workbooks whose A–F column widths are copied into results,
/// one per dialect family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceWorkbooks {
    #[serde(rename = "smetaRu", skip_serializing_if = "Option::is_none")]
    pub smeta_ru: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub turbosmetchik: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub grandsmeta: Option<PathBuf>,
}

impl ReferenceWorkbooks {
    /// Reference workbook for a dialect family name ("Смета ру",
    /// "Турбосметчик", "ГрандСМЕТА").
    pub fn for_family(&self, family: &str) -> Option<&Path> {
        let path = match family {
            "Смета ру" => &self.smeta_ru,
            "Турбосметчик" => &self.turbosmetchik,
            "ГрандСМЕТА" => &self.grandsmeta,
            _ => return None,
        };
        path.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Dialects
    #[serde(rename = "dialects.default", skip_serializing_if = "Option::is_none")]
    pub default_dialect: Option<String>,

    /// Directory of extra `*.toml` dialect definitions.
    #[serde(rename = "dialects.directory", skip_serializing_if = "Option::is_none")]
    pub dialects_directory: Option<PathBuf>,

    // Output
    #[serde(rename = "reference")]
    pub reference: ReferenceWorkbooks,

    #[serde(rename = "output.directory", skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,

    // Logging
    #[serde(rename = "log.level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_dialect: None,
            dialects_directory: None,
            reference: ReferenceWorkbooks::default(),
            output_directory: None,
            log_level: "warn".to_string(),
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Dialect used when --dialect is not given, e.g. "ГрандСМЕТА"
    "dialects.default": null,

    // Directory with additional dialect definitions (*.toml)
    "dialects.directory": null,

    // Reference workbooks: result columns A-F take their widths
    // from the first sheet of the workbook for the dialect family.
    // Without one, widths are fitted to the content.
    "reference": {
        "smetaRu": null,
        "turbosmetchik": null,
        "grandsmeta": null
    },

    // Where results are written when -o is not given (default: current directory)
    "output.directory": null,

    // One of "error", "warn", "info", "debug", "trace"
    "log.level": "warn"
}
"#;

fn strip_comments(contents: &str) -> String {
    contents
        .lines()
        .filter(|line| !line.trim().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("smeta");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults.
    /// A missing file is created with commented defaults.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            if let Err(e) = Self::create_default_file(&path) {
                log::warn!("{}", e);
            }
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }

    /// Load settings from an explicit path. Unlike [`Settings::load`],
    /// errors are returned rather than replaced with defaults.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&contents).map_err(|message| SettingsError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, String> {
        serde_json::from_str(&strip_comments(contents)).map_err(|e| e.to_string())
    }

    /// Write the commented default settings file
    pub fn create_default_file(path: &Path) -> Result<(), SettingsError> {
        let write_err = |e: std::io::Error| SettingsError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, DEFAULT_FILE).map_err(write_err)?;
        log::info!("created default settings at {}", path.display());
        Ok(())
    }
}
