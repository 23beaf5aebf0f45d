//! Engine configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! default_format = "xhtml"
//!
//! [csv]
//! delimiter = ";"
//! include_header = true
//!
//! [xhtml]
//! stylesheet = "report.css"
//! title_fallback = "Report"
//!
//! [odf]
//! temp_dir = "/var/tmp"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

const KNOWN_FORMATS: [&str; 4] = ["csv", "xhtml", "odt", "ods"];

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Exporter key used when none is requested
    pub default_format: String,
    pub csv: CsvConfig,
    pub xhtml: XhtmlConfig,
    pub odf: OdfConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_format: "xhtml".to_string(),
            csv: CsvConfig::default(),
            xhtml: XhtmlConfig::default(),
            odf: OdfConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// A relative stylesheet path is resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let mut config = Self::from_toml_str(&content)?;
        if let (Some(stylesheet), Some(dir)) = (config.xhtml.stylesheet.as_mut(), path.parent()) {
            if stylesheet.is_relative() {
                *stylesheet = dir.join(&*stylesheet);
            }
        }
        Ok(config)
    }

    pub fn with_default_format(mut self, format: impl Into<String>) -> Self {
        self.default_format = format.into();
        self
    }

    pub fn with_csv_delimiter(mut self, delimiter: char) -> Self {
        self.csv.delimiter = delimiter;
        self
    }

    pub fn with_csv_header(mut self, include_header: bool) -> Self {
        self.csv.include_header = include_header;
        self
    }

    pub fn with_stylesheet(mut self, path: impl Into<PathBuf>) -> Self {
        self.xhtml.stylesheet = Some(path.into());
        self
    }

    pub fn with_title_fallback(mut self, title: impl Into<String>) -> Self {
        self.xhtml.title_fallback = title.into();
        self
    }

    pub fn with_temp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.odf.temp_dir = Some(path.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let delimiter = self.csv.delimiter;
        if !delimiter.is_ascii() || (delimiter.is_ascii_control() && delimiter != '\t') {
            return Err(format!(
                "CSV delimiter must be a single printable ASCII character or tab, got {delimiter:?}"
            ));
        }
        if delimiter == '"' {
            return Err("CSV delimiter cannot be the quote character".to_string());
        }
        if !KNOWN_FORMATS.contains(&self.default_format.as_str()) {
            return Err(format!(
                "Unknown default format '{}' (expected one of: {})",
                self.default_format,
                KNOWN_FORMATS.join(", ")
            ));
        }
        Ok(())
    }

    /// Read the configured XHTML stylesheet, if any
    pub fn load_stylesheet(&self) -> Result<Option<String>, ConfigError> {
        match &self.xhtml.stylesheet {
            Some(path) => std::fs::read_to_string(path)
                .map(Some)
                .map_err(|e| ConfigError::io(path, e)),
            None => Ok(None),
        }
    }
}

/// CSV exporter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub delimiter: char,
    pub include_header: bool,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ';',
            include_header: true,
        }
    }
}

/// XHTML exporter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XhtmlConfig {
    /// CSS file embedded into a `<style>` element
    pub stylesheet: Option<PathBuf>,
    /// Title used when the template has no name
    pub title_fallback: String,
}

impl Default for XhtmlConfig {
    fn default() -> Self {
        Self {
            stylesheet: None,
            title_fallback: "Report".to_string(),
        }
    }
}

/// OpenDocument exporter settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdfConfig {
    /// Directory for staging packages; the OS temp dir when unset
    pub temp_dir: Option<PathBuf>,
}
