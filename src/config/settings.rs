//! Which files a project is scanned for.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Properties,
    Yaml,
}

/// A file looked up relative to each origin directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourcePattern {
    pub file: PathBuf,
    pub ordinal: i32,
    /// Inferred from the extension when omitted.
    #[serde(default)]
    pub format: Option<SourceFormat>,
}

impl SourcePattern {
    pub fn new(file: impl Into<PathBuf>, ordinal: i32) -> Self {
        Self {
            file: file.into(),
            ordinal,
            format: None,
        }
    }

    pub fn format(&self) -> SourceFormat {
        self.format.unwrap_or_else(|| {
            match self.file.extension().and_then(|ext| ext.to_str()) {
                Some("yaml") | Some("yml") => SourceFormat::Yaml,
                _ => SourceFormat::Properties,
            }
        })
    }
}

/// Discovery settings, usually read from a TOML file:
///
/// ```toml
/// profile_files = true
///
/// [[sources]]
/// file = "META-INF/microprofile-config.properties"
/// ordinal = 100
///
/// [[sources]]
/// file = "config/app.conf"
/// ordinal = 260
/// format = "properties"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub sources: Vec<SourcePattern>,
    /// Also pick up `<stem>-<profile>.<ext>` next to each file.
    pub profile_files: bool,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            sources: vec![
                SourcePattern::new("META-INF/microprofile-config.properties", 100),
                SourcePattern::new("application.properties", 250),
                SourcePattern::new("application.yaml", 255),
                SourcePattern::new("application.yml", 255),
            ],
            profile_files: true,
        }
    }
}

impl DiscoverySettings {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads settings from a TOML file.
    ///
    /// A missing file is an error when `required`, otherwise the defaults
    /// are returned.
    pub fn from_file(path: impl AsRef<Path>, required: bool) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|e| ConfigError::SettingsParseError {
                path: path.to_path_buf(),
                source: e,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if required {
                    Err(ConfigError::FileNotFound(path.to_path_buf()))
                } else {
                    Ok(Self::default())
                }
            }
            Err(e) => Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}
