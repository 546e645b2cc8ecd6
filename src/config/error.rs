use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("required file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to scan directory '{path}': {source}")]
    ScanError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse discovery settings '{path}': {source}")]
    SettingsParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid discovery settings: {0}")]
    InvalidSettings(#[from] toml::de::Error),

    #[error("failed to parse YAML source '{path}': {source}")]
    YamlParseError {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}
