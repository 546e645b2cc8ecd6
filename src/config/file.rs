//! File-backed configuration sources.

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use super::source::{ConfigSource, PropertyTable};
use super::ConfigError;
use crate::model::parse;

/// A source loaded from a `.properties` file.
///
/// A `config_ordinal` entry in the file overrides the ordinal given at load
/// time. With a profile, every profile-less key is qualified with it.
#[derive(Debug, Clone)]
pub struct PropertiesSource {
    name: String,
    path: PathBuf,
    ordinal: i32,
    table: PropertyTable,
}

impl PropertiesSource {
    pub fn load(path: impl AsRef<Path>, ordinal: i32, profile: Option<&str>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = read_source_file(path)?;
        Ok(Self::from_text(path, ordinal, profile, &contents))
    }

    pub fn from_text(path: impl AsRef<Path>, ordinal: i32, profile: Option<&str>, text: &str) -> Self {
        let path = path.as_ref().to_path_buf();
        let table = PropertyTable::from_document(&parse(text));
        let ordinal = table.ordinal_override().unwrap_or(ordinal);
        let table = match profile {
            Some(profile) => table.with_profile(profile),
            None => table,
        };
        Self {
            name: path.display().to_string(),
            path,
            ordinal,
            table,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for PropertiesSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn table(&self) -> &PropertyTable {
        &self.table
    }
}

/// A source loaded from a YAML file.
///
/// Nested mappings flatten to dotted keys, so a top-level `"%dev"` mapping
/// produces `%dev.`-qualified keys. Sequences of scalars become
/// comma-separated values.
#[derive(Debug, Clone)]
pub struct YamlSource {
    name: String,
    path: PathBuf,
    ordinal: i32,
    table: PropertyTable,
}

impl YamlSource {
    pub fn load(path: impl AsRef<Path>, ordinal: i32, profile: Option<&str>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = read_source_file(path)?;
        Self::from_text(path, ordinal, profile, &contents)
    }

    pub fn from_text(
        path: impl AsRef<Path>,
        ordinal: i32,
        profile: Option<&str>,
        text: &str,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let root: Value = serde_yaml::from_str(text).map_err(|e| ConfigError::YamlParseError {
            path: path.clone(),
            source: e,
        })?;

        let mut table = PropertyTable::new();
        flatten("", &root, &mut table);
        let ordinal = table.ordinal_override().unwrap_or(ordinal);
        let table = match profile {
            Some(profile) => table.with_profile(profile),
            None => table,
        };

        Ok(Self {
            name: path.display().to_string(),
            path,
            ordinal,
            table,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for YamlSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn table(&self) -> &PropertyTable {
        &self.table
    }
}

fn flatten(prefix: &str, value: &Value, table: &mut PropertyTable) {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                let Some(key) = scalar_text(key) else {
                    continue;
                };
                let key = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&key, child, table);
            }
        }
        Value::Sequence(items) => {
            if !prefix.is_empty() {
                let items: Vec<String> = items.iter().filter_map(scalar_text).collect();
                table.insert(prefix, items.join(","));
            }
        }
        Value::Tagged(tagged) => flatten(prefix, &tagged.value, table),
        scalar => {
            if prefix.is_empty() {
                return;
            }
            if let Some(text) = scalar_text(scalar) {
                table.insert(prefix, text);
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn read_source_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.to_path_buf())
        } else {
            ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}
