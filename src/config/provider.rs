//! Discovery of configuration sources inside an origin directory.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::trace;

use super::file::{PropertiesSource, YamlSource};
use super::settings::{DiscoverySettings, SourceFormat, SourcePattern};
use super::source::ConfigSource;
use super::ConfigError;

/// Produces the sources one origin (e.g. a build output directory) holds.
pub trait ConfigSourceProvider: Send + Sync + fmt::Debug {
    fn config_sources(&self, origin: &Path) -> Result<Vec<Arc<dyn ConfigSource>>, ConfigError>;
}

/// Looks for the files listed in [`DiscoverySettings`].
#[derive(Debug, Clone, Default)]
pub struct FileSystemProvider {
    settings: DiscoverySettings,
}

impl FileSystemProvider {
    pub fn new(settings: DiscoverySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }
}

impl ConfigSourceProvider for FileSystemProvider {
    fn config_sources(&self, origin: &Path) -> Result<Vec<Arc<dyn ConfigSource>>, ConfigError> {
        let mut sources = Vec::new();

        for pattern in &self.settings.sources {
            let path = origin.join(&pattern.file);
            if path.is_file() {
                sources.push(load(&path, pattern, None)?);
            }
            if self.settings.profile_files {
                for (profile, profile_path) in profile_variants(&path)? {
                    sources.push(load(&profile_path, pattern, Some(&profile))?);
                }
            }
        }

        trace!(origin = %origin.display(), count = sources.len(), "discovered config sources");
        Ok(sources)
    }
}

fn load(path: &Path, pattern: &SourcePattern, profile: Option<&str>) -> Result<Arc<dyn ConfigSource>, ConfigError> {
    Ok(match pattern.format() {
        SourceFormat::Properties => Arc::new(PropertiesSource::load(path, pattern.ordinal, profile)?),
        SourceFormat::Yaml => Arc::new(YamlSource::load(path, pattern.ordinal, profile)?),
    })
}

/// Finds `<stem>-<profile>.<ext>` siblings of `path`, sorted by profile.
fn profile_variants(path: &Path) -> Result<Vec<(String, std::path::PathBuf)>, ConfigError> {
    let (Some(dir), Some(stem), Some(ext)) = (
        path.parent(),
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|s| s.to_str()),
    ) else {
        return Ok(Vec::new());
    };
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let prefix = format!("{stem}-");
    let suffix = format!(".{ext}");
    let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::ScanError {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut variants = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::ScanError {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let file_name = entry.file_name();
        let Some(profile) = file_name
            .to_str()
            .and_then(|name| name.strip_prefix(&prefix))
            .and_then(|rest| rest.strip_suffix(&suffix))
        else {
            continue;
        };
        if !profile.is_empty() && entry.path().is_file() {
            variants.push((profile.to_string(), entry.path()));
        }
    }
    variants.sort();
    Ok(variants)
}
