use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::env::EnvSource;
use super::project::Project;
use super::provider::{ConfigSourceProvider, FileSystemProvider};
use super::settings::DiscoverySettings;
use super::source::ConfigSource;
use crate::Error;

/// Builder for a [`Project`].
///
/// Origins are directories handed to every provider when sources are
/// (re)loaded. Fixed sources are included as is on every load.
///
/// ## Example
///
/// ```no_run
/// use mp_properties::{Cancellation, Project, ProjectInfo};
///
/// let project = Project::builder()
///     .with_origin("target/classes")
///     .with_default_discovery()
///     .with_env()
///     .build()?;
///
/// let url = project.resolve("quarkus.datasource.url", &ProjectInfo::default(), &Cancellation::new());
/// println!("{:?}", url.into_option());
/// # Ok::<(), mp_properties::Error>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ProjectBuilder {
    origins: Vec<PathBuf>,
    providers: Vec<Arc<dyn ConfigSourceProvider>>,
    sources: Vec<Arc<dyn ConfigSource>>,
    discovery_file: Option<(PathBuf, bool)>,
}

impl Project {
    pub fn builder() -> ProjectBuilder {
        ProjectBuilder::default()
    }
}

impl ProjectBuilder {
    /// Adds a directory scanned by every provider, e.g. a build output folder.
    pub fn with_origin(mut self, path: impl AsRef<Path>) -> Self {
        self.origins.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_provider(mut self, provider: impl ConfigSourceProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Adds a [`FileSystemProvider`] with the default file list.
    pub fn with_default_discovery(self) -> Self {
        self.with_provider(FileSystemProvider::default())
    }

    /// Adds a [`FileSystemProvider`] configured from a TOML file.
    ///
    /// If `required` is `false` and the file is missing, the default file
    /// list is used. The file is read by [`build`](Self::build).
    pub fn with_discovery_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        self.discovery_file = Some((path.as_ref().to_path_buf(), required));
        self
    }

    /// Adds a source that is not tied to an origin.
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Adds the process environment as a source (ordinal 300).
    pub fn with_env(self) -> Self {
        self.with_source(EnvSource::from_env())
    }

    /// Builds the project. Sources are not loaded until first use.
    ///
    /// Fails when there is nothing to load from: no fixed source and no
    /// origin/provider pair.
    pub fn build(mut self) -> Result<Project, Error> {
        if let Some((path, required)) = self.discovery_file.take() {
            let settings = DiscoverySettings::from_file(&path, required)?;
            self.providers.push(Arc::new(FileSystemProvider::new(settings)));
        }

        if self.sources.is_empty() && (self.origins.is_empty() || self.providers.is_empty()) {
            return Err(Error::NothingToLoad);
        }

        Ok(Project::from_parts(self.origins, self.providers, self.sources))
    }
}
