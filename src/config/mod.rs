//! Configuration sources and their aggregation per project.

mod builder;
mod env;
mod error;
mod file;
mod project;
mod provider;
mod settings;
mod source;

pub use builder::ProjectBuilder;
pub use env::EnvSource;
pub use error::ConfigError;
pub use file::{PropertiesSource, YamlSource};
pub use project::{Project, SourceSet};
pub use provider::{ConfigSourceProvider, FileSystemProvider};
pub use settings::{DiscoverySettings, SourceFormat, SourcePattern};
pub use source::{ConfigSource, MemorySource, PropertyInformation, PropertyTable, CONFIG_ORDINAL};
