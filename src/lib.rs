//! Document model and multi-source resolution for MicroProfile-style
//! `.properties` configuration.
//!
//! - [`model`] parses text into an offset-addressable tree that tolerates
//!   incomplete input.
//! - [`config`] aggregates a project's sources by ordinal.
//! - [`resolve`] substitutes `${name:default}` expressions, refusing to run
//!   on a cyclic reference graph and stopping on cancellation.
//!
//! ```
//! use mp_properties::{Cancellation, MemorySource, Project, ProjectInfo, Resolution};
//!
//! let project = Project::builder()
//!     .with_source(MemorySource::from_properties("application.properties", 250, "greeting=${name:World}"))
//!     .build()?;
//!
//! let greeting = project.resolve("greeting", &ProjectInfo::default(), &Cancellation::new());
//! assert_eq!(greeting, Resolution::Resolved("World".to_string()));
//! # Ok::<(), mp_properties::Error>(())
//! ```

pub mod config;
pub mod info;
pub mod model;
pub mod resolve;
mod error;

pub use config::{ConfigError, ConfigSource, MemorySource, Project, PropertyInformation};
pub use error::Error;
pub use info::ProjectInfo;
pub use model::{parse, Document, NodeId, NodeKind};
pub use resolve::{Cancellation, PropertyGraph, Resolution, Resolver};
