//! Read-only project metadata supplied by the host.
//!
//! Properties discovered from compiled code (annotations, extension
//! descriptors) never appear in a properties file but still have names and
//! default values. [`ProjectInfo`] carries them into resolution.

use std::collections::HashMap;

use serde::Deserialize;

use crate::model::key::base_name;

/// Metadata of one known property.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    pub name: String,
    #[serde(default, rename = "type")]
    pub value_type: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ItemMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: None,
            default_value: None,
            description: None,
        }
    }

    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = Some(value_type.into());
        self
    }
}

/// Known properties of a project, indexed by name.
///
/// Deserializes from the host's JSON payload:
///
/// ```
/// # use mp_properties::ProjectInfo;
/// # fn main() -> Result<(), serde_json::Error> {
/// let info: ProjectInfo = serde_json::from_str(
///     r#"{ "projectURI": "file:///app", "properties": [
///         { "name": "quarkus.http.port", "type": "int", "defaultValue": "8080" }
///     ] }"#,
/// )?;
/// assert_eq!(info.default_value("quarkus.http.port"), Some("8080"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawProjectInfo")]
pub struct ProjectInfo {
    project_uri: Option<String>,
    properties: Vec<ItemMetadata>,
    by_name: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct RawProjectInfo {
    #[serde(default, rename = "projectURI")]
    project_uri: Option<String>,
    #[serde(default)]
    properties: Vec<ItemMetadata>,
}

impl From<RawProjectInfo> for ProjectInfo {
    fn from(raw: RawProjectInfo) -> Self {
        let mut builder = ProjectInfo::builder();
        builder.project_uri = raw.project_uri;
        raw.properties
            .into_iter()
            .fold(builder, ProjectInfoBuilder::with_property)
            .build()
    }
}

impl ProjectInfo {
    pub fn builder() -> ProjectInfoBuilder {
        ProjectInfoBuilder::default()
    }

    pub fn project_uri(&self) -> Option<&str> {
        self.project_uri.as_deref()
    }

    pub fn properties(&self) -> &[ItemMetadata] {
        &self.properties
    }

    /// Looks up metadata by property name; a profile prefix is ignored.
    pub fn property(&self, key: &str) -> Option<&ItemMetadata> {
        self.by_name
            .get(base_name(key))
            .map(|index| &self.properties[*index])
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.property(key).is_some()
    }

    pub fn default_value(&self, key: &str) -> Option<&str> {
        self.property(key)?.default_value.as_deref()
    }
}

/// Builder for [`ProjectInfo`].
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ProjectInfoBuilder {
    project_uri: Option<String>,
    properties: Vec<ItemMetadata>,
}

impl ProjectInfoBuilder {
    pub fn with_project_uri(mut self, uri: impl Into<String>) -> Self {
        self.project_uri = Some(uri.into());
        self
    }

    /// Adds a property. A later entry with the same name replaces the earlier one.
    pub fn with_property(mut self, item: ItemMetadata) -> Self {
        match self.properties.iter_mut().find(|known| known.name == item.name) {
            Some(known) => *known = item,
            None => self.properties.push(item),
        }
        self
    }

    pub fn build(self) -> ProjectInfo {
        let by_name = self
            .properties
            .iter()
            .enumerate()
            .map(|(index, item)| (item.name.clone(), index))
            .collect();
        ProjectInfo {
            project_uri: self.project_uri,
            properties: self.properties,
            by_name,
        }
    }
}
