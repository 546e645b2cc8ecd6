use std::collections::BTreeMap;
use std::fmt;

use crate::model::key::{base_name, qualify, split_profile};
use crate::model::Document;

/// Key used inside a source to override its ordinal.
pub const CONFIG_ORDINAL: &str = "config_ordinal";

/// One value of a property as defined by one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInformation {
    /// Qualified key, e.g. `%dev.greeting.message`.
    pub property_name_with_profile: String,
    pub profile: Option<String>,
    pub value: String,
    /// Name of the defining source.
    pub source: String,
    pub ordinal: i32,
}

impl PropertyInformation {
    pub fn property_name(&self) -> &str {
        base_name(&self.property_name_with_profile)
    }
}

/// Qualified key to raw value, sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyTable {
    entries: BTreeMap<String, String>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the logical key/value pairs of a document. Properties
    /// without a value or with an empty key are skipped; later definitions win.
    pub fn from_document(doc: &Document) -> Self {
        doc.properties()
            .filter_map(|property| {
                let key = property.property_name_with_profile();
                let value = property.property_value()?;
                (!key.is_empty()).then_some((key, value))
            })
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Qualifies every profile-less key with `profile`, as for the
    /// contents of `application-<profile>.properties`.
    pub fn with_profile(self, profile: &str) -> Self {
        self.entries
            .into_iter()
            .map(|(key, value)| match split_profile(&key).0 {
                Some(_) => (key, value),
                None => (qualify(Some(profile), &key), value),
            })
            .collect()
    }

    /// The `config_ordinal` entry, when present and numeric.
    pub fn ordinal_override(&self) -> Option<i32> {
        self.get(CONFIG_ORDINAL)?.trim().parse().ok()
    }
}

impl FromIterator<(String, String)> for PropertyTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// One origin of configuration entries.
///
/// Implementors provide a name, an ordinal and a [`PropertyTable`]; the
/// lookups have table-based defaults that sources may override.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    /// Human-readable origin, typically a file path.
    fn name(&self) -> &str;

    /// Precedence; the higher ordinal wins.
    fn ordinal(&self) -> i32;

    fn table(&self) -> &PropertyTable;

    fn property(&self, key: &str) -> Option<String> {
        self.table().get(key).map(str::to_string)
    }

    fn property_as_int(&self, key: &str) -> Option<i64> {
        self.property(key)?.trim().parse().ok()
    }

    /// Every profile variant of `key` (`key`, `%dev.key`, ...) in this source.
    fn property_informations(&self, key: &str) -> Vec<PropertyInformation> {
        self.table()
            .iter()
            .filter(|(qualified, _)| base_name(qualified) == key)
            .map(|(qualified, value)| PropertyInformation {
                property_name_with_profile: qualified.to_string(),
                profile: split_profile(qualified).0.map(str::to_string),
                value: value.to_string(),
                source: self.name().to_string(),
                ordinal: self.ordinal(),
            })
            .collect()
    }

    /// Qualified keys that take part in the reference graph.
    fn keys(&self) -> Vec<String> {
        self.table().keys().map(str::to_string).collect()
    }
}

/// A source held in memory, e.g. unsaved editor content or test fixtures.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    ordinal: i32,
    table: PropertyTable,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, ordinal: i32) -> Self {
        Self {
            name: name.into(),
            ordinal,
            table: PropertyTable::new(),
        }
    }

    /// Parses properties text. A `config_ordinal` entry overrides `ordinal`.
    pub fn from_properties(name: impl Into<String>, ordinal: i32, text: &str) -> Self {
        let table = PropertyTable::from_document(&crate::model::parse(text));
        Self {
            name: name.into(),
            ordinal: table.ordinal_override().unwrap_or(ordinal),
            table,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.table.insert(key, value);
        self
    }
}

impl ConfigSource for MemorySource {
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
