//! `${name:default}` resolution over layered property lookups.
//!
//! Resolution is guarded twice: the [`PropertyGraph`] must be acyclic before
//! anything is substituted, and every recursive step polls a
//! [`Cancellation`]. Outcomes are a [`Resolution`], never an error.

mod cancel;
mod graph;

use std::collections::BTreeSet;

use tracing::{debug, trace};

pub use cancel::Cancellation;
pub use graph::PropertyGraph;

use crate::info::ProjectInfo;
use crate::model::key::{qualify, split_profile};
use crate::model::{Document, Segment, Template};

/// Outcome of resolving one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    /// Not defined, a reference without default is missing, or the graph
    /// has a cycle.
    Absent,
    /// The caller cancelled; the work is stale and must be discarded.
    Cancelled,
}

impl Resolution {
    pub fn into_option(self) -> Option<String> {
        match self {
            Resolution::Resolved(value) => Some(value),
            Resolution::Absent | Resolution::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Resolution::Cancelled)
    }
}

/// Source of raw (unresolved) property values keyed by qualified name.
pub trait PropertyLookup {
    fn raw_value(&self, key: &str) -> Option<String>;

    /// Every qualified key this lookup defines.
    fn keys(&self) -> Vec<String>;
}

/// Later definitions win, as when a properties file is loaded.
impl PropertyLookup for Document {
    fn raw_value(&self, key: &str) -> Option<String> {
        self.find_property(key)?.property_value()
    }

    fn keys(&self) -> Vec<String> {
        self.property_keys().map(str::to_string).collect()
    }
}

/// Stacks lookups; the first layer defining a key wins.
#[derive(Default)]
pub struct Layered<'a> {
    layers: Vec<&'a dyn PropertyLookup>,
}

impl<'a> Layered<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer below the existing ones.
    pub fn with(mut self, layer: &'a dyn PropertyLookup) -> Self {
        self.layers.push(layer);
        self
    }
}

impl PropertyLookup for Layered<'_> {
    fn raw_value(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.raw_value(key))
    }

    fn keys(&self) -> Vec<String> {
        let keys: BTreeSet<String> = self.layers.iter().flat_map(|layer| layer.keys()).collect();
        keys.into_iter().collect()
    }
}

/// Longest reference chain followed before a value is reported absent.
pub const MAX_REFERENCE_DEPTH: usize = 256;

/// Picks the key a reference points at: `%profile.name` when the
/// referencing key has a profile and that key is defined, else `name`.
pub(crate) fn reference_target(lookup: &dyn PropertyLookup, profile: Option<&str>, name: &str) -> String {
    if let Some(profile) = profile {
        let profiled = qualify(Some(profile), name);
        if lookup.raw_value(&profiled).is_some() {
            return profiled;
        }
    }
    name.to_string()
}

/// Resolves property values against a lookup and its reference graph.
pub struct Resolver<'a> {
    lookup: &'a dyn PropertyLookup,
    graph: &'a PropertyGraph,
    info: Option<&'a ProjectInfo>,
}

impl<'a> Resolver<'a> {
    /// `graph` must have been built from `lookup`.
    pub fn new(lookup: &'a dyn PropertyLookup, graph: &'a PropertyGraph) -> Self {
        Self {
            lookup,
            graph,
            info: None,
        }
    }

    /// Falls back to metadata default values for references that no layer
    /// defines. Those defaults are used literally.
    pub fn with_project_info(mut self, info: &'a ProjectInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Resolves the value of `key` (a qualified key).
    pub fn resolve(&self, key: &str, cancel: &Cancellation) -> Resolution {
        if cancel.is_cancelled() {
            trace!(key, "resolution cancelled");
            return Resolution::Cancelled;
        }
        if !self.graph.is_acyclic() {
            debug!(key, cycle = ?self.graph.find_cycle(), "property graph has a cycle");
            return Resolution::Absent;
        }
        let mut visiting = Vec::new();
        self.resolve_key(key, cancel, &mut visiting)
    }

    /// Resolves a raw value as if it were the value of a property with
    /// `profile`.
    pub fn resolve_value(&self, raw: &str, profile: Option<&str>, cancel: &Cancellation) -> Resolution {
        if cancel.is_cancelled() {
            return Resolution::Cancelled;
        }
        if !self.graph.is_acyclic() {
            return Resolution::Absent;
        }
        let mut visiting = Vec::new();
        self.resolve_segments(Template::parse(raw).segments(), profile, cancel, &mut visiting)
    }

    fn resolve_key(&self, key: &str, cancel: &Cancellation, visiting: &mut Vec<String>) -> Resolution {
        if cancel.is_cancelled() {
            trace!(key, "resolution cancelled");
            return Resolution::Cancelled;
        }
        // Lookups outside the graph (environment variables) can still loop.
        if visiting.iter().any(|seen| seen == key) {
            debug!(key, "reference loop outside the property graph");
            return Resolution::Absent;
        }
        if visiting.len() >= MAX_REFERENCE_DEPTH {
            debug!(key, depth = visiting.len(), "reference chain too deep");
            return Resolution::Absent;
        }
        let Some(raw) = self.lookup.raw_value(key) else {
            return Resolution::Absent;
        };

        visiting.push(key.to_string());
        let template = Template::parse(&raw);
        let resolved = self.resolve_segments(template.segments(), split_profile(key).0, cancel, visiting);
        visiting.pop();
        resolved
    }

    fn resolve_segments(
        &self,
        segments: &[Segment],
        profile: Option<&str>,
        cancel: &Cancellation,
        visiting: &mut Vec<String>,
    ) -> Resolution {
        let mut out = String::new();

        for segment in segments {
            if cancel.is_cancelled() {
                return Resolution::Cancelled;
            }
            let expression = match segment {
                Segment::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                Segment::Expression(expression) => expression,
            };

            let target = reference_target(self.lookup, profile, &expression.name);
            match self.resolve_key(&target, cancel, visiting) {
                Resolution::Resolved(value) => {
                    out.push_str(&value);
                    continue;
                }
                Resolution::Cancelled => return Resolution::Cancelled,
                Resolution::Absent => {}
            }

            if let Some(value) = self.info.and_then(|info| info.default_value(&target)) {
                out.push_str(value);
                continue;
            }

            match &expression.default {
                Some(default) => match self.resolve_segments(default, profile, cancel, visiting) {
                    Resolution::Resolved(value) => out.push_str(&value),
                    other => return other,
                },
                None => {
                    debug!(reference = %expression.name, "unresolved reference without default");
                    return Resolution::Absent;
                }
            }
        }

        Resolution::Resolved(out)
    }
}
