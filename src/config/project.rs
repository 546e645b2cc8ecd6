//! Effective configuration of a project across all of its sources.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use tracing::{debug, warn};

use super::provider::ConfigSourceProvider;
use super::source::{ConfigSource, PropertyInformation};
use crate::info::ProjectInfo;
use crate::model::Document;
use crate::resolve::{Cancellation, Layered, PropertyGraph, PropertyLookup, Resolution, Resolver};

/// Immutable snapshot of a project's sources, highest ordinal first.
///
/// Each snapshot carries the generation it was built for and lazily builds
/// its own reference graph, so an eviction never leaves a stale graph behind.
#[derive(Debug)]
pub struct SourceSet {
    generation: u64,
    sources: Vec<Arc<dyn ConfigSource>>,
    graph: OnceLock<PropertyGraph>,
}

impl SourceSet {
    /// Sorts by descending ordinal; equal ordinals keep discovery order.
    pub fn new(generation: u64, mut sources: Vec<Arc<dyn ConfigSource>>) -> Self {
        sources.sort_by(|a, b| b.ordinal().cmp(&a.ordinal()));
        Self {
            generation,
            sources,
            graph: OnceLock::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn sources(&self) -> &[Arc<dyn ConfigSource>] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn graph(&self) -> &PropertyGraph {
        self.graph.get_or_init(|| PropertyGraph::build(self))
    }

    /// First hit in precedence order.
    pub fn get_property(&self, key: &str) -> Option<String> {
        self.sources.iter().find_map(|source| source.property(key))
    }

    pub fn get_property_as_int(&self, key: &str) -> Option<i64> {
        self.sources.iter().find_map(|source| source.property_as_int(key))
    }

    /// The winning value of every profile variant of `key`, sorted by
    /// qualified name.
    pub fn property_informations(&self, key: &str) -> Vec<PropertyInformation> {
        let mut by_name = BTreeMap::new();
        // Lowest precedence first so higher ordinals overwrite.
        for source in self.sources.iter().rev() {
            for info in source.property_informations(key) {
                by_name.insert(info.property_name_with_profile.clone(), info);
            }
        }
        by_name.into_values().collect()
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.sources
            .iter()
            .any(|source| !source.property_informations(key).is_empty())
    }
}

impl PropertyLookup for SourceSet {
    fn raw_value(&self, key: &str) -> Option<String> {
        self.get_property(key)
    }

    fn keys(&self) -> Vec<String> {
        let keys: std::collections::BTreeSet<String> =
            self.sources.iter().flat_map(|source| source.keys()).collect();
        keys.into_iter().collect()
    }
}

/// Aggregates the config sources of one project.
///
/// Sources are discovered lazily, cached, and rebuilt after
/// [`evict_config_sources_cache`](Self::evict_config_sources_cache). Rebuilds
/// are serialized; a rebuild that raced with an eviction is handed to its
/// caller but never published.
#[derive(Debug)]
pub struct Project {
    origins: Vec<PathBuf>,
    providers: Vec<Arc<dyn ConfigSourceProvider>>,
    fixed: Vec<Arc<dyn ConfigSource>>,
    cache: RwLock<Option<Arc<SourceSet>>>,
    rebuild: Mutex<()>,
    generation: AtomicU64,
}

impl Project {
    pub(crate) fn from_parts(
        origins: Vec<PathBuf>,
        providers: Vec<Arc<dyn ConfigSourceProvider>>,
        fixed: Vec<Arc<dyn ConfigSource>>,
    ) -> Self {
        Self {
            origins,
            providers,
            fixed,
            cache: RwLock::new(None),
            rebuild: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn origins(&self) -> &[PathBuf] {
        &self.origins
    }

    /// Bumped on every eviction.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Current sources, loading them on first access.
    pub fn config_sources(&self) -> Arc<SourceSet> {
        match self.cached() {
            Some(set) => set,
            None => self.load_config_sources(),
        }
    }

    /// Drops the cached sources; the next access rebuilds them.
    pub fn evict_config_sources_cache(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = None;
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(generation, "evicted config sources");
    }

    fn cached(&self) -> Option<Arc<SourceSet>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn load_config_sources(&self) -> Arc<SourceSet> {
        let _rebuild = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have published while this one waited.
        if let Some(set) = self.cached() {
            return set;
        }

        let generation = self.generation();
        let set = Arc::new(SourceSet::new(generation, self.collect_sources()));

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if self.generation() == generation {
            *cache = Some(Arc::clone(&set));
            debug!(generation, sources = set.len(), "loaded config sources");
        } else {
            debug!(generation, "config sources evicted during rebuild; not publishing");
        }
        set
    }

    fn collect_sources(&self) -> Vec<Arc<dyn ConfigSource>> {
        let mut sources = self.fixed.clone();
        for origin in &self.origins {
            for provider in &self.providers {
                match provider.config_sources(origin) {
                    Ok(found) => sources.extend(found),
                    Err(error) => {
                        warn!(origin = %origin.display(), %error, "error while loading config sources");
                    }
                }
            }
        }
        sources
    }

    pub fn get_property(&self, key: &str) -> Option<String> {
        self.config_sources().get_property(key)
    }

    pub fn get_property_or(&self, key: &str, default: &str) -> String {
        self.get_property(key).unwrap_or_else(|| default.to_string())
    }

    pub fn get_property_as_int(&self, key: &str) -> Option<i64> {
        self.config_sources().get_property_as_int(key)
    }

    pub fn property_informations(&self, key: &str) -> Vec<PropertyInformation> {
        self.config_sources().property_informations(key)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.config_sources().has_property(key)
    }

    /// Resolves `key` against the project's sources, then `info` defaults.
    pub fn resolve(&self, key: &str, info: &ProjectInfo, cancel: &Cancellation) -> Resolution {
        let set = self.config_sources();
        Resolver::new(&*set, set.graph())
            .with_project_info(info)
            .resolve(key, cancel)
    }

    /// Resolves `key` with an open document layered over the project's
    /// sources, as when the document is being edited.
    pub fn resolve_in_document(
        &self,
        document: &Document,
        key: &str,
        info: &ProjectInfo,
        cancel: &Cancellation,
    ) -> Resolution {
        let set = self.config_sources();
        let layered = Layered::new().with(document).with(&*set);
        let graph = PropertyGraph::build(&layered);
        Resolver::new(&layered, &graph)
            .with_project_info(info)
            .resolve(key, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::source::MemorySource;

    fn set(sources: Vec<MemorySource>) -> SourceSet {
        SourceSet::new(
            0,
            sources
                .into_iter()
                .map(|s| Arc::new(s) as Arc<dyn ConfigSource>)
                .collect(),
        )
    }

    #[test]
    fn test_sorted_by_descending_ordinal() {
        let set = set(vec![
            MemorySource::new("low", 100),
            MemorySource::new("high", 300),
            MemorySource::new("tie-first", 200),
            MemorySource::new("tie-second", 200),
        ]);
        let names: Vec<&str> = set.sources().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["high", "tie-first", "tie-second", "low"]);
    }

    #[test]
    fn test_ordinal_override() {
        let set = set(vec![
            MemorySource::new("a", 100).with_property("x", "1"),
            MemorySource::new("b", 200).with_property("x", "2"),
        ]);
        assert_eq!(set.get_property("x").as_deref(), Some("2"));
        let infos = set.property_informations("x");
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].value, "2");
        assert_eq!(infos[0].source, "b");
    }

    #[test]
    fn test_property_informations_merges_profiles() {
        let set = set(vec![
            MemorySource::new("mp", 100)
                .with_property("greeting", "mp")
                .with_property("%test.greeting", "mp-test"),
            MemorySource::new("app", 250)
                .with_property("greeting", "app")
                .with_property("%dev.greeting", "app-dev"),
        ]);
        let infos: Vec<(String, String)> = set
            .property_informations("greeting")
            .into_iter()
            .map(|i| (i.property_name_with_profile, i.value))
            .collect();
        assert_eq!(
            infos,
            vec![
                ("%dev.greeting".to_string(), "app-dev".to_string()),
                ("%test.greeting".to_string(), "mp-test".to_string()),
                ("greeting".to_string(), "app".to_string()),
            ]
        );
    }

    #[test]
    fn test_tie_prefers_discovery_order() {
        let set = set(vec![
            MemorySource::new("first", 100).with_property("x", "1"),
            MemorySource::new("second", 100).with_property("x", "2"),
        ]);
        assert_eq!(set.get_property("x").as_deref(), Some("1"));
        assert_eq!(set.property_informations("x")[0].source, "first");
    }

    #[test]
    fn test_get_property_as_int_skips_non_numeric() {
        let set = set(vec![
            MemorySource::new("a", 100).with_property("port", "8080"),
            MemorySource::new("b", 200).with_property("port", "${p}"),
        ]);
        assert_eq!(set.get_property_as_int("port"), Some(8080));
    }

    #[test]
    fn test_has_property() {
        let set = set(vec![MemorySource::new("a", 100).with_property("%dev.only", "1")]);
        assert!(set.has_property("only"));
        assert!(!set.has_property("other"));
    }

    #[test]
    fn test_graph_spans_sources() {
        let set = set(vec![
            MemorySource::new("a", 100).with_property("a", "${b}"),
            MemorySource::new("b", 200).with_property("b", "${a}"),
        ]);
        assert!(!set.graph().is_acyclic());
    }
}
