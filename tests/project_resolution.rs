use std::cell::Cell;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use mp_properties::config::{ConfigSourceProvider, EnvSource, PropertiesSource};
use mp_properties::resolve::{Layered, PropertyLookup};
use mp_properties::{
    parse, Cancellation, ConfigError, ConfigSource, MemorySource, Project, ProjectInfo, PropertyGraph, Resolution,
    Resolver,
};

/// Provider whose contents can be edited between loads.
#[derive(Debug, Clone, Default)]
struct EditableProvider {
    state: Arc<EditableState>,
}

#[derive(Debug, Default)]
struct EditableState {
    files: Mutex<Vec<(String, i32, String)>>,
    loads: AtomicUsize,
}

impl EditableProvider {
    fn set(&self, name: &str, ordinal: i32, text: &str) {
        let mut files = self.state.files.lock().unwrap();
        files.retain(|(existing, _, _)| existing != name);
        files.push((name.to_string(), ordinal, text.to_string()));
    }

    fn loads(&self) -> usize {
        self.state.loads.load(Ordering::SeqCst)
    }
}

impl ConfigSourceProvider for EditableProvider {
    fn config_sources(&self, origin: &Path) -> Result<Vec<Arc<dyn ConfigSource>>, ConfigError> {
        self.state.loads.fetch_add(1, Ordering::SeqCst);
        let files = self.state.files.lock().unwrap();
        Ok(files
            .iter()
            .map(|(name, ordinal, text)| {
                Arc::new(PropertiesSource::from_text(origin.join(name), *ordinal, None, text)) as Arc<dyn ConfigSource>
            })
            .collect())
    }
}

#[derive(Debug)]
struct BrokenProvider;

impl ConfigSourceProvider for BrokenProvider {
    fn config_sources(&self, origin: &Path) -> Result<Vec<Arc<dyn ConfigSource>>, ConfigError> {
        Err(ConfigError::FileNotFound(origin.to_path_buf()))
    }
}

/// Provider that signals a change while its first load is still running.
#[derive(Debug, Clone, Default)]
struct EvictingProvider {
    project: Arc<OnceLock<Weak<Project>>>,
    armed: Arc<AtomicBool>,
    loads: Arc<AtomicUsize>,
}

impl ConfigSourceProvider for EvictingProvider {
    fn config_sources(&self, origin: &Path) -> Result<Vec<Arc<dyn ConfigSource>>, ConfigError> {
        let load = self.loads.fetch_add(1, Ordering::SeqCst);
        if self.armed.swap(false, Ordering::SeqCst) {
            if let Some(project) = self.project.get().and_then(Weak::upgrade) {
                project.evict_config_sources_cache();
            }
        }
        let text = format!("load={load}");
        Ok(vec![Arc::new(PropertiesSource::from_text(
            origin.join("application.properties"),
            250,
            None,
            &text,
        ))])
    }
}

fn project_with(provider: &EditableProvider) -> Project {
    Project::builder()
        .with_origin("target/classes")
        .with_provider(provider.clone())
        .build()
        .unwrap()
}

fn resolve(project: &Project, key: &str) -> Resolution {
    project.resolve(key, &ProjectInfo::default(), &Cancellation::new())
}

#[test]
fn test_cycle_across_sources_resolves_to_absent() {
    let provider = EditableProvider::default();
    provider.set("microprofile-config.properties", 100, "a=${b}");
    provider.set("application.properties", 250, "b=${a}\nc=plain");
    let project = project_with(&provider);

    assert!(!project.config_sources().graph().is_acyclic());
    assert_eq!(resolve(&project, "a"), Resolution::Absent);
    assert_eq!(resolve(&project, "b"), Resolution::Absent);
    assert_eq!(resolve(&project, "c"), Resolution::Absent);
}

#[test]
fn test_default_then_defined_after_eviction() {
    let provider = EditableProvider::default();
    provider.set("application.properties", 250, "greeting=${name:World}");
    let project = project_with(&provider);
    assert_eq!(resolve(&project, "greeting"), Resolution::Resolved("World".into()));

    provider.set("application.properties", 250, "greeting=${name:World}\nname=Universe");
    // Still cached until the change is signalled.
    assert_eq!(resolve(&project, "greeting"), Resolution::Resolved("World".into()));

    project.evict_config_sources_cache();
    assert_eq!(resolve(&project, "greeting"), Resolution::Resolved("Universe".into()));
}

#[test]
fn test_ordinal_override() {
    let provider = EditableProvider::default();
    provider.set("a.properties", 100, "x=1");
    provider.set("b.properties", 200, "x=2");
    let project = project_with(&provider);

    assert_eq!(project.get_property("x").as_deref(), Some("2"));
    assert_eq!(project.get_property_as_int("x"), Some(2));
    let infos = project.property_informations("x");
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].value, "2");
    assert_eq!(infos[0].ordinal, 200);
    assert!(infos[0].source.ends_with("b.properties"));
}

#[test]
fn test_property_informations_sorted_by_qualified_name() {
    let provider = EditableProvider::default();
    provider.set("mp.properties", 100, "%test.port=1\nport=2");
    provider.set("app.properties", 250, "%dev.port=3\nport=4");
    let project = project_with(&provider);

    let names: Vec<String> = project
        .property_informations("port")
        .into_iter()
        .map(|info| format!("{}={}", info.property_name_with_profile, info.value))
        .collect();
    assert_eq!(names, vec!["%dev.port=3", "%test.port=1", "port=4"]);
    assert!(project.has_property("port"));
    assert!(!project.has_property("host"));
}

#[test]
fn test_profile_reference_resolution() {
    let provider = EditableProvider::default();
    provider.set(
        "application.properties",
        250,
        "host=prod\n%dev.host=localhost\nurl=http://${host}:${port:8080}\n%dev.url=http://${host}:${port:8080}",
    );
    let project = project_with(&provider);
    assert_eq!(resolve(&project, "url"), Resolution::Resolved("http://prod:8080".into()));
    assert_eq!(resolve(&project, "%dev.url"), Resolution::Resolved("http://localhost:8080".into()));
}

#[test]
fn test_eviction_triggers_reload() {
    let provider = EditableProvider::default();
    provider.set("application.properties", 250, "a=1");
    let project = project_with(&provider);

    let first = project.config_sources();
    let again = project.config_sources();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(provider.loads(), 1);

    project.evict_config_sources_cache();
    let rebuilt = project.config_sources();
    assert!(!Arc::ptr_eq(&first, &rebuilt));
    assert_eq!(provider.loads(), 2);
    assert_eq!(rebuilt.generation(), project.generation());
}

#[test]
fn test_concurrent_rebuilds_converge() {
    let provider = EditableProvider::default();
    provider.set("a.properties", 100, "x=1");
    provider.set("b.properties", 200, "x=2");
    let project = project_with(&provider);

    std::thread::scope(|scope| {
        for i in 0..8 {
            let project = &project;
            scope.spawn(move || {
                for _ in 0..50 {
                    if i % 2 == 0 {
                        project.evict_config_sources_cache();
                    }
                    let set = project.config_sources();
                    assert_eq!(set.len(), 2);
                    assert_eq!(set.get_property("x").as_deref(), Some("2"));
                }
            });
        }
    });

    let set = project.config_sources();
    assert_eq!(set.len(), 2);
    assert!(Arc::ptr_eq(&set, &project.config_sources()));
}

#[test]
fn test_rebuild_overlapping_eviction_is_not_published() {
    let provider = EvictingProvider::default();
    provider.armed.store(true, Ordering::SeqCst);
    let project = Arc::new(
        Project::builder()
            .with_origin("target/classes")
            .with_provider(provider.clone())
            .build()
            .unwrap(),
    );
    provider.project.set(Arc::downgrade(&project)).unwrap();

    let stale = project.config_sources();
    assert_eq!(stale.generation(), 0);
    assert_eq!(project.generation(), 1);
    assert_eq!(stale.get_property("load").as_deref(), Some("0"));
    assert_eq!(provider.loads.load(Ordering::SeqCst), 1);

    let fresh = project.config_sources();
    assert!(!Arc::ptr_eq(&stale, &fresh));
    assert_eq!(provider.loads.load(Ordering::SeqCst), 2);
    assert_eq!(fresh.generation(), project.generation());
    assert_eq!(fresh.get_property("load").as_deref(), Some("1"));

    assert!(Arc::ptr_eq(&fresh, &project.config_sources()));
    assert_eq!(provider.loads.load(Ordering::SeqCst), 2);
}

#[test]
fn test_concurrent_first_access_loads_once() {
    let provider = EditableProvider::default();
    provider.set("a.properties", 100, "x=1");
    let project = project_with(&provider);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| project.config_sources());
        }
    });
    assert_eq!(provider.loads(), 1);
}

#[test]
fn test_broken_provider_does_not_hide_others() {
    let provider = EditableProvider::default();
    provider.set("application.properties", 250, "a=1");
    let project = Project::builder()
        .with_origin("target/classes")
        .with_provider(BrokenProvider)
        .with_provider(provider.clone())
        .build()
        .unwrap();

    assert_eq!(project.get_property("a").as_deref(), Some("1"));
}

#[test]
fn test_env_source_overrides_files() {
    let provider = EditableProvider::default();
    provider.set("application.properties", 250, "quarkus.http.port=8080\nurl=http://localhost:${quarkus.http.port}");
    let project = Project::builder()
        .with_origin("target/classes")
        .with_provider(provider.clone())
        .with_source(EnvSource::from_vars([("QUARKUS_HTTP_PORT", "9090")]))
        .build()
        .unwrap();

    assert_eq!(project.get_property_as_int("quarkus.http.port"), Some(9090));
    assert_eq!(resolve(&project, "url"), Resolution::Resolved("http://localhost:9090".into()));
}

#[test]
fn test_env_self_reference_terminates() {
    let project = Project::builder()
        .with_source(EnvSource::from_vars([("LOOP", "${loop}")]))
        .build()
        .unwrap();
    assert_eq!(resolve(&project, "loop"), Resolution::Absent);
}

#[test]
fn test_project_info_defaults_are_last_resort() {
    let project = Project::builder()
        .with_source(MemorySource::new("mem", 250).with_property("url", "http://${quarkus.http.host}:${quarkus.http.port}"))
        .with_source(MemorySource::new("mem2", 100).with_property("quarkus.http.port", "8081"))
        .build()
        .unwrap();
    let info: ProjectInfo = serde_json::from_str(
        r#"{ "properties": [
            { "name": "quarkus.http.host", "defaultValue": "0.0.0.0" },
            { "name": "quarkus.http.port", "defaultValue": "8080" }
        ] }"#,
    )
    .unwrap();

    let resolution = project.resolve("url", &info, &Cancellation::new());
    assert_eq!(resolution, Resolution::Resolved("http://0.0.0.0:8081".into()));
}

#[test]
fn test_resolve_in_open_document() {
    let provider = EditableProvider::default();
    provider.set("application.properties", 250, "name=saved\ngreeting=old");
    let project = project_with(&provider);

    let editing = parse("greeting=Hello ${name}\n%dev.name=dev");
    let info = ProjectInfo::default();
    let cancel = Cancellation::new();
    assert_eq!(
        project.resolve_in_document(&editing, "greeting", &info, &cancel),
        Resolution::Resolved("Hello saved".into())
    );

    let editing = parse("greeting=${greeting}");
    assert_eq!(
        project.resolve_in_document(&editing, "greeting", &info, &cancel),
        Resolution::Absent
    );
}

/// Lookup that cancels its token after a number of reads.
struct CancellingLookup<'a> {
    inner: &'a dyn PropertyLookup,
    cancel: &'a Cancellation,
    remaining: Cell<usize>,
}

impl PropertyLookup for CancellingLookup<'_> {
    fn raw_value(&self, key: &str) -> Option<String> {
        match self.remaining.get() {
            0 => self.cancel.cancel(),
            n => self.remaining.set(n - 1),
        }
        self.inner.raw_value(key)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

#[test]
fn test_cancellation_during_deep_chain() {
    let text: String = (0..200).map(|i| format!("k{i}=${{k{}}}\n", i + 1)).collect::<String>() + "k200=end";
    let doc = parse(&text);
    let graph = PropertyGraph::build(&doc);
    assert!(graph.is_acyclic());

    let cancel = Cancellation::new();
    assert_eq!(
        Resolver::new(&doc, &graph).resolve("k0", &cancel),
        Resolution::Resolved("end".into())
    );

    let lookup = CancellingLookup {
        inner: &doc,
        cancel: &cancel,
        remaining: Cell::new(10),
    };
    let resolution = Resolver::new(&lookup, &graph).resolve("k0", &cancel);
    assert_eq!(resolution, Resolution::Cancelled);
}

#[test]
fn test_layered_document_over_project() {
    let project = Project::builder()
        .with_source(MemorySource::new("mem", 250).with_property("a", "project"))
        .build()
        .unwrap();
    let doc = parse("b=${a}-doc");
    let set = project.config_sources();
    let layered = Layered::new().with(&doc).with(&*set);
    let graph = PropertyGraph::build(&layered);
    assert_eq!(
        Resolver::new(&layered, &graph).resolve("b", &Cancellation::new()),
        Resolution::Resolved("project-doc".into())
    );
}
