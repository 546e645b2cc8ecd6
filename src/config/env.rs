use super::source::{ConfigSource, PropertyInformation, PropertyTable};
use crate::model::key::env_var_candidates;

/// Environment variables as a configuration source.
///
/// Properties are found with the MicroProfile mapping (`quarkus.http.port`
/// also matches `quarkus_http_port` and `QUARKUS_HTTP_PORT`). Variables are
/// not property keys, so they add nothing to the reference graph.
#[derive(Debug, Clone)]
pub struct EnvSource {
    vars: PropertyTable,
    ordinal: i32,
}

impl EnvSource {
    pub const DEFAULT_ORDINAL: i32 = 300;

    /// Snapshot of the current process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: PropertyTable = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        let ordinal = vars.ordinal_override().unwrap_or(Self::DEFAULT_ORDINAL);
        Self { vars, ordinal }
    }
}

impl ConfigSource for EnvSource {
    fn name(&self) -> &str {
        "EnvConfigSource"
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn table(&self) -> &PropertyTable {
        &self.vars
    }

    fn property(&self, key: &str) -> Option<String> {
        env_var_candidates(key)
            .iter()
            .find_map(|candidate| self.vars.get(candidate))
            .map(str::to_string)
    }

    fn property_informations(&self, key: &str) -> Vec<PropertyInformation> {
        self.property(key)
            .map(|value| PropertyInformation {
                property_name_with_profile: key.to_string(),
                profile: None,
                value,
                source: self.name().to_string(),
                ordinal: self.ordinal,
            })
            .into_iter()
            .collect()
    }

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_mapping() {
        let source = EnvSource::from_vars([("QUARKUS_HTTP_PORT", "9090"), ("app_name", "demo")]);
        assert_eq!(source.ordinal(), 300);
        assert_eq!(source.property("quarkus.http.port").as_deref(), Some("9090"));
        assert_eq!(source.property("app.name").as_deref(), Some("demo"));
        assert_eq!(source.property("missing"), None);
        assert!(source.keys().is_empty());
    }

    #[test]
    fn test_exact_name_wins() {
        let source = EnvSource::from_vars([("a.b", "exact"), ("A_B", "upper")]);
        assert_eq!(source.property("a.b").as_deref(), Some("exact"));
    }

    #[test]
    fn test_property_informations() {
        let source = EnvSource::from_vars([("GREETING", "hello")]);
        let infos = source.property_informations("greeting");
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].value, "hello");
        assert_eq!(infos[0].source, "EnvConfigSource");
        assert!(source.property_informations("other").is_empty());
    }

    #[test]
    fn test_config_ordinal_override() {
        let source = EnvSource::from_vars([("config_ordinal", "50")]);
        assert_eq!(source.ordinal(), 50);
    }
}
