use carbonite_config::{deser::PermissiveBool, GenericConfiguration};
use carbonite_error::{ErrorContext as _, GenericError};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::{TagMap, TemplateMatcher, TemplateSet, ValidationError, DEFAULT_SEPARATOR};

/// Default bind address for the Graphite listener.
pub const DEFAULT_BIND_ADDRESS: &str = ":2003";

/// Default database that decoded records are written to.
pub const DEFAULT_DATABASE: &str = "graphite";

/// Default transport protocol for the Graphite listener.
pub const DEFAULT_PROTOCOL: &str = "tcp";

/// Default write consistency level.
pub const DEFAULT_CONSISTENCY_LEVEL: &str = "one";

/// The configuration key the Graphite input is read from.
pub const CONFIGURATION_KEY: &str = "graphite";

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

fn default_consistency_level() -> String {
    DEFAULT_CONSISTENCY_LEVEL.to_string()
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

/// Graphite input configuration.
///
/// Only `templates`, `tags`, and `separator` are used when decoding paths. The remaining settings describe the
/// listener that receives Graphite lines and the writer that stores decoded records, and are carried here so that a
/// single configuration section describes the whole input.
#[serde_as]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GraphiteConfiguration {
    /// Address the listener binds to.
    ///
    /// Defaults to `:2003`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Database that decoded records are written to.
    ///
    /// Defaults to `graphite`.
    #[serde(default = "default_database")]
    pub database: String,

    /// Whether or not the input is enabled.
    ///
    /// Defaults to `false`.
    #[serde_as(deserialize_as = "PermissiveBool")]
    #[serde(default)]
    pub enabled: bool,

    /// Transport protocol the listener accepts (`tcp` or `udp`).
    ///
    /// Defaults to `tcp`.
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Number of decoded records the writer batches together.
    ///
    /// Defaults to `0`, which leaves batching up to the writer.
    #[serde(default)]
    pub batch_size: usize,

    /// Maximum time, in seconds, the writer holds a partial batch.
    ///
    /// Defaults to `0`, which leaves batching up to the writer.
    #[serde(default)]
    pub batch_timeout_secs: u64,

    /// Write consistency level requested from the storage backend.
    ///
    /// Defaults to `one`.
    #[serde(default = "default_consistency_level")]
    pub consistency_level: String,

    /// Templates, in configuration order.
    ///
    /// Each template is written as `[filter] pattern [tags]`. See [`TemplateSpec`][crate::TemplateSpec].
    ///
    /// Defaults to no templates.
    #[serde(default)]
    pub templates: Vec<String>,

    /// Tags, as `key=value`, added to every decoded record.
    ///
    /// Defaults to no tags.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Separator used to join the path segments absorbed by `measurement*`.
    ///
    /// Defaults to `.`.
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl GraphiteConfiguration {
    /// Creates a new `GraphiteConfiguration` from the `graphite` section of the given configuration.
    ///
    /// If the section is missing entirely, the default configuration is returned. The configuration is not validated.
    ///
    /// # Errors
    ///
    /// If the section exists but cannot be deserialized, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        let graphite = config
            .try_get_typed::<Self>(CONFIGURATION_KEY)
            .error_context("Failed to load Graphite configuration.")?
            .unwrap_or_default();
        Ok(graphite.with_defaults())
    }

    /// Returns a copy of this configuration with any empty settings replaced by their default value.
    pub fn with_defaults(&self) -> Self {
        let mut config = self.clone();
        for (value, default) in [
            (&mut config.bind_address, DEFAULT_BIND_ADDRESS),
            (&mut config.database, DEFAULT_DATABASE),
            (&mut config.protocol, DEFAULT_PROTOCOL),
            (&mut config.consistency_level, DEFAULT_CONSISTENCY_LEVEL),
            (&mut config.separator, DEFAULT_SEPARATOR),
        ] {
            if value.is_empty() {
                *value = default.to_string();
            }
        }
        config
    }

    /// Validates the configured templates and default tags.
    ///
    /// Validation has no side effects, and validating the same configuration always produces the same result.
    ///
    /// # Errors
    ///
    /// If any template or default tag is invalid, an error is returned describing the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        TemplateSet::validate(&self.templates, &self.tags)
    }

    /// Returns the default tags.
    ///
    /// # Errors
    ///
    /// If any default tag is invalid, an error is returned.
    pub fn default_tags(&self) -> Result<TagMap, ValidationError> {
        TemplateSet::from_config(&[] as &[&str], &self.tags).map(|set| set.default_tags().clone())
    }

    /// Validates the configured templates and default tags, and returns the parsed template set.
    ///
    /// # Errors
    ///
    /// If any template or default tag is invalid, an error is returned.
    pub fn build_template_set(&self) -> Result<TemplateSet, ValidationError> {
        TemplateSet::from_config(&self.templates, &self.tags)
    }

    /// Validates the configuration and builds a matcher from it.
    ///
    /// # Errors
    ///
    /// If any template or default tag is invalid, an error is returned.
    pub fn build_matcher(&self) -> Result<TemplateMatcher, ValidationError> {
        let separator = if self.separator.is_empty() {
            DEFAULT_SEPARATOR
        } else {
            self.separator.as_str()
        };

        self.build_template_set()
            .map(|set| TemplateMatcher::new(set).with_separator(separator))
    }
}

impl Default for GraphiteConfiguration {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            database: default_database(),
            enabled: false,
            protocol: default_protocol(),
            batch_size: 0,
            batch_timeout_secs: 0,
            consistency_level: default_consistency_level(),
            templates: Vec::new(),
            tags: Vec::new(),
            separator: default_separator(),
        }
    }
}

#[cfg(test)]
mod tests {
    use carbonite_config::ConfigurationLoader;
    use figment::Jail;

    use super::*;

    #[test]
    fn parse_from_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "carbonite.yaml",
                r#"
graphite:
  bind_address: ":8080"
  database: "mydb"
  enabled: true
  protocol: "tcp"
  batch_size: 100
  batch_timeout_secs: 1
  consistency_level: "one"
  templates:
    - "servers.* .host.measurement*"
  tags:
    - "region=us-east"
"#,
            )?;

            let config = ConfigurationLoader::default()
                .from_file("carbonite.yaml")
                .expect("YAML file should load")
                .into_generic();
            let graphite = GraphiteConfiguration::from_configuration(&config).expect("should deserialize");

            assert_eq!(graphite.bind_address, ":8080");
            assert_eq!(graphite.database, "mydb");
            assert!(graphite.enabled);
            assert_eq!(graphite.protocol, "tcp");
            assert_eq!(graphite.batch_size, 100);
            assert_eq!(graphite.batch_timeout_secs, 1);
            assert_eq!(graphite.consistency_level, "one");
            assert_eq!(graphite.templates, vec!["servers.* .host.measurement*".to_string()]);
            assert_eq!(graphite.tags, vec!["region=us-east".to_string()]);
            assert_eq!(graphite.separator, ".");
            assert!(graphite.validate().is_ok());
            assert_eq!(graphite.default_tags().unwrap()["region"], "us-east");
            Ok(())
        });
    }

    #[test]
    fn missing_section_uses_defaults() {
        let config = ConfigurationLoader::default().into_generic();
        let graphite = GraphiteConfiguration::from_configuration(&config).unwrap();
        assert_eq!(graphite, GraphiteConfiguration::default());
        assert_eq!(graphite.bind_address, DEFAULT_BIND_ADDRESS);
        assert!(!graphite.enabled);
    }

    #[test]
    fn with_defaults_fills_empty_settings() {
        let config = GraphiteConfiguration {
            bind_address: String::new(),
            database: String::new(),
            protocol: String::new(),
            consistency_level: String::new(),
            separator: String::new(),
            ..Default::default()
        };

        let config = config.with_defaults();
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.database, DEFAULT_DATABASE);
        assert_eq!(config.protocol, DEFAULT_PROTOCOL);
        assert_eq!(config.consistency_level, DEFAULT_CONSISTENCY_LEVEL);
        assert_eq!(config.separator, DEFAULT_SEPARATOR);
    }

    #[test]
    fn validation() {
        let mut config = GraphiteConfiguration {
            templates: vec!["".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.templates = vec!["measurement".to_string()];
        config.tags = vec!["foo".to_string()];
        assert!(config.validate().is_err());
        assert!(config.default_tags().is_err());

        config.tags = vec!["foo=bar".to_string()];
        assert!(config.validate().is_ok());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn build_matcher_applies_separator() {
        let config = GraphiteConfiguration {
            templates: vec!["measurement*".to_string()],
            separator: "_".to_string(),
            ..Default::default()
        };

        let matcher = config.build_matcher().unwrap();
        assert_eq!(matcher.matches("cpu.load").unwrap().measurement, "cpu_load");
    }
}
