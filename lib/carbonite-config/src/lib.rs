//! Configuration loading.
//!
//! Configuration comes from an optional file (YAML or JSON) and from prefixed environment variables, with the
//! environment taking precedence. The merged result is kept in a generic, queryable form so that each part of the
//! application can pull out just the section it cares about.
#![deny(warnings)]
#![deny(missing_docs)]

use std::{path::Path, sync::Arc};

use carbonite_error::GenericError;
use figment::{
    error::Kind,
    providers::{Env, Serialized},
    Figment, Provider as _,
};
use serde::Deserialize;
use snafu::Snafu;
use tracing::debug;

pub mod deser;

mod provider;
pub use self::provider::FileFormat;
use self::provider::ResolvedProvider;

/// A configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ConfigurationError {
    /// Environment variable prefix was empty.
    #[snafu(display("Environment variable prefix must not be empty."))]
    EmptyPrefix,

    /// Requested field was missing from the configuration.
    #[snafu(display("Missing field '{}' in configuration. {}", field, help_text))]
    MissingField {
        /// Period-separated path to the missing field.
        field: String,

        /// Where the field can be set.
        help_text: String,
    },

    /// Requested field had a different data type than expected.
    #[snafu(display(
        "Expected value for field '{}' to be '{}', got '{}' instead.",
        field,
        expected_ty,
        actual_ty
    ))]
    InvalidFieldType {
        /// Period-separated path to the invalid field.
        field: String,

        /// Expected data type.
        expected_ty: String,

        /// Actual data type.
        actual_ty: String,
    },

    /// Generic configuration error.
    #[snafu(display("Failed to load configuration: {}", source))]
    Generic {
        /// Error source.
        source: GenericError,
    },
}

impl From<figment::Error> for ConfigurationError {
    fn from(e: figment::Error) -> Self {
        convert_figment_error(None, e)
    }
}

/// Builds a configuration from a file and the environment.
///
/// Sources added later take precedence over sources added earlier. Tables are merged key by key, and arrays from later
/// sources are appended to arrays from earlier ones.
pub struct ConfigurationLoader {
    figment: Figment,
    env_prefix: Option<String>,
}

impl Default for ConfigurationLoader {
    fn default() -> Self {
        Self {
            figment: Figment::new(),
            env_prefix: None,
        }
    }
}

impl ConfigurationLoader {
    /// Loads the given configuration file.
    ///
    /// The format is picked with [`FileFormat::from_path`]. The file is read immediately.
    ///
    /// # Errors
    ///
    /// If the file could not be read or parsed, an error will be returned.
    pub fn from_file<P>(mut self, path: P) -> Result<Self, ConfigurationError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let format = FileFormat::from_path(path);
        let provider = ResolvedProvider::from_path(path, format)?;
        debug!(file_path = %path.display(), ?format, "Loaded configuration file.");

        self.figment = self.figment.admerge(provider);
        Ok(self)
    }

    /// Loads configuration from environment variables.
    ///
    /// An underscore is appended to the prefix unless it already ends with one, so the prefix `carbonite` matches
    /// every variable starting with `CARBONITE_`. Keys are lowercased, and a double underscore (`__`) splits a key into
    /// a nested path: `CARBONITE_GRAPHITE__SEPARATOR` sets `graphite.separator`.
    ///
    /// # Errors
    ///
    /// If the prefix is empty, or the environment could not be read, an error will be returned.
    pub fn from_environment(mut self, prefix: &str) -> Result<Self, ConfigurationError> {
        if prefix.is_empty() {
            return Err(ConfigurationError::EmptyPrefix);
        }

        let mut prefix = prefix.to_uppercase();
        if !prefix.ends_with('_') {
            prefix.push('_');
        }

        // Snapshot the variables now so that later changes to the environment are never observed.
        let values = Env::prefixed(&prefix).split("__").data()?;
        if let Some(dict) = values.get(&figment::Profile::Default) {
            debug!(%prefix, keys = dict.len(), "Loaded configuration from environment.");
            self.figment = self.figment.admerge(Serialized::defaults(dict.clone()));
        }

        self.env_prefix = Some(prefix);
        Ok(self)
    }

    /// Consumes the loader and returns the merged configuration.
    pub fn into_generic(self) -> GenericConfiguration {
        GenericConfiguration {
            inner: Arc::new(Inner {
                figment: self.figment,
                env_prefix: self.env_prefix,
            }),
        }
    }
}

#[derive(Debug)]
struct Inner {
    figment: Figment,
    env_prefix: Option<String>,
}

/// A merged, read-only configuration.
///
/// Keys use periods (`.`) to reach nested values, so with the YAML configuration below, `graphite.separator` is `"_"`
/// and `graphite` is the whole table.
///
/// ```yaml
/// graphite:
///   separator: "_"
/// ```
///
/// Cloning is cheap, and all clones share the same underlying values.
#[derive(Clone, Debug)]
pub struct GenericConfiguration {
    inner: Arc<Inner>,
}

impl GenericConfiguration {
    /// Gets a configuration value by key, if it exists.
    ///
    /// # Errors
    ///
    /// If the key exists but the value could not be deserialized into `T`, an error will be returned.
    pub fn try_get_typed<'a, T>(&self, key: &str) -> Result<Option<T>, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        match self.inner.figment.extract_inner(key) {
            Ok(value) => Ok(Some(value)),
            Err(e) => match self.convert_error(e) {
                ConfigurationError::MissingField { .. } => Ok(None),
                e => Err(e),
            },
        }
    }

    /// Deserializes the entire configuration as `T`.
    ///
    /// # Errors
    ///
    /// If the configuration could not be deserialized into `T`, an error will be returned.
    pub fn as_typed<'a, T>(&self) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        self.inner.figment.extract().map_err(|e| self.convert_error(e))
    }

    fn convert_error(&self, e: figment::Error) -> ConfigurationError {
        convert_figment_error(self.inner.env_prefix.as_deref(), e)
    }
}

fn convert_figment_error(env_prefix: Option<&str>, e: figment::Error) -> ConfigurationError {
    match e.kind {
        Kind::MissingField(field) => {
            let field = if e.path.is_empty() {
                field.into_owned()
            } else {
                format!("{}.{}", e.path.join("."), field)
            };
            let help_text = missing_field_help(env_prefix, &field);
            ConfigurationError::MissingField { field, help_text }
        }
        Kind::InvalidType(actual_ty, expected_ty) => ConfigurationError::InvalidFieldType {
            field: e.path.join("."),
            expected_ty,
            actual_ty: actual_ty.to_string(),
        },
        _ => ConfigurationError::Generic { source: e.into() },
    }
}

fn missing_field_help(env_prefix: Option<&str>, field: &str) -> String {
    match env_prefix {
        Some(prefix) => format!(
            "Set `{}` in the configuration file, or `{}{}` in the environment.",
            field,
            prefix,
            field.replace('.', "__").to_uppercase()
        ),
        None => format!("Set `{}` in the configuration file.", field),
    }
}
