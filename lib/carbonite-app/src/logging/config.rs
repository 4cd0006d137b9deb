use carbonite_config::{deser::PermissiveBool, GenericConfiguration};
use carbonite_error::{generic_error, ErrorContext as _, GenericError};
use serde::Deserialize;
use serde_with::serde_as;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

fn default_log_level() -> LogLevel {
    LevelFilter::INFO.into()
}

/// Logging configuration.
#[serde_as]
#[derive(Deserialize)]
pub struct LoggingConfiguration {
    /// Log level filtering directives.
    ///
    /// Accepts anything `EnvFilter` does: a bare level (`debug`) or per-target directives
    /// (`info,carbonite_templates=trace`).
    ///
    /// Defaults to `info`.
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// Whether or not to emit logs as JSON.
    ///
    /// Defaults to `false`.
    #[serde_as(as = "PermissiveBool")]
    #[serde(default)]
    pub log_format_json: bool,
}

impl LoggingConfiguration {
    /// Creates a new `LoggingConfiguration` from the given configuration.
    ///
    /// # Errors
    ///
    /// If the configuration cannot be deserialized as `LoggingConfiguration`, an error is returned.
    pub fn from_configuration(config: &GenericConfiguration) -> Result<Self, GenericError> {
        config
            .as_typed()
            .error_context("Failed to load logging configuration.")
    }
}

impl Default for LoggingConfiguration {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format_json: false,
        }
    }
}

/// A validated set of log level filtering directives.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(try_from = "String")]
pub struct LogLevel {
    directives: String,
}

impl LogLevel {
    /// Returns the filtering directives as written.
    pub fn directives(&self) -> &str {
        &self.directives
    }

    /// Returns the filtering directives as an `EnvFilter`.
    pub fn as_env_filter(&self) -> EnvFilter {
        // Directives were validated on construction, so nothing is dropped here.
        EnvFilter::builder().parse_lossy(&self.directives)
    }
}

impl From<LevelFilter> for LogLevel {
    fn from(level: LevelFilter) -> Self {
        Self {
            directives: level.to_string(),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = GenericError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Err(generic_error!("Log level cannot be empty."));
        }

        EnvFilter::builder()
            .parse(&value)
            .error_context("Failed to parse valid log level.")?;

        Ok(Self { directives: value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: LoggingConfiguration = serde_json::from_str("{}").unwrap();
        assert!(!config.log_format_json);
        assert_eq!(config.log_level.as_env_filter().to_string(), "info");
    }

    #[test]
    fn parses_directives_and_permissive_flags() {
        let config: LoggingConfiguration =
            serde_json::from_str(r#"{"log_level": "carbonite_templates=trace", "log_format_json": "true"}"#).unwrap();
        assert!(config.log_format_json);
        assert_eq!(
            config.log_level.as_env_filter().to_string(),
            "carbonite_templates=trace"
        );
    }

    #[test]
    fn rejects_empty_level() {
        assert!(serde_json::from_str::<LoggingConfiguration>(r#"{"log_level": " "}"#).is_err());
    }

    #[test]
    fn rejects_invalid_directives_up_front() {
        assert!(LogLevel::try_from("carbonite_templates=loud".to_string()).is_err());
        assert!(serde_json::from_str::<LoggingConfiguration>(r#"{"log_level": "carbonite=loud"}"#).is_err());
    }

    #[test]
    fn rebuilt_filter_keeps_every_directive() {
        let level = LogLevel::try_from("warn,carbonite_templates=trace".to_string()).unwrap();
        assert_eq!(level.directives(), "warn,carbonite_templates=trace");

        let rendered = level.as_env_filter().to_string();
        assert!(rendered.contains("carbonite_templates=trace"), "got '{}'", rendered);
        assert!(rendered.contains("warn"), "got '{}'", rendered);

        // Rebuilding is repeatable.
        assert_eq!(level.as_env_filter().to_string(), rendered);

        let level = LogLevel::from(LevelFilter::DEBUG);
        assert_eq!(level.as_env_filter().to_string(), "debug");
    }
}
