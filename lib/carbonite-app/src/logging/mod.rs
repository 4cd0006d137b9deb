//! Logging.

use carbonite_error::{generic_error, GenericError};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, Layer as _};

mod config;
pub use self::config::{LogLevel, LoggingConfiguration};

mod layer;
use self::layer::build_formatting_layer;

/// Logs a message to standard error and exits the process with a non-zero exit code.
pub fn fatal_and_exit(message: String) -> ! {
    eprintln!("FATAL: {}", message);
    std::process::exit(1);
}

/// Initializes the logging subsystem for `tracing`.
///
/// Events are filtered by the configured log level (any valid `EnvFilter` directive string), and written to standard
/// error, either as JSON (one object per line) or in a pipe-delimited, human-readable format. Standard output is left
/// untouched so that commands can use it for their own output.
///
/// # Errors
///
/// If the logging subsystem was already initialized, an error will be returned.
pub fn initialize_logging(config: &LoggingConfiguration) -> Result<(), GenericError> {
    let level_filter = config.log_level.as_env_filter();

    tracing_subscriber::registry()
        .with(build_formatting_layer(config, std::io::stderr).with_filter(level_filter))
        .try_init()
        .map_err(|e| generic_error!("Failed to initialize logging: {}", e))
}
