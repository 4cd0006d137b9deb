use std::path::Path;

use carbonite_config::{ConfigurationLoader, GenericConfiguration};
use carbonite_error::{ErrorContext as _, GenericError};
use tokio::io::{self, AsyncWriteExt as _};

mod config;
pub use self::config::handle_config_command;

mod decode;
pub use self::decode::handle_decode_command;

mod validate;
pub use self::validate::handle_validate_command;

const ENVIRONMENT_PREFIX: &str = "carbonite";

/// Loads the configuration from the given file, if any, and from the environment.
///
/// Environment variables take precedence over the configuration file.
pub fn load_configuration(config_path: Option<&Path>) -> Result<GenericConfiguration, GenericError> {
    let mut loader = ConfigurationLoader::default();
    if let Some(path) = config_path {
        loader = loader
            .from_file(path)
            .with_error_context(|| format!("Failed to load configuration file '{}'.", path.display()))?;
    }

    let configuration = loader
        .from_environment(ENVIRONMENT_PREFIX)
        .error_context("Failed to load configuration from environment.")?
        .into_generic();

    Ok(configuration)
}

async fn output_lines<I, L>(lines: I) -> io::Result<()>
where
    I: IntoIterator<Item = L>,
    L: AsRef<str>,
{
    let mut stdout = io::stdout();
    for line in lines {
        stdout.write_all(line.as_ref().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await
}
