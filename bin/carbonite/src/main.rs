//! Graphite template tooling.
//!
//! Validates Graphite template configuration, and decodes Graphite lines into measurements and tags using it.

#![deny(warnings)]
#![deny(missing_docs)]

use carbonite_app::prelude::*;
use carbonite_config::GenericConfiguration;
use carbonite_error::GenericError;
use clap::Parser as _;
use tracing::error;

mod cli;
use self::cli::{handle_config_command, handle_decode_command, handle_validate_command, load_configuration};

mod config;
use self::config::{Action, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let configuration = load_configuration(cli.config_path.as_deref())
        .unwrap_or_else(|e| fatal_and_exit(format!("failed to load configuration: {:#}", e)));

    let mut logging_config = LoggingConfiguration::from_configuration(&configuration)
        .unwrap_or_else(|e| fatal_and_exit(format!("failed to load logging configuration: {:#}", e)));
    if let Some(level) = cli.log_level() {
        logging_config.log_level = level.into();
    }

    if let Err(e) = initialize_logging(&logging_config) {
        fatal_and_exit(format!("failed to initialize logging: {}", e));
    }

    if let Err(e) = run(cli, configuration).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, configuration: GenericConfiguration) -> Result<(), GenericError> {
    match cli.action {
        Action::Validate => handle_validate_command(&configuration).await,
        Action::Config => handle_config_command(&configuration).await,
        Action::Decode(decode_config) => handle_decode_command(cli.config_path, &configuration, decode_config).await,
    }
}
