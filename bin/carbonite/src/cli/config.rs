use carbonite_config::GenericConfiguration;
use carbonite_error::{ErrorContext as _, GenericError};
use carbonite_templates::GraphiteConfiguration;

use super::output_lines;

/// Entrypoint for the `config` command.
pub async fn handle_config_command(configuration: &GenericConfiguration) -> Result<(), GenericError> {
    let graphite = GraphiteConfiguration::from_configuration(configuration)?;
    let rendered =
        serde_json::to_string_pretty(&graphite).error_context("Failed to serialize Graphite configuration.")?;

    output_lines([rendered])
        .await
        .error_context("Failed to write configuration to stdout.")
}
