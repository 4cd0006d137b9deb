use carbonite_config::GenericConfiguration;
use carbonite_error::{ErrorContext as _, GenericError};
use carbonite_templates::{GraphiteConfiguration, TemplateSet};
use tracing::info;

use super::output_lines;

/// Entrypoint for the `validate` command.
pub async fn handle_validate_command(configuration: &GenericConfiguration) -> Result<(), GenericError> {
    let graphite = GraphiteConfiguration::from_configuration(configuration)?;
    let set = graphite
        .build_template_set()
        .error_context("Graphite configuration is invalid.")?;

    info!(
        templates = set.len(),
        default_tags = set.default_tags().len(),
        "Graphite configuration is valid."
    );

    output_lines(describe_template_set(&set))
        .await
        .error_context("Failed to write templates to stdout.")
}

/// Renders one line per template, in configuration order, followed by the default tags.
fn describe_template_set(set: &TemplateSet) -> Vec<String> {
    let mut lines = set
        .templates()
        .iter()
        .enumerate()
        .map(|(position, template)| {
            let specificity = template.specificity();
            format!(
                "{}: {} (literals: {}, segments: {})",
                position,
                template,
                specificity.literals(),
                specificity.segments()
            )
        })
        .collect::<Vec<_>>();

    if !set.default_tags().is_empty() {
        let tags = set
            .default_tags()
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>();
        lines.push(format!("default tags: {}", tags.join(",")));
    }

    lines
}
