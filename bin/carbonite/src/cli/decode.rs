use std::path::{Path, PathBuf};

use carbonite_config::GenericConfiguration;
use carbonite_error::{generic_error, ErrorContext as _, GenericError};
use carbonite_templates::{ActiveTemplates, DecodedRecord, GraphiteConfiguration, MatchError};
use serde::Serialize;
use tokio::{
    fs::File,
    io::{self, AsyncBufRead, AsyncBufReadExt as _, AsyncWriteExt as _, BufReader},
};
use tracing::{debug, info, warn};

use super::load_configuration;
use crate::config::DecodeConfig;

/// A decoded Graphite line.
#[derive(Debug, PartialEq, Serialize)]
struct DecodedLine {
    #[serde(flatten)]
    record: DecodedRecord,

    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,
}

#[derive(Debug, PartialEq)]
enum LineOutcome {
    Blank,
    Decoded(DecodedLine),
    Malformed(String),
    Unmatched(MatchError),
}

#[derive(Default)]
struct DecodeStats {
    decoded: u64,
    malformed: u64,
    unmatched: u64,
}

/// Entrypoint for the `decode` command.
pub async fn handle_decode_command(
    config_path: Option<PathBuf>, configuration: &GenericConfiguration, decode_config: DecodeConfig,
) -> Result<(), GenericError> {
    let graphite = GraphiteConfiguration::from_configuration(configuration)?;
    if graphite.templates.is_empty() {
        warn!("No Graphite templates configured. Every path will be reported as unmatched.");
    }

    let active =
        ActiveTemplates::from_configuration(&graphite).error_context("Graphite configuration is invalid.")?;
    info!(templates = graphite.templates.len(), "Loaded Graphite templates.");

    if let Some(path) = config_path {
        spawn_reload_on_hangup(path, active.clone())?;
    }

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &decode_config.input {
        Some(input) => {
            let file = File::open(input)
                .await
                .with_error_context(|| format!("Failed to open input file '{}'.", input.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    let stats = decode_lines(reader, &active).await?;
    info!(
        decoded = stats.decoded,
        malformed = stats.malformed,
        unmatched = stats.unmatched,
        "Finished decoding."
    );

    Ok(())
}

async fn decode_lines<R>(reader: R, active: &ActiveTemplates) -> Result<DecodeStats, GenericError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stdout = io::stdout();
    let mut stats = DecodeStats::default();

    while let Some(line) = lines.next_line().await.error_context("Failed to read input.")? {
        match decode_line(active, &line) {
            LineOutcome::Blank => {}
            LineOutcome::Decoded(decoded) => {
                let mut buf = serde_json::to_vec(&decoded).error_context("Failed to serialize decoded line.")?;
                buf.push(b'\n');
                stdout.write_all(&buf).await.error_context("Failed to write to stdout.")?;
                stats.decoded += 1;
            }
            LineOutcome::Malformed(reason) => {
                debug!(%line, %reason, "Skipping malformed line.");
                stats.malformed += 1;
            }
            LineOutcome::Unmatched(e) => {
                debug!(error = %e, "Skipping unmatched path.");
                stats.unmatched += 1;
            }
        }
    }

    stdout.flush().await.error_context("Failed to flush stdout.")?;
    Ok(stats)
}

/// Decodes a single `<path> [<value> [<timestamp>]]` Graphite line.
fn decode_line(active: &ActiveTemplates, line: &str) -> LineOutcome {
    let mut fields = line.split_whitespace();
    let Some(path) = fields.next() else {
        return LineOutcome::Blank;
    };

    let value = match fields.next().map(str::parse::<f64>).transpose() {
        // JSON has no representation for NaN or infinity.
        Ok(Some(value)) if !value.is_finite() => {
            return LineOutcome::Malformed(format!("invalid value: {} is not finite", value))
        }
        Ok(value) => value,
        Err(e) => return LineOutcome::Malformed(format!("invalid value: {}", e)),
    };
    let timestamp = match fields.next().map(str::parse::<i64>).transpose() {
        Ok(timestamp) => timestamp,
        Err(e) => return LineOutcome::Malformed(format!("invalid timestamp: {}", e)),
    };
    if fields.next().is_some() {
        return LineOutcome::Malformed("too many fields".to_string());
    }

    match active.matches(path) {
        Ok(record) => LineOutcome::Decoded(DecodedLine {
            record,
            value,
            timestamp,
        }),
        Err(e) => LineOutcome::Unmatched(e),
    }
}

#[cfg(unix)]
fn spawn_reload_on_hangup(config_path: PathBuf, active: ActiveTemplates) -> Result<(), GenericError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).error_context("Failed to install SIGHUP handler.")?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!(config_path = %config_path.display(), "Received SIGHUP. Reloading Graphite templates...");
            if let Err(e) = reload_from_file(&config_path, &active) {
                warn!(error = %format!("{:#}", e), "Failed to reload Graphite templates. Keeping current templates.");
            }
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_config_path: PathBuf, _active: ActiveTemplates) -> Result<(), GenericError> {
    debug!("Configuration reloading is only supported on Unix platforms.");
    Ok(())
}

fn reload_from_file(config_path: &Path, active: &ActiveTemplates) -> Result<(), GenericError> {
    let configuration = load_configuration(Some(config_path))?;
    let graphite = GraphiteConfiguration::from_configuration(&configuration)?;
    active
        .reload(&graphite)
        .map_err(|e| generic_error!("Graphite configuration is invalid: {}", e))
}
