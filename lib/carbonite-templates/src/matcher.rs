use std::collections::BTreeMap;

use snafu::Snafu;
use tracing::trace;

use crate::{DecodedRecord, TemplateSet, TemplateSpec};

/// Separator used to join the path segments absorbed by `measurement*`.
pub const DEFAULT_SEPARATOR: &str = ".";

/// A path that no template could decode.
#[derive(Clone, Debug, Eq, PartialEq, Snafu)]
#[snafu(context(suffix(false)))]
pub enum MatchError {
    /// No template both matched the path and could decompose it.
    #[snafu(display("no template matched path '{}'", path))]
    NoTemplateMatched {
        /// The path that could not be decoded.
        path: String,
    },
}

/// Decodes paths against a template set.
///
/// For each path, templates whose filter is compatible with the path are tried in order of decreasing specificity,
/// with configuration order breaking ties. The first template whose pattern can decompose the path wins. Tags are then
/// merged, with later sources overriding earlier ones on key collision:
///
/// 1. default tags
/// 2. tags extracted from the path
/// 3. the winning template's static tags
///
/// The matcher holds no mutable state, so it can be shared freely between threads.
#[derive(Clone, Debug)]
pub struct TemplateMatcher {
    set: TemplateSet,
    ranked: Vec<usize>,
    separator: String,
}

impl TemplateMatcher {
    /// Creates a new `TemplateMatcher` for the given template set.
    pub fn new(set: TemplateSet) -> Self {
        let mut ranked = (0..set.len()).collect::<Vec<_>>();

        // Stable sort, so equally specific templates stay in configuration order.
        let templates = set.templates();
        ranked.sort_by(|a, b| templates[*b].specificity().cmp(&templates[*a].specificity()));

        Self {
            set,
            ranked,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    /// Sets the separator used to join path segments absorbed by `measurement*`.
    ///
    /// Defaults to `.`.
    pub fn with_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.separator = separator.into();
        self
    }

    /// Returns the underlying template set.
    pub fn template_set(&self) -> &TemplateSet {
        &self.set
    }

    /// Returns the measurement separator.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Returns the templates whose filter is compatible with the given path segments, most specific first.
    pub fn candidates<'a>(&'a self, path: &'a [&'a str]) -> impl Iterator<Item = &'a TemplateSpec> + 'a {
        self.ranked
            .iter()
            .map(|idx| &self.set.templates()[*idx])
            .filter(move |template| template.matches_filter(path))
    }

    /// Decodes the given path.
    ///
    /// # Errors
    ///
    /// If no template matches the path, or no matching template can decompose it, an error is returned.
    pub fn matches(&self, path: &str) -> Result<DecodedRecord, MatchError> {
        let segments = path.split('.').collect::<Vec<_>>();

        for template in self.candidates(&segments) {
            let decomposed = match template.pattern().decompose(&segments, &self.separator) {
                Ok(decomposed) => decomposed,
                Err(e) => {
                    trace!(path, template = %template, error = %e, "Template matched filter but could not decompose path.");
                    continue;
                }
            };

            let mut tags = self
                .set
                .default_tags()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<BTreeMap<_, _>>();
            for (key, value) in decomposed.tags {
                tags.insert(key.to_string(), value.to_string());
            }
            for (key, value) in template.tags() {
                tags.insert(key.clone(), value.clone());
            }

            return Ok(DecodedRecord {
                measurement: decomposed.measurement,
                tags,
            });
        }

        trace!(path, "No template matched path.");
        Err(MatchError::NoTemplateMatched { path: path.to_string() })
    }
}
