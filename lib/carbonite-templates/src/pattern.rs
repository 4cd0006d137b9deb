use snafu::Snafu;
use tracing::warn;

use crate::TemplateError;

const MEASUREMENT: &str = "measurement";
const MEASUREMENT_GREEDY: &str = "measurement*";

/// A single section of a pattern.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PatternSegment {
    /// The path segment at this position is the measurement name.
    MeasurementField,

    /// The path segment at this position, and every one after it, form the measurement name.
    MeasurementGreedy,

    /// The path segment at this position is the value of the named tag.
    TagField(String),

    /// The path segment at this position is skipped.
    Ignored,
}

/// Failure to apply a pattern to a specific path.
#[derive(Debug, Eq, PartialEq, Snafu)]
#[snafu(context(suffix(false)))]
pub enum DecomposeError {
    /// The path has fewer segments than the pattern requires.
    #[snafu(display("path has {} segment(s), pattern requires {}", actual, required))]
    PathTooShort {
        /// Number of segments the pattern requires.
        required: usize,

        /// Number of segments in the path.
        actual: usize,
    },

    /// The path segment(s) labeled as the measurement are empty.
    #[snafu(display("measurement would be empty"))]
    EmptyMeasurement,
}

/// The result of applying a pattern to a path.
///
/// Tag keys borrow from the pattern, and tag values from the path.
#[derive(Debug, Eq, PartialEq)]
pub struct Decomposition<'p, 'a> {
    /// Measurement name.
    pub measurement: String,

    /// Tags extracted from the path, in pattern order.
    pub tags: Vec<(&'p str, &'a str)>,
}

/// A dotted sequence of field labels describing how to slice a path into a measurement and tags.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pattern {
    source: String,
    segments: Vec<PatternSegment>,
}

impl Pattern {
    /// Parses a pattern.
    ///
    /// Sections after a `measurement*` can never receive a path segment, as `measurement*` consumes the remainder of
    /// the path. They are accepted, but dropped from the parsed pattern.
    ///
    /// # Errors
    ///
    /// If the pattern does not contain exactly one `measurement` or `measurement*` section, an error is returned.
    pub fn parse(pattern: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut has_measurement = false;
        let mut greedy_at = None;

        for section in pattern.split('.') {
            let segment = match section {
                MEASUREMENT | MEASUREMENT_GREEDY => {
                    if has_measurement {
                        return Err(TemplateError::MultipleMeasurements {
                            pattern: pattern.to_string(),
                        });
                    }
                    has_measurement = true;

                    if section == MEASUREMENT_GREEDY {
                        greedy_at = Some(segments.len());
                        PatternSegment::MeasurementGreedy
                    } else {
                        PatternSegment::MeasurementField
                    }
                }
                "" => PatternSegment::Ignored,
                tag => PatternSegment::TagField(tag.to_string()),
            };
            segments.push(segment);
        }

        if !has_measurement {
            return Err(TemplateError::NoMeasurement {
                pattern: pattern.to_string(),
            });
        }

        if let Some(idx) = greedy_at {
            if idx + 1 < segments.len() {
                warn!(
                    pattern,
                    unreachable = segments.len() - idx - 1,
                    "Pattern has sections after `measurement*` which will never be used."
                );
                segments.truncate(idx + 1);
            }
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// Returns the pattern as originally written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns the parsed segments.
    ///
    /// Unreachable sections after `measurement*` are not included.
    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Returns `true` if the pattern ends in `measurement*`.
    pub fn is_greedy(&self) -> bool {
        matches!(self.segments.last(), Some(PatternSegment::MeasurementGreedy))
    }

    /// Applies this pattern to the given path segments.
    ///
    /// Pattern section `i` labels path segment `i`. Path segments beyond the end of the pattern are ignored, unless the
    /// pattern ends in `measurement*`, in which case they are folded into the measurement name using `separator`. Empty
    /// path segments never produce tags.
    ///
    /// # Errors
    ///
    /// If the path is shorter than the pattern, or the resulting measurement name is empty, an error is returned.
    pub fn decompose<'p, 'a>(&'p self, path: &[&'a str], separator: &str) -> Result<Decomposition<'p, 'a>, DecomposeError> {
        if path.len() < self.segments.len() {
            return Err(DecomposeError::PathTooShort {
                required: self.segments.len(),
                actual: path.len(),
            });
        }

        let mut measurement = String::new();
        let mut tags = Vec::new();

        for (i, (segment, part)) in self.segments.iter().zip(path.iter()).enumerate() {
            match segment {
                PatternSegment::MeasurementField => measurement.push_str(part),
                PatternSegment::MeasurementGreedy => {
                    measurement = path[i..].join(separator);
                    break;
                }
                PatternSegment::TagField(key) => {
                    if !part.is_empty() {
                        tags.push((key.as_str(), *part));
                    }
                }
                PatternSegment::Ignored => {}
            }
        }

        if measurement.is_empty() {
            return Err(DecomposeError::EmptyMeasurement);
        }

        Ok(Decomposition { measurement, tags })
    }
}
