use std::{fmt, str::FromStr};

use snafu::Snafu;
use tracing::debug;

use crate::{parse_tag_list, Filter, Pattern, Specificity, TagMap};

/// An invalid template.
#[derive(Clone, Debug, Eq, PartialEq, Snafu)]
#[snafu(context(suffix(false)))]
pub enum TemplateError {
    /// The template was empty, or only whitespace.
    #[snafu(display("missing template"))]
    MissingTemplate,

    /// The template had more than three whitespace-separated fields.
    #[snafu(display("invalid template format: '{}'", template))]
    InvalidFormat {
        /// The template as written.
        template: String,
    },

    /// The pattern had no `measurement` or `measurement*` section.
    #[snafu(display("no measurement in template `{}`", pattern))]
    NoMeasurement {
        /// The pattern as written.
        pattern: String,
    },

    /// The pattern had more than one `measurement` or `measurement*` section.
    #[snafu(display("multiple measurements in template `{}`", pattern))]
    MultipleMeasurements {
        /// The pattern as written.
        pattern: String,
    },

    /// The filter had an empty section.
    #[snafu(display("filter contains blank section: {}", filter))]
    BlankFilterSection {
        /// The filter as written.
        filter: String,
    },

    /// The filter had a section containing `*` that was not exactly `*`.
    #[snafu(display("invalid filter wildcard section: {}", filter))]
    InvalidWildcardSection {
        /// The filter as written.
        filter: String,
    },

    /// A tag was not of the form `key=value`.
    #[snafu(display("invalid template tags: '{}'", tag))]
    InvalidTags {
        /// The tag token as written.
        tag: String,
    },
}

/// A single parsed template.
///
/// Templates are written as one to three whitespace-separated fields:
///
/// ```text
/// [filter] pattern [tags]
/// ```
///
/// - `filter`: a dotted wildcard pattern selecting the paths this template applies to (`servers.*`). When absent, the
///   template applies to every path.
/// - `pattern`: a dotted sequence of field labels describing how to slice a path (`.host.measurement*`). Exactly one
///   section must be `measurement` or `measurement*`.
/// - `tags`: comma-separated `key=value` pairs attached to every path this template decodes (`dc=east1,env=prod`).
///
/// A template with two fields is always read as `filter pattern`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TemplateSpec {
    filter: Option<Filter>,
    pattern: Pattern,
    tags: TagMap,
}

impl TemplateSpec {
    /// Parses and validates a template.
    ///
    /// The pattern is validated first, then the filter, then the tags, and the first problem found is returned.
    ///
    /// # Errors
    ///
    /// If the template is empty, has too many fields, or any of its parts are malformed, an error is returned.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let fields = template.split_whitespace().collect::<Vec<_>>();
        let (filter, pattern, tags) = match fields.as_slice() {
            [] => return Err(TemplateError::MissingTemplate),
            [pattern] => (None, *pattern, None),
            [filter, pattern] => (Some(*filter), *pattern, None),
            [filter, pattern, tags] => (Some(*filter), *pattern, Some(*tags)),
            _ => {
                return Err(TemplateError::InvalidFormat {
                    template: template.to_string(),
                })
            }
        };

        let pattern = Pattern::parse(pattern)?;
        let filter = filter.map(Filter::parse).transpose()?;
        let tags = tags.map(parse_tag_list).transpose()?.unwrap_or_default();

        let spec = Self { filter, pattern, tags };
        debug!(template = %spec, "Parsed template.");

        Ok(spec)
    }

    /// Returns the filter, if one was given.
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Returns the pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Returns the static tags.
    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    /// Returns `true` if this template's filter is compatible with the given path segments.
    ///
    /// Templates without a filter match every path.
    pub fn matches_filter(&self, path: &[&str]) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter.matches(path))
    }

    /// Returns the specificity of this template's filter.
    pub fn specificity(&self) -> Specificity {
        self.filter.as_ref().map(Filter::specificity).unwrap_or_default()
    }
}

impl FromStr for TemplateSpec {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TemplateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(filter) = &self.filter {
            write!(f, "{} ", filter)?;
        }

        f.write_str(self.pattern.as_str())?;

        for (i, (key, value)) in self.tags.iter().enumerate() {
            let prefix = if i == 0 { " " } else { "," };
            write!(f, "{}{}={}", prefix, key, value)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn field_counts() {
        let spec = TemplateSpec::parse("measurement*").unwrap();
        assert!(spec.filter().is_none());
        assert!(spec.tags().is_empty());
        assert!(spec.matches_filter(&["anything", "at", "all"]));
        assert_eq!(spec.specificity(), Specificity::default());

        let spec = TemplateSpec::parse("servers.* .host.measurement*").unwrap();
        assert_eq!(spec.filter().map(ToString::to_string).as_deref(), Some("servers.*"));
        assert_eq!(spec.pattern().as_str(), ".host.measurement*");

        let spec = TemplateSpec::parse("  servers.*\t.host.measurement*   dc=east1,env=prod ").unwrap();
        assert_eq!(spec.tags()["dc"], "east1");
        assert_eq!(spec.tags()["env"], "prod");
        assert_eq!(spec.to_string(), "servers.* .host.measurement* dc=east1,env=prod");
    }

    #[test]
    fn empty_templates() {
        assert_eq!(TemplateSpec::parse(""), Err(TemplateError::MissingTemplate));
        assert_eq!(TemplateSpec::parse("     "), Err(TemplateError::MissingTemplate));
    }

    #[test]
    fn too_many_fields() {
        assert_eq!(
            TemplateSpec::parse("a measurement b c"),
            Err(TemplateError::InvalidFormat {
                template: "a measurement b c".to_string()
            })
        );
    }

    #[test]
    fn invalid_patterns() {
        for template in ["measurement.measurement", "*measurement", ".host.region"] {
            assert!(TemplateSpec::parse(template).is_err(), "template '{}' should be rejected", template);
        }

        let err = TemplateSpec::parse("measurement.measurement").unwrap_err();
        assert_eq!(err.to_string(), "multiple measurements in template `measurement.measurement`");
    }

    #[test]
    fn invalid_filters() {
        for template in [".server measurement*", ".    .server measurement*", "server* measurement*"] {
            assert!(TemplateSpec::parse(template).is_err(), "template '{}' should be rejected", template);
        }

        assert_eq!(
            TemplateSpec::parse("a..b measurement"),
            Err(TemplateError::BlankFilterSection {
                filter: "a..b".to_string()
            })
        );
        assert_eq!(
            TemplateSpec::parse("serv*er measurement"),
            Err(TemplateError::InvalidWildcardSection {
                filter: "serv*er".to_string()
            })
        );
    }

    #[test]
    fn invalid_tags() {
        for template in [
            "*.server measurement* foo",
            "*.server measurement* foo=bar=",
            "*.server measurement* foo=bar,",
            "*.server measurement* =",
        ] {
            assert!(
                matches!(TemplateSpec::parse(template), Err(TemplateError::InvalidTags { .. })),
                "template '{}' should be rejected",
                template
            );
        }

        let err = TemplateSpec::parse("*.server measurement* foo=bar=").unwrap_err();
        assert_eq!(err.to_string(), "invalid template tags: 'foo=bar='");
    }

    #[test]
    fn pattern_is_checked_before_filter_and_tags() {
        assert!(matches!(
            TemplateSpec::parse("a..b host foo"),
            Err(TemplateError::NoMeasurement { .. })
        ));
        assert!(matches!(
            TemplateSpec::parse("a..b measurement foo"),
            Err(TemplateError::BlankFilterSection { .. })
        ));
    }

    fn arb_label() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,8}".prop_filter("must not be a measurement label", |s| !s.starts_with("measurement"))
    }

    fn arb_filter() -> impl Strategy<Value = String> {
        prop::collection::vec(prop_oneof![arb_label(), Just("*".to_string())], 1..5).prop_map(|s| s.join("."))
    }

    fn arb_pattern() -> impl Strategy<Value = String> {
        (
            prop::collection::vec(prop_oneof![arb_label(), Just(String::new())], 0..5),
            prop_oneof![Just("measurement"), Just("measurement*")],
            any::<prop::sample::Index>(),
        )
            .prop_map(|(mut sections, measurement, idx)| {
                let at = idx.index(sections.len() + 1);
                sections.insert(at, measurement.to_string());
                sections.join(".")
            })
    }

    fn arb_tags() -> impl Strategy<Value = String> {
        prop::collection::vec((arb_label(), arb_label()), 1..4).prop_map(|tags| {
            tags.into_iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(",")
        })
    }

    fn arb_blank_filter() -> impl Strategy<Value = String> {
        (
            prop::collection::vec(prop_oneof![arb_label(), Just("*".to_string())], 1..4),
            any::<prop::sample::Index>(),
        )
            .prop_map(|(mut sections, idx)| {
                let at = idx.index(sections.len() + 1);
                sections.insert(at, String::new());
                sections.join(".")
            })
    }

    proptest! {
        #[test]
        fn property_valid_templates_always_parse(
            filter in arb_filter(),
            pattern in arb_pattern(),
            tags in arb_tags(),
        ) {
            let pattern_only = TemplateSpec::parse(&pattern);
            prop_assert!(pattern_only.is_ok(), "pattern-only template rejected: {:?}", pattern_only);

            let filtered = TemplateSpec::parse(&format!("{} {}", filter, pattern));
            prop_assert!(filtered.is_ok(), "filtered template rejected: {:?}", filtered);

            let spec = TemplateSpec::parse(&format!("{} {} {}", filter, pattern, tags)).unwrap();

            // Re-parsing the rendered form yields the same template.
            prop_assert_eq!(TemplateSpec::parse(&spec.to_string()).unwrap(), spec);
        }

        #[test]
        fn property_measurement_count_must_be_one(
            sections in prop::collection::vec(prop_oneof![
                arb_label(),
                Just("measurement".to_string()),
                Just("measurement*".to_string()),
            ], 1..6),
        ) {
            let count = sections
                .iter()
                .filter(|s| *s == "measurement" || *s == "measurement*")
                .count();
            let result = TemplateSpec::parse(&sections.join("."));

            let accepted = match count {
                0 => matches!(result, Err(TemplateError::NoMeasurement { .. })),
                1 => result.is_ok(),
                _ => matches!(result, Err(TemplateError::MultipleMeasurements { .. })),
            };
            prop_assert!(accepted, "{} measurement sections gave {:?}", count, result);
        }

        #[test]
        fn property_partial_wildcards_are_rejected(
            prefix in arb_label(),
            suffix in "[a-z]{0,4}",
        ) {
            let template = format!("{}*{} measurement", prefix, suffix);
            let result = TemplateSpec::parse(&template);
            let rejected = matches!(result, Err(TemplateError::InvalidWildcardSection { .. }));
            prop_assert!(rejected, "template '{}' gave {:?}", template, result);
        }

        #[test]
        fn property_blank_filter_sections_are_rejected(
            filter in arb_blank_filter(),
            pattern in arb_pattern(),
        ) {
            let template = format!("{} {}", filter, pattern);
            let result = TemplateSpec::parse(&template);
            let rejected = matches!(result, Err(TemplateError::BlankFilterSection { .. }));
            prop_assert!(rejected, "template '{}' gave {:?}", template, result);
        }
    }
}
