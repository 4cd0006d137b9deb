use snafu::{ResultExt as _, Snafu};
use tracing::debug;

use crate::{parse_tag, TagMap, TemplateError, TemplateSpec};

/// An invalid template set.
#[derive(Clone, Debug, Eq, PartialEq, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ValidationError {
    /// A template in the set was invalid.
    #[snafu(display("invalid template at position {}: {}", position, source))]
    Template {
        /// Zero-based position of the template in configuration order.
        position: usize,

        /// Why the template is invalid.
        source: TemplateError,
    },

    /// A default tag was invalid.
    #[snafu(display("invalid default tag: {}", source))]
    DefaultTag {
        /// Why the tag is invalid.
        source: TemplateError,
    },
}

impl ValidationError {
    /// Returns the underlying template error.
    pub fn template_error(&self) -> &TemplateError {
        match self {
            Self::Template { source, .. } | Self::DefaultTag { source } => source,
        }
    }
}

/// An ordered collection of templates, plus tags applied to every decoded path.
///
/// Configuration order does not determine which template is used for a given path; that is decided by filter
/// specificity at match time. Order only breaks ties between equally specific templates, with earlier templates
/// winning.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TemplateSet {
    templates: Vec<TemplateSpec>,
    default_tags: TagMap,
}

impl TemplateSet {
    /// Parses and validates a set of templates and default tags.
    ///
    /// Templates are validated in order, and the first invalid one is reported along with its position. Default tags
    /// are validated after all templates. No cross-template validation is done: duplicate or overlapping filters are
    /// allowed.
    ///
    /// # Errors
    ///
    /// If any template or default tag is invalid, an error is returned.
    pub fn from_config<T, D>(templates: &[T], default_tags: &[D]) -> Result<Self, ValidationError>
    where
        T: AsRef<str>,
        D: AsRef<str>,
    {
        let templates = templates
            .iter()
            .enumerate()
            .map(|(position, template)| TemplateSpec::parse(template.as_ref()).context(Template { position }))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tags = TagMap::new();
        for tag in default_tags {
            let (key, value) = parse_tag(tag.as_ref()).context(DefaultTag)?;
            tags.insert(key, value);
        }

        debug!(templates = templates.len(), default_tags = tags.len(), "Validated template set.");

        Ok(Self {
            templates,
            default_tags: tags,
        })
    }

    /// Validates a set of templates and default tags without keeping the parsed result.
    ///
    /// # Errors
    ///
    /// If any template or default tag is invalid, an error is returned.
    pub fn validate<T, D>(templates: &[T], default_tags: &[D]) -> Result<(), ValidationError>
    where
        T: AsRef<str>,
        D: AsRef<str>,
    {
        Self::from_config(templates, default_tags).map(|_| ())
    }

    /// Returns the templates, in configuration order.
    pub fn templates(&self) -> &[TemplateSpec] {
        &self.templates
    }

    /// Returns the default tags.
    pub fn default_tags(&self) -> &TagMap {
        &self.default_tags
    }

    /// Returns the number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` if there are no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const NO_TAGS: &[&str] = &[];

    #[test]
    fn valid_set() {
        let set = TemplateSet::from_config(
            &["servers.* .host.measurement*", "* .host.measurement", "measurement*"],
            &["region=us-east"],
        )
        .unwrap();

        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());
        assert_eq!(set.default_tags()["region"], "us-east");
        assert_eq!(set.templates()[1].to_string(), "* .host.measurement");
    }

    #[test]
    fn first_invalid_template_is_reported_with_position() {
        let err = TemplateSet::from_config(
            &["measurement*", "measurement.measurement", "a..b measurement"],
            NO_TAGS,
        )
        .unwrap_err();

        match &err {
            ValidationError::Template { position, source } => {
                assert_eq!(*position, 1);
                assert!(matches!(source, TemplateError::MultipleMeasurements { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(
            err.to_string(),
            "invalid template at position 1: multiple measurements in template `measurement.measurement`"
        );
    }

    #[test]
    fn empty_template_position() {
        let err = TemplateSet::from_config(&["measurement", "   "], NO_TAGS).unwrap_err();
        assert_eq!(err.to_string(), "invalid template at position 1: missing template");
        assert_eq!(err.template_error(), &TemplateError::MissingTemplate);
    }

    #[test]
    fn invalid_default_tags() {
        let cases: [&[&str]; 4] = [&["foo"], &["foo=bar="], &["foo=bar", ""], &["="]];
        for tags in cases {
            let err = TemplateSet::from_config(&["measurement"], tags).unwrap_err();
            assert!(
                matches!(err, ValidationError::DefaultTag { .. }),
                "tags {:?} should be rejected",
                tags
            );
        }
    }

    #[test]
    fn duplicate_filters_are_allowed() {
        assert!(TemplateSet::validate(&["servers.* .host.measurement", "servers.* .dc.measurement"], NO_TAGS).is_ok());
    }

    #[test]
    fn empty_set_is_valid() {
        let set = TemplateSet::from_config(&[] as &[&str], NO_TAGS).unwrap();
        assert!(set.is_empty());
    }

    proptest! {
        #[test]
        fn property_validation_is_deterministic(
            templates in prop::collection::vec("[a-z*. ]{0,24}", 0..6),
            tags in prop::collection::vec("[a-z=]{0,8}", 0..4),
        ) {
            let first = TemplateSet::from_config(&templates, &tags);
            let second = TemplateSet::from_config(&templates, &tags);
            prop_assert_eq!(first, second);
        }
    }
}
