use std::fmt;

use crate::TemplateError;

/// A single section of a filter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FilterSegment {
    /// Matches only the identical path segment.
    Literal(String),

    /// Matches any single path segment.
    Wildcard,
}

/// Ranking of a filter against other filters that match the same path.
///
/// More literal segments always win. When literal counts tie, the longer filter wins. A template with no filter at all
/// has the lowest possible specificity.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Specificity {
    literals: usize,
    segments: usize,
}

impl Specificity {
    /// Number of literal (non-wildcard) segments.
    pub fn literals(&self) -> usize {
        self.literals
    }

    /// Total number of segments.
    pub fn segments(&self) -> usize {
        self.segments
    }
}

/// A dotted wildcard pattern that selects which paths a template applies to.
///
/// Filters match on a per-segment basis, over the filter's own length only: `servers.*` matches `servers.east` as
/// well as `servers.east.web01.cpu`. Trailing wildcards may match nothing at all, so `servers.*` also matches
/// `servers`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Filter {
    segments: Vec<FilterSegment>,
    required_len: usize,
}

impl Filter {
    /// Parses a filter expression.
    ///
    /// # Errors
    ///
    /// If any section is empty (`a..b`, `.a`), or contains a `*` without being exactly `*` (`serv*er`), an error is
    /// returned.
    pub fn parse(filter: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        for section in filter.split('.') {
            if section.is_empty() {
                return Err(TemplateError::BlankFilterSection {
                    filter: filter.to_string(),
                });
            }

            if section == "*" {
                segments.push(FilterSegment::Wildcard);
            } else if section.contains('*') {
                return Err(TemplateError::InvalidWildcardSection {
                    filter: filter.to_string(),
                });
            } else {
                segments.push(FilterSegment::Literal(section.to_string()));
            }
        }

        let trailing_wildcards = segments
            .iter()
            .rev()
            .take_while(|segment| **segment == FilterSegment::Wildcard)
            .count();
        let required_len = segments.len() - trailing_wildcards;

        Ok(Self { segments, required_len })
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[FilterSegment] {
        &self.segments
    }

    /// Returns `true` if the given path segments are compatible with this filter.
    pub fn matches(&self, path: &[&str]) -> bool {
        if path.len() < self.required_len {
            return false;
        }

        self.segments
            .iter()
            .zip(path.iter())
            .all(|(segment, part)| match segment {
                FilterSegment::Literal(literal) => literal == part,
                FilterSegment::Wildcard => true,
            })
    }

    /// Computes the specificity of this filter.
    pub fn specificity(&self) -> Specificity {
        Specificity {
            literals: self
                .segments
                .iter()
                .filter(|segment| matches!(segment, FilterSegment::Literal(_)))
                .count(),
            segments: self.segments.len(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                FilterSegment::Literal(literal) => f.write_str(literal)?,
                FilterSegment::Wildcard => f.write_str("*")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> Vec<&str> {
        raw.split('.').collect()
    }

    #[test]
    fn parse_rejects_blank_sections() {
        for filter in [".server", "a..b", "server.", ".    .server", ""] {
            assert!(
                matches!(Filter::parse(filter), Err(TemplateError::BlankFilterSection { .. })),
                "filter '{}' should be rejected",
                filter
            );
        }
    }

    #[test]
    fn parse_rejects_partial_wildcards() {
        for filter in ["server*", "serv*er", "*server", "a.**.b"] {
            assert!(
                matches!(Filter::parse(filter), Err(TemplateError::InvalidWildcardSection { .. })),
                "filter '{}' should be rejected",
                filter
            );
        }
    }

    #[test]
    fn literal_and_wildcard_matching() {
        let filter = Filter::parse("servers.*.web01").unwrap();
        assert!(filter.matches(&path("servers.east.web01")));
        assert!(filter.matches(&path("servers.west.web01.cpu.load")));
        assert!(!filter.matches(&path("servers.east.web02")));
        assert!(!filter.matches(&path("hosts.east.web01")));
        assert!(!filter.matches(&path("servers.east")));
    }

    #[test]
    fn trailing_wildcards_are_open_ended() {
        let filter = Filter::parse("servers.*.*").unwrap();
        assert!(filter.matches(&path("servers")));
        assert!(filter.matches(&path("servers.east")));
        assert!(filter.matches(&path("servers.east.web01.cpu")));
        assert!(!filter.matches(&path("hosts")));

        let filter = Filter::parse("*").unwrap();
        assert!(filter.matches(&path("anything")));
    }

    #[test]
    fn specificity_ordering() {
        let spec = |raw: &str| Filter::parse(raw).unwrap().specificity();

        assert!(spec("servers.*") > spec("*"));
        assert!(spec("*") > Specificity::default());
        assert!(spec("a.b") > spec("a.*.*.*"));
        assert!(spec("a.b.*") > spec("a.*"));
        assert_eq!(spec("a.*"), spec("b.*"));

        let s = spec("servers.*.web01");
        assert_eq!(s.literals(), 2);
        assert_eq!(s.segments(), 3);
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(Filter::parse("servers.*.web01").unwrap().to_string(), "servers.*.web01");
    }
}
