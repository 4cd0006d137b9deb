//! Graphite template parsing and path decoding.
//!
//! Graphite identifies a metric by a dotted path, such as `servers.east.web01.cpu.load`. Templates describe how to
//! turn such a path into a measurement name and a set of tags:
//!
//! ```text
//! servers.* .host.measurement* dc=east1
//! ^ filter  ^ pattern          ^ static tags
//! ```
//!
//! With the template above, `servers.web01.cpu.load` decodes to the measurement `cpu.load` with the tags
//! `host=web01,dc=east1`.
//!
//! Templates are parsed and validated once, when configuration is loaded, into a [`TemplateSet`]. A
//! [`TemplateMatcher`] then decodes paths against that set, choosing the most specific matching template for each path.
//! [`ActiveTemplates`] holds the matcher in use and allows replacing it atomically when configuration is reloaded.
#![deny(warnings)]
#![deny(missing_docs)]

mod active;
pub use self::active::ActiveTemplates;

mod config;
pub use self::config::{
    GraphiteConfiguration, CONFIGURATION_KEY, DEFAULT_BIND_ADDRESS, DEFAULT_CONSISTENCY_LEVEL, DEFAULT_DATABASE,
    DEFAULT_PROTOCOL,
};

mod filter;
pub use self::filter::{Filter, FilterSegment, Specificity};

mod matcher;
pub use self::matcher::{MatchError, TemplateMatcher, DEFAULT_SEPARATOR};

mod pattern;
pub use self::pattern::{DecomposeError, Decomposition, Pattern, PatternSegment};

mod record;
pub use self::record::DecodedRecord;

mod set;
pub use self::set::{TemplateSet, ValidationError};

mod spec;
pub use self::spec::{TemplateError, TemplateSpec};

mod tags;
pub use self::tags::{parse_tag, parse_tag_list, TagMap};
