use std::collections::BTreeMap;

use serde::Serialize;

/// A path decoded into a measurement name and tags.
///
/// Tags are kept sorted by key, so two records decoded from the same path against the same templates always compare,
/// and serialize, identically.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DecodedRecord {
    /// Measurement name. Never empty.
    pub measurement: String,

    /// Tags.
    pub tags: BTreeMap<String, String>,
}

impl DecodedRecord {
    /// Returns the value of the given tag, if present.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}
