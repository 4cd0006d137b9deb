use indexmap::IndexMap;

use crate::TemplateError;

/// An ordered set of tag key/value pairs.
///
/// Insertion order is preserved so that tags render back out in the order they were configured.
pub type TagMap = IndexMap<String, String>;

/// Parses a single `key=value` tag token.
///
/// The token must contain exactly one `=`, with a non-empty key on the left of it and a non-empty value on the right.
pub fn parse_tag(token: &str) -> Result<(String, String), TemplateError> {
    let mut parts = token.split('=');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(value), None) if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        }
        _ => Err(TemplateError::InvalidTags { tag: token.to_string() }),
    }
}

/// Parses a comma-separated list of `key=value` tag tokens.
///
/// Later duplicates of a key replace the value of earlier ones.
pub fn parse_tag_list(raw: &str) -> Result<TagMap, TemplateError> {
    let mut tags = TagMap::new();
    for token in raw.split(',') {
        let (key, value) = parse_tag(token)?;
        tags.insert(key, value);
    }
    Ok(tags)
}
