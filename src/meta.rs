//! Open string-keyed tag bag attached to every attribute.
//!
//! Generators rely on ad hoc tags for cross-cutting semantics, so the map
//! stays open (any key is legal). Lookups of the tags this crate itself
//! understands go through the named accessors below so the literals live in
//! exactly one place.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tag nominating the view used to render a result type attribute.
pub const VIEW_TAG: &str = "view";

/// Tag renaming a generated struct field.
pub const FIELD_NAME_TAG: &str = "struct:field:name";

/// Tag marking the field carrying the error name on error result types.
pub const ERROR_NAME_TAG: &str = "struct:error:name";

/// Tag marking the field holding the authenticated user name.
pub const SECURITY_USERNAME_TAG: &str = "security:username";

/// Tag carrying the wire tag number of a field (folded into hashes).
pub const RPC_TAG: &str = "rpc:tag";

/// Insertion-ordered multimap of tag name to values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta(IndexMap<String, Vec<String>>);

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends values under the given tag, creating it if needed.
    pub fn add(&mut self, tag: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) {
        self.0
            .entry(tag.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
    }

    /// Sets a single-valued tag, replacing any previous values.
    pub fn set(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.0.insert(tag.into(), vec![value.into()]);
    }

    pub fn get(&self, tag: &str) -> Option<&[String]> {
        self.0.get(tag).map(Vec::as_slice)
    }

    /// Returns the last value recorded for the tag, if any.
    pub fn last(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).and_then(|vs| vs.last()).map(String::as_str)
    }

    /// Returns the first value recorded for the tag, if any.
    pub fn first(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).and_then(|vs| vs.first()).map(String::as_str)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains_key(tag)
    }

    /// True if any tag starts with the given prefix.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.keys().any(|k| k.starts_with(prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    // Known-tag accessors. Keep all literal lookups here.

    /// View nominated for rendering a result type attribute.
    pub fn view(&self) -> Option<&str> {
        self.last(VIEW_TAG)
    }

    /// Generated struct field rename, if any.
    pub fn field_name(&self) -> Option<&str> {
        self.last(FIELD_NAME_TAG)
    }

    /// Wire tag of the field, if any.
    pub fn rpc_tag(&self) -> Option<&str> {
        self.last(RPC_TAG)
    }

    /// True if the attribute is flagged as carrying the error name.
    pub fn is_error_name(&self) -> bool {
        self.contains(ERROR_NAME_TAG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_appends_and_last_wins() {
        let mut m = Meta::new();
        m.add(VIEW_TAG, ["tiny"]);
        m.add(VIEW_TAG, ["full"]);
        assert_eq!(m.first(VIEW_TAG), Some("tiny"));
        assert_eq!(m.view(), Some("full"));
    }

    #[test]
    fn set_replaces() {
        let mut m = Meta::new();
        m.add(FIELD_NAME_TAG, ["a", "b"]);
        m.set(FIELD_NAME_TAG, "c");
        assert_eq!(m.get(FIELD_NAME_TAG).unwrap(), &["c".to_string()]);
    }

    #[test]
    fn prefix_lookup() {
        let mut m = Meta::new();
        m.add("struct:error:name", Vec::<String>::new());
        assert!(m.has_prefix("struct:"));
        assert!(m.is_error_name());
        assert!(!m.has_prefix("security:"));
    }
}
