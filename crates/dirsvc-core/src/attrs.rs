//! Attribute request specifications and record results.
//!
//! A query names the attributes it wants back and, per attribute, how the
//! raw native payload should be decoded: as UTF-8 text or as a base64 string
//! wrapping binary data (photos, certificates). Attributes the platform
//! returns that were never requested are dropped during extraction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Decode behavior for one requested attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttrEncoding {
    /// UTF-8 text payload (the default)
    #[default]
    Str,
    /// Binary payload surfaced as a base64 string
    Base64,
}

/// The set of attributes a query asks for, keyed by attribute name.
///
/// Keys are unique; insertion order is irrelevant. An attribute requested
/// without an explicit encoding defaults to [`AttrEncoding::Str`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSpec {
    encodings: HashMap<String, AttrEncoding>,
}

impl AttributeSpec {
    /// Creates an empty specification.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a specification from `(name, encoding)` pairs; a `None`
    /// encoding selects the default.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<AttrEncoding>)>,
        S: Into<String>,
    {
        let encodings = pairs
            .into_iter()
            .map(|(name, encoding)| (name.into(), encoding.unwrap_or_default()))
            .collect();
        Self { encodings }
    }

    /// Requests an attribute with the default text encoding.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>) -> Self {
        self.encodings.insert(name.into(), AttrEncoding::Str);
        self
    }

    /// Requests an attribute with an explicit encoding.
    #[must_use]
    pub fn with_attr_encoded(mut self, name: impl Into<String>, encoding: AttrEncoding) -> Self {
        self.encodings.insert(name.into(), encoding);
        self
    }

    /// Returns the encoding for a requested attribute, or `None` when the
    /// attribute was never requested (and must be skipped).
    #[must_use]
    pub fn encoding_of(&self, name: &str) -> Option<AttrEncoding> {
        self.encodings.get(name).copied()
    }

    /// Returns the requested attribute names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.encodings.keys().cloned().collect()
    }

    /// Returns true when no attributes have been requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }

    /// Number of requested attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.encodings.len()
    }
}

/// One decoded attribute: a scalar when the native attribute carried a
/// single value, an ordered sequence when it carried several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    /// Single-valued attribute
    Single(String),
    /// Multi-valued attribute, in native order
    Multi(Vec<String>),
}

impl AttrValue {
    /// Returns the scalar value, or the first of a multi-value sequence.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value.as_str()),
            Self::Multi(values) => values.first().map(String::as_str),
        }
    }

    /// Number of values carried by this attribute.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multi(values) => values.len(),
        }
    }

    /// Returns true for an empty multi-value sequence.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One directory record produced by a query: its name plus the decoded
/// values of every requested attribute it carried.
///
/// A requested attribute with zero values contributes no entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordResult {
    /// Record name
    pub name: String,
    /// Decoded attribute values, keyed by attribute name
    pub attrs: HashMap<String, AttrValue>,
}

impl RecordResult {
    /// Creates a record result with no attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: HashMap::new(),
        }
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attrs.get(attribute).and_then(AttrValue::first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_encoding_is_str() {
        let spec = AttributeSpec::from_pairs([("uid", None), ("jpegPhoto", Some(AttrEncoding::Base64))]);
        assert_eq!(spec.encoding_of("uid"), Some(AttrEncoding::Str));
        assert_eq!(spec.encoding_of("jpegPhoto"), Some(AttrEncoding::Base64));
        assert_eq!(spec.encoding_of("cn"), None);
        assert_eq!(spec.len(), 2);
    }

    #[test]
    fn builder_overrides() {
        let spec = AttributeSpec::new()
            .with_attr("uid")
            .with_attr_encoded("uid", AttrEncoding::Base64);
        assert_eq!(spec.encoding_of("uid"), Some(AttrEncoding::Base64));
        assert_eq!(spec.len(), 1);
    }

    #[test]
    fn names_cover_all_requested_attributes() {
        let spec = AttributeSpec::new().with_attr("uid").with_attr("cn");
        let mut names = spec.names();
        names.sort();
        assert_eq!(names, vec!["cn".to_string(), "uid".to_string()]);
    }

    #[test]
    fn attr_value_accessors() {
        let single = AttrValue::Single("1001".to_string());
        assert_eq!(single.first(), Some("1001"));
        assert_eq!(single.len(), 1);

        let multi = AttrValue::Multi(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(multi.first(), Some("a"));
        assert_eq!(multi.len(), 2);
        assert!(!multi.is_empty());
    }

    #[test]
    fn record_result_first() {
        let mut record = RecordResult::new("alice");
        record
            .attrs
            .insert("uid".to_string(), AttrValue::Single("1001".to_string()));
        assert_eq!(record.first("uid"), Some("1001"));
        assert_eq!(record.first("cn"), None);
    }

    #[test]
    fn attr_value_serializes_untagged() {
        let single = serde_json::to_string(&AttrValue::Single("x".to_string())).unwrap();
        assert_eq!(single, "\"x\"");
        let multi =
            serde_json::to_string(&AttrValue::Multi(vec!["x".to_string(), "y".to_string()]))
                .unwrap();
        assert_eq!(multi, "[\"x\",\"y\"]");
    }
}
