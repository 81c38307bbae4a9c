//! Validation rules carried by attributes.
//!
//! The rules are a plain value object: merging and self-checking live here,
//! while enforcement against the type graph happens in the validate pass.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationErrors;

/// Well-known string formats checkable by generated validation code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "date-time")]
    DateTime,
    #[serde(rename = "uuid")]
    Uuid,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "hostname")]
    Hostname,
    #[serde(rename = "ipv4")]
    Ipv4,
    #[serde(rename = "ipv6")]
    Ipv6,
    #[serde(rename = "ip")]
    Ip,
    #[serde(rename = "uri")]
    Uri,
    #[serde(rename = "mac")]
    Mac,
    #[serde(rename = "cidr")]
    Cidr,
    #[serde(rename = "regexp")]
    Regexp,
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "rfc1123")]
    Rfc1123,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Format::Date => "date",
            Format::DateTime => "date-time",
            Format::Uuid => "uuid",
            Format::Email => "email",
            Format::Hostname => "hostname",
            Format::Ipv4 => "ipv4",
            Format::Ipv6 => "ipv6",
            Format::Ip => "ip",
            Format::Uri => "uri",
            Format::Mac => "mac",
            Format::Cidr => "cidr",
            Format::Regexp => "regexp",
            Format::Json => "json",
            Format::Rfc1123 => "rfc1123",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of constraints an attribute may carry. All fields optional;
/// `Default::default()` is the absent-everything rule set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Enum of allowed values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,

    /// Well-known string format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,

    /// Regular expression source the value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Inclusive lower bound for numeric values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    /// Inclusive upper bound for numeric values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    /// Minimum length of strings, arrays and maps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum length of strings, arrays and maps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Names of required object fields, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl ValidationRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no constraint is set.
    pub fn is_empty(&self) -> bool {
        *self == ValidationRules::default()
    }

    /// True if the only constraint set is the required-field list.
    pub fn has_required_only(&self) -> bool {
        !self.required.is_empty()
            && *self
                == ValidationRules {
                    required: self.required.clone(),
                    ..Default::default()
                }
    }

    /// Appends names to the required list, skipping ones already present.
    pub fn add_required<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.required.contains(&name) {
                self.required.push(name);
            }
        }
    }

    /// Removes the name from the required list if present.
    pub fn remove_required(&mut self, name: &str) {
        self.required.retain(|n| n != name);
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|n| n == name)
    }

    /// Merges `other` into `self`. Scalar rules only fill in when missing,
    /// except bounds which widen: the merged rules accept every value either
    /// side accepted. Required lists union preserving order.
    pub fn merge(&mut self, other: &ValidationRules) {
        if self.values.is_empty() {
            self.values = other.values.clone();
        }
        if self.format.is_none() {
            self.format = other.format;
        }
        if self.pattern.is_none() {
            self.pattern = other.pattern.clone();
        }
        if let Some(m) = other.minimum {
            if self.minimum.is_none_or(|cur| cur > m) {
                self.minimum = Some(m);
            }
        }
        if let Some(m) = other.maximum {
            if self.maximum.is_none_or(|cur| cur < m) {
                self.maximum = Some(m);
            }
        }
        if let Some(l) = other.min_length {
            if self.min_length.is_none_or(|cur| cur > l) {
                self.min_length = Some(l);
            }
        }
        if let Some(l) = other.max_length {
            if self.max_length.is_none_or(|cur| cur < l) {
                self.max_length = Some(l);
            }
        }
        self.add_required(other.required.iter().cloned());
    }

    /// Checks the rules for internal consistency. `ctx` names the attribute
    /// and `parent` the enclosing expression for error messages.
    pub fn validate(&self, ctx: &str, parent: &str) -> ValidationErrors {
        let mut verr = ValidationErrors::new();
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                verr.add(
                    parent,
                    format!("{ctx}: minimum ({min}) is greater than maximum ({max})"),
                );
            }
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                verr.add(
                    parent,
                    format!("{ctx}: min length ({min}) is greater than max length ({max})"),
                );
            }
        }
        if let Some(pat) = &self.pattern {
            if let Err(err) = regex::Regex::new(pat) {
                verr.add(parent, format!("{ctx}: invalid pattern {pat:?}: {err}"));
            }
        }
        verr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_fills_missing_and_widens_bounds() {
        let mut left = ValidationRules {
            minimum: Some(5.0),
            maximum: Some(10.0),
            min_length: Some(2),
            ..Default::default()
        };
        let right = ValidationRules {
            values: vec![json!("a"), json!("b")],
            format: Some(Format::Uuid),
            pattern: Some("^a".to_string()),
            minimum: Some(1.0),
            maximum: Some(20.0),
            min_length: Some(4),
            max_length: Some(8),
            required: vec!["x".to_string()],
        };
        left.merge(&right);
        assert_eq!(left.values, vec![json!("a"), json!("b")]);
        assert_eq!(left.format, Some(Format::Uuid));
        assert_eq!(left.pattern.as_deref(), Some("^a"));
        assert_eq!(left.minimum, Some(1.0)); // smaller wins
        assert_eq!(left.maximum, Some(20.0)); // larger wins
        assert_eq!(left.min_length, Some(2)); // smaller wins
        assert_eq!(left.max_length, Some(8));
        assert_eq!(left.required, vec!["x".to_string()]);
    }

    #[test]
    fn merge_does_not_override_set_scalars() {
        let mut left = ValidationRules {
            pattern: Some("^l".to_string()),
            format: Some(Format::Email),
            values: vec![json!(1)],
            ..Default::default()
        };
        let right = ValidationRules {
            pattern: Some("^r".to_string()),
            format: Some(Format::Uri),
            values: vec![json!(2)],
            ..Default::default()
        };
        left.merge(&right);
        assert_eq!(left.pattern.as_deref(), Some("^l"));
        assert_eq!(left.format, Some(Format::Email));
        assert_eq!(left.values, vec![json!(1)]);
    }

    #[test]
    fn required_union_dedups_preserving_order() {
        let mut rules = ValidationRules::default();
        rules.add_required(["a", "b"]);
        rules.add_required(["b", "c", "a"]);
        assert_eq!(rules.required, vec!["a", "b", "c"]);
        rules.remove_required("b");
        assert_eq!(rules.required, vec!["a", "c"]);
        assert!(rules.has_required_only());
    }

    #[test]
    fn validate_rejects_inverted_bounds_and_bad_patterns() {
        let rules = ValidationRules {
            minimum: Some(10.0),
            maximum: Some(1.0),
            min_length: Some(9),
            max_length: Some(3),
            pattern: Some("(unclosed".to_string()),
            ..Default::default()
        };
        let verr = rules.validate("field x", "type \"T\"");
        assert_eq!(verr.len(), 3);
        assert!(verr.to_string().contains("minimum (10) is greater"));
    }

    #[test]
    fn format_serializes_to_wire_names() {
        assert_eq!(
            serde_json::to_string(&Format::DateTime).unwrap(),
            "\"date-time\""
        );
        assert_eq!(Format::Rfc1123.to_string(), "rfc1123");
    }
}
