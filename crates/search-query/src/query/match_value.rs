//! The any/all/not/exact matching primitive.
//!
//! A field condition is always normalized to [`MatchOptions`] before it is
//! compiled or explained. The set checks at the bottom of this module are the
//! single definition of what `any`, `all` and `not` mean; the explain engine
//! and the canonical IR evaluator both call them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A string or a list of strings, kept in the shape the caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values.as_slice(),
        };
        slice.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.iter().any(|value| value == needle)
    }
}

impl From<&str> for OneOrMany {
    fn from(value: &str) -> Self {
        OneOrMany::One(value.to_string())
    }
}

impl From<String> for OneOrMany {
    fn from(value: String) -> Self {
        OneOrMany::One(value)
    }
}

impl From<Vec<String>> for OneOrMany {
    fn from(values: Vec<String>) -> Self {
        OneOrMany::Many(values)
    }
}

impl From<Vec<&str>> for OneOrMany {
    fn from(values: Vec<&str>) -> Self {
        OneOrMany::Many(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for OneOrMany {
    fn from(values: &[&str]) -> Self {
        OneOrMany::Many(values.iter().map(|value| value.to_string()).collect())
    }
}

/// Structured match options for a single field.
///
/// Every present sub-condition must hold for the field to match:
/// - `any`: the result shares at least one value with the set.
/// - `all`: the result contains every value in the set.
/// - `not`: the result shares no value with the set.
/// - `exact`: like `all`, but backends that support exact matching may
///   route it to a dedicated clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<OneOrMany>,
}

impl MatchOptions {
    pub fn any(values: impl Into<OneOrMany>) -> Self {
        Self::default().with_any(values)
    }

    pub fn all(values: impl Into<OneOrMany>) -> Self {
        Self::default().with_all(values)
    }

    pub fn not(values: impl Into<OneOrMany>) -> Self {
        Self::default().with_not(values)
    }

    pub fn exact(values: impl Into<OneOrMany>) -> Self {
        Self::default().with_exact(values)
    }

    pub fn with_any(mut self, values: impl Into<OneOrMany>) -> Self {
        self.any = Some(values.into());
        self
    }

    pub fn with_all(mut self, values: impl Into<OneOrMany>) -> Self {
        self.all = Some(values.into());
        self
    }

    pub fn with_not(mut self, values: impl Into<OneOrMany>) -> Self {
        self.not = Some(values.into());
        self
    }

    pub fn with_exact(mut self, values: impl Into<OneOrMany>) -> Self {
        self.exact = Some(values.into());
        self
    }

    /// True when no sub-condition is present.
    pub fn is_empty(&self) -> bool {
        self.any.is_none() && self.all.is_none() && self.not.is_none() && self.exact.is_none()
    }
}

impl From<&str> for MatchOptions {
    fn from(value: &str) -> Self {
        MatchOptions::any(vec![value.to_string()])
    }
}

impl From<String> for MatchOptions {
    fn from(value: String) -> Self {
        MatchOptions::any(vec![value])
    }
}

impl From<Vec<String>> for MatchOptions {
    fn from(values: Vec<String>) -> Self {
        MatchOptions::any(values)
    }
}

impl From<Vec<&str>> for MatchOptions {
    fn from(values: Vec<&str>) -> Self {
        MatchOptions::any(values)
    }
}

impl From<&[&str]> for MatchOptions {
    fn from(values: &[&str]) -> Self {
        MatchOptions::any(values)
    }
}

/// Coerces a terse field value into match options.
///
/// `"a"` becomes `{any: ["a"]}`, `["a", "b"]` becomes `{any: ["a", "b"]}` and
/// match options are returned unchanged.
pub fn to_match_options(value: impl Into<MatchOptions>) -> MatchOptions {
    value.into()
}

/// Flattens a result attribute into the list of strings it is compared as.
///
/// Strings and scalars become a single entry, arrays are flattened one level
/// and `null` contributes nothing.
pub fn arrayify(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}

/// `any`: the result shares at least one value with the options.
pub fn check_any<S: AsRef<str>>(options: &[S], values: &[S]) -> bool {
    options
        .iter()
        .any(|option| values.iter().any(|value| value.as_ref() == option.as_ref()))
}

/// `all`: every option is present in the result.
pub fn check_all<S: AsRef<str>>(options: &[S], values: &[S]) -> bool {
    options
        .iter()
        .all(|option| values.iter().any(|value| value.as_ref() == option.as_ref()))
}

/// `not`: the result shares no value with the options.
pub fn check_not<S: AsRef<str>>(options: &[S], values: &[S]) -> bool {
    !check_any(options, values)
}
