//! Predicates: ordered field → value maps, implicitly AND-ed.
//!
//! Values are parsed at the boundary instead of trusted: a JSON object is
//! either a tagged date range, a tagged relative date, or match options with
//! only `any`/`all`/`not`/`exact` keys. Anything else is rejected with
//! [`QueryError::InvalidPredicate`]. Field names are never validated here.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::{QueryError, Result};

use super::date_range::{DateRange, RelativeDate, TimeUnit};
use super::match_value::MatchOptions;

/// The value of a single predicate field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum PredicateValue {
    Bool(bool),
    Number(Number),
    Text(String),
    List(Vec<String>),
    Match(MatchOptions),
    DateRange(DateRange),
    RelativeDate(RelativeDate),
}

impl PredicateValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PredicateValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_match(&self) -> Option<&MatchOptions> {
        match self {
            PredicateValue::Match(options) => Some(options),
            _ => None,
        }
    }
}

impl TryFrom<Value> for PredicateValue {
    type Error = QueryError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bool(flag) => Ok(PredicateValue::Bool(flag)),
            Value::Number(number) => Ok(PredicateValue::Number(number)),
            Value::String(text) => Ok(PredicateValue::Text(text)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(text) => Ok(text),
                    other => Err(QueryError::InvalidPredicate(format!(
                        "list values must be strings, found {other}"
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(PredicateValue::List),
            Value::Object(map) => parse_object(map),
            Value::Null => Err(QueryError::InvalidPredicate(
                "null is not a valid predicate value".to_string(),
            )),
        }
    }
}

fn parse_object(map: Map<String, Value>) -> Result<PredicateValue> {
    match map.get("type").and_then(Value::as_str) {
        Some("date-range") => Ok(PredicateValue::DateRange(DateRange {
            from: millis(&map, "from")?,
            to: millis(&map, "to")?,
        })),
        Some("relative-date") => {
            let unit = map
                .get("unit")
                .and_then(Value::as_str)
                .and_then(TimeUnit::parse)
                .ok_or_else(|| {
                    QueryError::InvalidPredicate("relative date has an unknown unit".to_string())
                })?;
            let num = map.get("num").and_then(Value::as_i64).ok_or_else(|| {
                QueryError::InvalidPredicate("relative date requires an integer num".to_string())
            })?;
            Ok(PredicateValue::RelativeDate(RelativeDate { unit, num }))
        }
        _ => {
            let options: MatchOptions = serde_json::from_value(Value::Object(map))
                .map_err(|error| {
                    QueryError::InvalidPredicate(format!("malformed match options: {error}"))
                })?;
            if options.is_empty() {
                return Err(QueryError::InvalidPredicate(
                    "match options need at least one of any, all, not, exact".to_string(),
                ));
            }
            Ok(PredicateValue::Match(options))
        }
    }
}

fn millis(map: &Map<String, Value>, key: &str) -> Result<i64> {
    let value = map.get(key);
    value
        .and_then(Value::as_i64)
        .or_else(|| value.and_then(Value::as_f64).map(|float| float as i64))
        .ok_or_else(|| QueryError::InvalidPredicate(format!("date range requires a numeric {key}")))
}

impl Serialize for PredicateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            PredicateValue::Bool(flag) => serializer.serialize_bool(*flag),
            PredicateValue::Number(number) => number.serialize(serializer),
            PredicateValue::Text(text) => serializer.serialize_str(text),
            PredicateValue::List(values) => values.serialize(serializer),
            PredicateValue::Match(options) => options.serialize(serializer),
            PredicateValue::DateRange(range) => range.serialize(serializer),
            PredicateValue::RelativeDate(relative) => relative.serialize(serializer),
        }
    }
}

impl From<bool> for PredicateValue {
    fn from(flag: bool) -> Self {
        PredicateValue::Bool(flag)
    }
}

impl From<&str> for PredicateValue {
    fn from(text: &str) -> Self {
        PredicateValue::Text(text.to_string())
    }
}

impl From<String> for PredicateValue {
    fn from(text: String) -> Self {
        PredicateValue::Text(text)
    }
}

impl From<Vec<String>> for PredicateValue {
    fn from(values: Vec<String>) -> Self {
        PredicateValue::List(values)
    }
}

impl From<Vec<&str>> for PredicateValue {
    fn from(values: Vec<&str>) -> Self {
        PredicateValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl From<MatchOptions> for PredicateValue {
    fn from(options: MatchOptions) -> Self {
        PredicateValue::Match(options)
    }
}

impl From<DateRange> for PredicateValue {
    fn from(range: DateRange) -> Self {
        PredicateValue::DateRange(range)
    }
}

impl From<RelativeDate> for PredicateValue {
    fn from(relative: RelativeDate) -> Self {
        PredicateValue::RelativeDate(relative)
    }
}

/// Field conditions that must all hold. Field order is preserved so that
/// compiled clauses and explanations follow the caller's order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    entries: Vec<(String, PredicateValue)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<PredicateValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Sets a field, replacing an existing value in place.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<PredicateValue>,
    ) -> Option<PredicateValue> {
        let field = field.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((field, value));
                None
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&PredicateValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, field: &str) -> Option<PredicateValue> {
        let position = self.entries.iter().position(|(name, _)| name == field)?;
        Some(self.entries.remove(position).1)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PredicateValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses a predicate from JSON text, keeping the document's key order.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|error| QueryError::InvalidPredicate(error.to_string()))
    }
}

impl IntoIterator for Predicate {
    type Item = (String, PredicateValue);
    type IntoIter = std::vec::IntoIter<(String, PredicateValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, PredicateValue)> for Predicate {
    fn from_iter<I: IntoIterator<Item = (String, PredicateValue)>>(iter: I) -> Self {
        let mut predicate = Predicate::new();
        for (field, value) in iter {
            predicate.insert(field, value);
        }
        predicate
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, value) in &self.entries {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(PredicateVisitor)
    }
}

struct PredicateVisitor;

impl<'de> Visitor<'de> for PredicateVisitor {
    type Value = Predicate;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of field names to predicate values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Predicate, A::Error> {
        let mut predicate = Predicate::new();
        while let Some((field, value)) = access.next_entry::<String, PredicateValue>()? {
            predicate.insert(field, value);
        }
        Ok(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_value_shape() {
        let predicate = Predicate::from_json_str(
            r#"{
                "term": "water",
                "tags": ["a", "b"],
                "owner": {"any": "x", "not": ["y"]},
                "isopendata": true,
                "created": {"type": "date-range", "from": 1, "to": 2},
                "modified": {"type": "relative-date", "unit": "days", "num": 7}
            }"#,
        )
        .expect("parse");

        assert_eq!(predicate.get("term"), Some(&PredicateValue::from("water")));
        assert_eq!(predicate.get("tags"), Some(&PredicateValue::from(vec!["a", "b"])));
        assert_eq!(
            predicate.get("owner"),
            Some(&PredicateValue::Match(MatchOptions::any("x").with_not(vec!["y"])))
        );
        assert_eq!(predicate.get("isopendata"), Some(&PredicateValue::Bool(true)));
        assert_eq!(
            predicate.get("created"),
            Some(&PredicateValue::DateRange(DateRange::new(1, 2)))
        );
        assert_eq!(
            predicate.get("modified"),
            Some(&PredicateValue::RelativeDate(RelativeDate::new(TimeUnit::Days, 7)))
        );
    }

    #[test]
    fn keeps_field_order() {
        let predicate = Predicate::from_json_str(r#"{"zeta": "1", "alpha": "2", "mid": "3"}"#)
            .expect("parse");
        let fields: Vec<_> = predicate.fields().collect();
        assert_eq!(fields, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn rejects_malformed_match_options() {
        assert!(Predicate::from_json_str(r#"{"tags": {"anyof": ["a"]}}"#).is_err());
        assert!(Predicate::from_json_str(r#"{"tags": {}}"#).is_err());
        assert!(Predicate::from_json_str(r#"{"tags": {"any": [1, 2]}}"#).is_err());
    }

    #[test]
    fn rejects_malformed_dates_and_lists() {
        assert!(Predicate::from_json_str(r#"{"created": {"type": "date-range", "from": 1}}"#)
            .is_err());
        assert!(Predicate::from_json_str(
            r#"{"created": {"type": "relative-date", "unit": "fortnights", "num": 1}}"#
        )
        .is_err());
        assert!(Predicate::from_json_str(r#"{"tags": ["a", 1]}"#).is_err());
        assert!(Predicate::from_json_str(r#"{"tags": null}"#).is_err());
    }

    #[test]
    fn unknown_fields_are_accepted() {
        let predicate = Predicate::from_json_str(r#"{"customField": "x"}"#).expect("parse");
        assert!(predicate.contains("customField"));
    }

    #[test]
    fn serializes_back_to_json() {
        let predicate = Predicate::new()
            .with("tags", MatchOptions::any(vec!["a"]))
            .with("name", "park");
        assert_eq!(
            serde_json::to_value(&predicate).unwrap(),
            json!({"tags": {"any": ["a"]}, "name": "park"})
        );
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut predicate = Predicate::new().with("a", "1").with("b", "2");
        let previous = predicate.insert("a", "3");
        assert_eq!(previous, Some(PredicateValue::from("1")));
        let fields: Vec<_> = predicate.fields().collect();
        assert_eq!(fields, vec!["a", "b"]);
    }
}
