use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query::{Filter, Predicate, Query};

/// Which set test a reason reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchCondition {
    In,
    All,
    NotIn,
    /// The field is missing from the result.
    Exists,
}

/// One field-level check and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReason {
    pub attribute: String,
    /// Values found on the result.
    pub values: Vec<String>,
    pub condition: MatchCondition,
    pub matched: bool,
    /// Option set the values were compared against.
    pub requirement: Vec<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl MatchReason {
    pub(crate) fn missing(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            values: Vec::new(),
            condition: MatchCondition::Exists,
            matched: false,
            requirement: Vec::new(),
            message: format!("{attribute} is not present on the result"),
            meta: None,
        }
    }

    pub(crate) fn compared(
        attribute: &str,
        condition: MatchCondition,
        values: &[String],
        requirement: Vec<String>,
        matched: bool,
    ) -> Self {
        let listed = requirement.join(", ");
        let message = match (condition, matched) {
            (MatchCondition::In, true) => format!("{attribute} includes one of [{listed}]"),
            (MatchCondition::In, false) => format!("{attribute} includes none of [{listed}]"),
            (MatchCondition::All, true) => format!("{attribute} includes all of [{listed}]"),
            (MatchCondition::All, false) => format!("{attribute} is missing some of [{listed}]"),
            (MatchCondition::NotIn, true) => format!("{attribute} excludes all of [{listed}]"),
            (MatchCondition::NotIn, false) => format!("{attribute} includes some of [{listed}]"),
            (MatchCondition::Exists, _) => format!("{attribute} is not present on the result"),
        };
        Self {
            attribute: attribute.to_string(),
            values: values.to_vec(),
            condition,
            matched,
            requirement,
            message,
            meta: None,
        }
    }

    pub(crate) fn with_meta(mut self, meta: Option<Value>) -> Self {
        self.meta = meta;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateExplanation {
    pub predicate: Predicate,
    pub matched: bool,
    pub reasons: Vec<MatchReason>,
}

/// Outcome of one expanded filter.
///
/// Token expansion can split one query filter into several, so `filter` is
/// the expanded form and `source` indexes the filter it came from in
/// [`QueryExplanation::query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExplanation {
    pub source: usize,
    pub filter: Filter,
    pub matched: bool,
    pub reasons: Vec<PredicateExplanation>,
}

/// Whether a result satisfies a query, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExplanation {
    pub result: Map<String, Value>,
    pub query: Query,
    pub matched: bool,
    pub reasons: Vec<FilterExplanation>,
    /// Every leaf reason in filter, predicate, field order.
    pub summary: Vec<MatchReason>,
}
