//! Canonical boolean IR shared by every backend renderer.
//!
//! A query is lowered once into AND-of-filters, each filter an AND/OR of
//! predicates, each predicate an AND of field clauses, each field clause an
//! AND of atomic tests. Renderers only decide syntax; which documents match is
//! fixed here, and [`CanonicalQuery::matches`] is the reference evaluator.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{QueryError, Result};
use crate::query::{
    arrayify, check_all, check_any, check_not, expand_query_at, DateRange, MatchOptions,
    OneOrMany, Operation, Predicate, PredicateValue, Query,
};

const TERM_FIELD: &str = "term";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalQuery {
    pub filters: Vec<CanonicalFilter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalFilter {
    pub operation: Operation,
    pub predicates: Vec<CanonicalPredicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPredicate {
    pub clauses: Vec<FieldClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldClause {
    pub field: String,
    pub tests: Vec<FieldTest>,
}

/// An atomic comparison against one field of a result.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldTest {
    /// Free-text search; only the key/value backend renders it.
    FreeText(String),
    /// A single verbatim value.
    Equals(String),
    AnyOf(Vec<String>),
    AllOf(Vec<String>),
    NoneOf(Vec<String>),
    /// Like `AllOf`, for backends with a dedicated exact-match clause.
    Exact(Vec<String>),
    Between(DateRange),
    Flag(bool),
}

/// Decides which fields a backend renders.
pub trait FieldPolicy {
    fn includes(&self, field: &str) -> bool;
}

/// Renders every field; used by the reference evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllFields;

impl FieldPolicy for AllFields {
    fn includes(&self, _field: &str) -> bool {
        true
    }
}

/// Expands `query` at `now` and lowers every field `policy` includes.
///
/// Empty field clauses, predicates and filters are dropped so the IR mirrors
/// exactly what a backend receives.
pub fn lower_query(
    query: &Query,
    now: DateTime<Utc>,
    policy: &dyn FieldPolicy,
) -> CanonicalQuery {
    let expanded = expand_query_at(query, now);
    let filters = expanded
        .filters
        .iter()
        .filter_map(|filter| {
            let predicates: Vec<_> = filter
                .predicates
                .iter()
                .filter_map(|predicate| lower_predicate(predicate, now, policy))
                .collect();
            (!predicates.is_empty()).then_some(CanonicalFilter {
                operation: filter.operation,
                predicates,
            })
        })
        .collect();
    CanonicalQuery { filters }
}

fn lower_predicate(
    predicate: &Predicate,
    now: DateTime<Utc>,
    policy: &dyn FieldPolicy,
) -> Option<CanonicalPredicate> {
    let clauses: Vec<_> = predicate
        .iter()
        .filter(|(field, _)| policy.includes(field))
        .filter_map(|(field, value)| {
            let tests = lower_value(field, value, now);
            (!tests.is_empty()).then(|| FieldClause {
                field: field.to_string(),
                tests,
            })
        })
        .collect();
    (!clauses.is_empty()).then_some(CanonicalPredicate { clauses })
}

fn lower_value(field: &str, value: &PredicateValue, now: DateTime<Utc>) -> Vec<FieldTest> {
    match value {
        PredicateValue::Text(text) if field == TERM_FIELD => vec![FieldTest::FreeText(text.clone())],
        PredicateValue::Text(text) => vec![FieldTest::Equals(text.clone())],
        PredicateValue::Number(number) => vec![FieldTest::Equals(number.to_string())],
        PredicateValue::Bool(flag) => vec![FieldTest::Flag(*flag)],
        PredicateValue::List(values) if values.is_empty() => Vec::new(),
        PredicateValue::List(values) => vec![FieldTest::AnyOf(values.clone())],
        PredicateValue::Match(options) => lower_match_options(options),
        PredicateValue::DateRange(range) => vec![FieldTest::Between(*range)],
        PredicateValue::RelativeDate(relative) => vec![FieldTest::Between(relative.resolve_at(now))],
    }
}

fn lower_match_options(options: &MatchOptions) -> Vec<FieldTest> {
    let non_empty = |values: &Option<OneOrMany>| {
        values
            .as_ref()
            .map(|values| values.to_vec())
            .filter(|values| !values.is_empty())
    };

    let mut tests = Vec::new();
    if let Some(values) = non_empty(&options.any) {
        tests.push(FieldTest::AnyOf(values));
    }
    if let Some(values) = non_empty(&options.all) {
        tests.push(FieldTest::AllOf(values));
    }
    if let Some(values) = non_empty(&options.not) {
        tests.push(FieldTest::NoneOf(values));
    }
    if let Some(values) = non_empty(&options.exact) {
        tests.push(FieldTest::Exact(values));
    }
    tests
}

// ---------------------------------------------------------------------------
// Reference evaluation
// ---------------------------------------------------------------------------

impl CanonicalQuery {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluates the IR against one result document.
    pub fn matches(&self, document: &Map<String, Value>) -> Result<bool> {
        for filter in &self.filters {
            if !filter.matches(document)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl CanonicalFilter {
    pub fn matches(&self, document: &Map<String, Value>) -> Result<bool> {
        let mut outcomes = Vec::with_capacity(self.predicates.len());
        for predicate in &self.predicates {
            outcomes.push(predicate.matches(document)?);
        }
        Ok(match self.operation {
            Operation::And => outcomes.iter().all(|matched| *matched),
            Operation::Or => outcomes.iter().any(|matched| *matched),
        })
    }
}

impl CanonicalPredicate {
    pub fn matches(&self, document: &Map<String, Value>) -> Result<bool> {
        for clause in &self.clauses {
            if !clause.matches(document)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl FieldClause {
    /// A clause on a field the document lacks never matches.
    pub fn matches(&self, document: &Map<String, Value>) -> Result<bool> {
        let raw = match document.get(&self.field) {
            Some(Value::Null) | None => None,
            Some(raw) => Some(raw),
        };
        let values = raw.map(arrayify).unwrap_or_default();

        for test in &self.tests {
            let matched = match test {
                FieldTest::FreeText(_) => {
                    return Err(QueryError::NotImplemented(
                        "free-text evaluation of term".to_string(),
                    ))
                }
                _ if raw.is_none() => false,
                FieldTest::Equals(value) => values.iter().any(|candidate| candidate == value),
                FieldTest::AnyOf(options) => check_any(options, &values),
                FieldTest::AllOf(options) | FieldTest::Exact(options) => check_all(options, &values),
                FieldTest::NoneOf(options) => check_not(options, &values),
                FieldTest::Between(range) => raw
                    .and_then(|raw| raw.as_i64().or_else(|| raw.as_f64().map(|float| float as i64)))
                    .is_some_and(|timestamp| range.contains(timestamp)),
                FieldTest::Flag(flag) => values.iter().any(|candidate| *candidate == flag.to_string()),
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
