//! Key/value search-parameter backend.
//!
//! Renders the canonical IR as `field:"value"` query text plus a separate
//! exact-match `filter` component. Fields sent as request parameters (such as
//! `bbox`) are lifted out of the predicate tree before lowering.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::canonical::{
    lower_query, CanonicalFilter, CanonicalPredicate, FieldClause, FieldPolicy, FieldTest,
};
use crate::config::PortalSettings;
use crate::query::{Operation, PredicateValue, Query};

/// Request fragments for the key/value backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortalSearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl PortalSearchParams {
    pub fn is_empty(&self) -> bool {
        self.q.is_none() && self.filter.is_none() && self.params.is_empty()
    }
}

pub fn serialize_query_for_portal(query: &Query, settings: &PortalSettings) -> PortalSearchParams {
    serialize_query_for_portal_at(query, settings, Utc::now())
}

/// Same as [`serialize_query_for_portal`] with an explicit evaluation time.
pub fn serialize_query_for_portal_at(
    query: &Query,
    settings: &PortalSettings,
    now: DateTime<Utc>,
) -> PortalSearchParams {
    let params = extract_params(query, settings);

    let lowered = lower_query(query, now, settings);

    let mut q_parts = Vec::new();
    let mut filter_parts = Vec::new();
    for filter in &lowered.filters {
        let rendered = render_filter(filter, settings);
        q_parts.extend(rendered.q);
        filter_parts.extend(rendered.filter);
    }

    PortalSearchParams {
        q: join_top_level(q_parts),
        filter: join_top_level(filter_parts),
        params,
    }
}

impl FieldPolicy for PortalSettings {
    /// Parameter fields travel out of band and never reach the query text.
    fn includes(&self, field: &str) -> bool {
        if self.is_param(field) {
            return false;
        }
        let allowed = self.allows(field);
        if !allowed {
            tracing::debug!(field, "dropping field unsupported by portal search");
        }
        allowed
    }
}

/// The first value of each parameter field found anywhere in the query.
fn extract_params(query: &Query, settings: &PortalSettings) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    for field in &settings.param_fields {
        if !settings.allows(field) {
            continue;
        }
        let value = query
            .predicate_values(field)
            .into_iter()
            .find_map(param_text);
        if let Some(value) = value {
            params.insert(field.clone(), value);
        }
    }
    params
}

fn param_text(value: &PredicateValue) -> Option<String> {
    match value {
        PredicateValue::Text(text) => Some(text.clone()),
        PredicateValue::List(values) if !values.is_empty() => Some(values.join(",")),
        PredicateValue::Bool(flag) => Some(flag.to_string()),
        PredicateValue::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct Rendered {
    q: Option<String>,
    filter: Option<String>,
}

fn render_filter(filter: &CanonicalFilter, settings: &PortalSettings) -> Rendered {
    // `filter` is AND-ed with `q`, so exact values may only leave `q` when
    // the whole filter is conjunctive.
    let route_exact = filter.operation == Operation::And || filter.predicates.len() == 1;
    let mut q_parts = Vec::new();
    let mut filter_parts = Vec::new();
    for predicate in &filter.predicates {
        let rendered = render_predicate(predicate, settings, route_exact);
        q_parts.extend(rendered.q);
        filter_parts.extend(rendered.filter);
    }
    Rendered {
        q: group(q_parts, filter.operation),
        filter: group(filter_parts, filter.operation),
    }
}

fn render_predicate(
    predicate: &CanonicalPredicate,
    settings: &PortalSettings,
    route_exact: bool,
) -> Rendered {
    let mut q_parts = Vec::new();
    let mut filter_parts = Vec::new();
    for clause in &predicate.clauses {
        render_clause(clause, settings, route_exact, &mut q_parts, &mut filter_parts);
    }
    Rendered {
        q: group(q_parts, Operation::And),
        filter: group(filter_parts, Operation::And),
    }
}

fn render_clause(
    clause: &FieldClause,
    settings: &PortalSettings,
    route_exact: bool,
    q_parts: &mut Vec<String>,
    filter_parts: &mut Vec<String>,
) {
    let field = clause.field.as_str();
    let filterable = route_exact && settings.is_filterable(field);

    // Exact values that stay in `q` fold into the all-of clause.
    let mut all_values: Vec<String> = Vec::new();
    for test in &clause.tests {
        match test {
            FieldTest::AllOf(values) => all_values.extend(values.iter().cloned()),
            FieldTest::Exact(values) if !filterable => all_values.extend(values.iter().cloned()),
            _ => {}
        }
    }
    let mut all_rendered = false;

    for test in &clause.tests {
        match test {
            FieldTest::FreeText(text) => q_parts.push(text.clone()),
            FieldTest::Equals(value) => q_parts.push(term(field, value)),
            FieldTest::AnyOf(values) => q_parts.extend(terms(field, values, Operation::Or)),
            FieldTest::Exact(values) if filterable => {
                filter_parts.extend(terms(field, values, Operation::And))
            }
            FieldTest::AllOf(_) | FieldTest::Exact(_) => {
                if !all_rendered {
                    q_parts.extend(terms(field, &all_values, Operation::And));
                    all_rendered = true;
                }
            }
            // A bare negation also matches results without the field; the
            // `field:*` guard keeps those out.
            FieldTest::NoneOf(values) => {
                let mut negated = vec![format!("{field}:*")];
                negated.extend(values.iter().map(|value| format!("-{}", term(field, value))));
                q_parts.extend(group(negated, Operation::And));
            }
            FieldTest::Between(range) => q_parts.push(format!("{field}:[{} TO {}]", range.from, range.to)),
            FieldTest::Flag(flag) => q_parts.push(format!("{field}:{flag}")),
        }
    }
}

fn term(field: &str, value: &str) -> String {
    format!("{field}:\"{}\"", value.replace('"', "\\\""))
}

fn terms(field: &str, values: &[String], operation: Operation) -> Option<String> {
    group(
        values.iter().map(|value| term(field, value)).collect(),
        operation,
    )
}

/// Joins parts with `operation`, parenthesizing when there is more than one.
fn group(mut parts: Vec<String>, operation: Operation) -> Option<String> {
    parts.retain(|part| !part.is_empty());
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(format!("({})", parts.join(&format!(" {} ", operation.keyword())))),
    }
}

fn join_top_level(parts: Vec<String>) -> Option<String> {
    let joined = parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" AND ");
    (!joined.is_empty()).then_some(joined)
}
