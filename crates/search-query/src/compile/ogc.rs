//! Boolean filter-expression backend.
//!
//! Renders the canonical IR as `field=value`, `field IN (..)` and
//! `field BETWEEN a AND b` comparisons. Reserved fields are carried by other
//! request components and never appear in the expression.

use chrono::{DateTime, Utc};

use super::canonical::{
    lower_query, CanonicalFilter, CanonicalPredicate, FieldClause, FieldPolicy, FieldTest,
};
use crate::config::OgcSettings;
use crate::query::Query;

const EMPTY_FILTER: &str = "()";

pub fn serialize_query_for_ogc(query: &Query, settings: &OgcSettings) -> String {
    serialize_query_for_ogc_at(query, settings, Utc::now())
}

/// Same as [`serialize_query_for_ogc`] with an explicit evaluation time.
pub fn serialize_query_for_ogc_at(
    query: &Query,
    settings: &OgcSettings,
    now: DateTime<Utc>,
) -> String {
    let lowered = lower_query(query, now, settings);

    lowered
        .filters
        .iter()
        .map(render_filter)
        .filter(|rendered| {
            let empty = rendered == EMPTY_FILTER;
            if empty {
                tracing::debug!("eliding empty filter");
            }
            !empty
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

impl FieldPolicy for OgcSettings {
    fn includes(&self, field: &str) -> bool {
        !self.is_reserved(field)
    }
}

fn render_filter(filter: &CanonicalFilter) -> String {
    let keyword = format!(" {} ", filter.operation.keyword());
    let predicates = filter
        .predicates
        .iter()
        .map(render_predicate)
        .filter(|rendered| !rendered.is_empty())
        .map(|rendered| format!("({rendered})"))
        .collect::<Vec<_>>()
        .join(&keyword);
    format!("({predicates})")
}

fn render_predicate(predicate: &CanonicalPredicate) -> String {
    predicate
        .clauses
        .iter()
        .filter_map(render_clause)
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn render_clause(clause: &FieldClause) -> Option<String> {
    let field = clause.field.as_str();
    let mut parts: Vec<String> = clause
        .tests
        .iter()
        .filter_map(|test| render_test(field, test))
        .collect();
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(format!("({})", parts.join(" AND "))),
    }
}

fn render_test(field: &str, test: &FieldTest) -> Option<String> {
    let rendered = match test {
        FieldTest::FreeText(_) => {
            tracing::debug!(field, "free text has no boolean filter form");
            return None;
        }
        FieldTest::Equals(value) => format!("{field}={}", literal(value)),
        FieldTest::AnyOf(values) => match values.as_slice() {
            [value] => format!("{field}={}", literal(value)),
            _ => format!("{field} IN ({})", literal_list(values)),
        },
        FieldTest::AllOf(values) | FieldTest::Exact(values) => match values.as_slice() {
            [value] => format!("{field}={}", literal(value)),
            _ => format!(
                "({})",
                values
                    .iter()
                    .map(|value| format!("{field}={}", literal(value)))
                    .collect::<Vec<_>>()
                    .join(" AND ")
            ),
        },
        FieldTest::NoneOf(values) => format!("{field} NOT IN ({})", literal_list(values)),
        FieldTest::Between(range) => format!("{field} BETWEEN {} AND {}", range.from, range.to),
        FieldTest::Flag(flag) => format!("{field}={flag}"),
    };
    Some(rendered)
}

/// Quotes values containing whitespace or quotes; bare otherwise.
fn literal(value: &str) -> String {
    if value.chars().any(|c| c.is_whitespace() || c == '\'') {
        format!("'{}'", value.replace('\'', "''"))
    } else {
        value.to_string()
    }
}

fn literal_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| literal(value))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::query::{DateRange, EntityType, Filter, MatchOptions, Predicate};
    use chrono::TimeZone;

    fn settings() -> OgcSettings {
        SearchConfig::default_new().ogc
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn single(predicate: Predicate) -> Query {
        Query::new(EntityType::Item).with_filter(Filter::and(vec![predicate]))
    }

    #[test]
    fn quotes_values_with_whitespace() {
        let query = single(Predicate::new().with("tags", vec!["red", "big green"]));
        let rendered = serialize_query_for_ogc_at(&query, &settings(), now());
        assert!(rendered.contains("tags IN (red, 'big green')"), "{rendered}");
    }

    #[test]
    fn wraps_filters_and_predicates() {
        let query = single(Predicate::new().with("title", "park"));
        assert_eq!(
            serialize_query_for_ogc_at(&query, &settings(), now()),
            "((title=park))"
        );
    }

    #[test]
    fn joins_or_predicates_and_and_filters() {
        let query = Query::new(EntityType::Item)
            .with_filter(Filter::or(vec![
                Predicate::new().with("owner", "a"),
                Predicate::new().with("owner", "b"),
            ]))
            .with_filter(Filter::and(vec![Predicate::new()
                .with("tags", MatchOptions::not(vec!["x", "y"]))
                .with("created", DateRange::new(10, 20))]));
        assert_eq!(
            serialize_query_for_ogc_at(&query, &settings(), now()),
            "((owner=a) OR (owner=b)) AND ((tags NOT IN (x, y) AND created BETWEEN 10 AND 20))"
        );
    }

    #[test]
    fn skips_reserved_fields_and_empty_filters() {
        let query = Query::new(EntityType::Item)
            .with_filter(Filter::and(vec![Predicate::new().with("term", "water")]))
            .with_filter(Filter::and(vec![Predicate::new()
                .with("bbox", "1,2,3,4")
                .with("isopendata", true)]));
        assert_eq!(
            serialize_query_for_ogc_at(&query, &settings(), now()),
            "((isopendata=true))"
        );
    }

    #[test]
    fn renders_all_options_as_conjunction() {
        let query = single(Predicate::new().with(
            "categories",
            MatchOptions::any(vec!["a", "b"]).with_all(vec!["c", "d"]),
        ));
        assert_eq!(
            serialize_query_for_ogc_at(&query, &settings(), now()),
            "(((categories IN (a, b) AND (categories=c AND categories=d))))"
        );
    }

    #[test]
    fn empty_query_renders_nothing() {
        let query = Query::new(EntityType::Item).with_filter(Filter::and(Vec::new()));
        assert_eq!(serialize_query_for_ogc_at(&query, &settings(), now()), "");
    }
}
