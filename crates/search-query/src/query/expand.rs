//! Expansion of terse predicates into canonical form.
//!
//! Field-level expansion dispatches on [`FieldKind`]:
//! - pass-through fields are copied verbatim
//! - date fields resolve relative dates into date ranges
//! - every other field is coerced into [`MatchOptions`]
//!
//! Before that, `$` tokens in `type` (and names in the legacy `subFilters`
//! field) are replaced by the predicate fragments registered for them. The expander never mutates its input and expanding an
//! already expanded query returns it unchanged.

use chrono::{DateTime, Utc};

use super::field_kind::FieldKind;
use super::filter::{Filter, Operation, Query};
use super::match_value::{to_match_options, MatchOptions, OneOrMany};
use super::named_filters::{is_named_filter_token, lookup_named_filter, Fragment};
use super::predicate::{Predicate, PredicateValue};

const TYPE_FIELD: &str = "type";
const SUB_FILTERS_FIELD: &str = "subFilters";

/// Expands every filter of a query, resolving relative dates against now.
pub fn expand_query(query: &Query) -> Query {
    expand_query_at(query, Utc::now())
}

/// Expands every filter of a query, resolving relative dates against `now`.
pub fn expand_query_at(query: &Query, now: DateTime<Utc>) -> Query {
    Query {
        target_entity: query.target_entity,
        filters: query
            .filters
            .iter()
            .flat_map(|filter| expand_filter_at(filter, now))
            .collect(),
    }
}

/// Expands one filter. Named type filters may produce an extra `OR` filter,
/// so the result is a list that replaces `filter` inside its query.
pub fn expand_filter(filter: &Filter) -> Vec<Filter> {
    expand_filter_at(filter, Utc::now())
}

pub fn expand_filter_at(filter: &Filter, now: DateTime<Utc>) -> Vec<Filter> {
    let mut kept = Vec::with_capacity(filter.predicates.len());
    let mut alternatives = Vec::new();

    for predicate in &filter.predicates {
        let expanded = expand_type_tokens(predicate);
        if filter.operation == Operation::Or || expanded.len() == 1 {
            kept.extend(expanded);
        } else {
            alternatives.push(expanded);
        }
    }

    let expand_all = |predicates: Vec<Predicate>| -> Vec<Predicate> {
        predicates
            .iter()
            .map(|predicate| expand_predicate_at(predicate, now))
            .collect()
    };

    let mut filters = Vec::with_capacity(1 + alternatives.len());
    if !kept.is_empty() || filter.predicates.is_empty() {
        filters.push(Filter::new(filter.operation, expand_all(kept)));
    }
    filters.extend(
        alternatives
            .into_iter()
            .map(|predicates| Filter::or(expand_all(predicates))),
    );
    filters
}

/// Field-level expansion of a single predicate.
pub fn expand_predicate(predicate: &Predicate) -> Predicate {
    expand_predicate_at(predicate, Utc::now())
}

pub fn expand_predicate_at(predicate: &Predicate, now: DateTime<Utc>) -> Predicate {
    predicate
        .iter()
        .map(|(field, value)| (field.to_string(), expand_value(field, value.clone(), now)))
        .collect()
}

fn expand_value(field: &str, value: PredicateValue, now: DateTime<Utc>) -> PredicateValue {
    match FieldKind::of(field) {
        FieldKind::PassThrough => value,
        FieldKind::Date => match value {
            PredicateValue::RelativeDate(relative) => {
                PredicateValue::DateRange(relative.resolve_at(now))
            }
            other => other,
        },
        FieldKind::Match => match value {
            PredicateValue::Text(text) => PredicateValue::Match(to_match_options(text)),
            PredicateValue::List(values) => PredicateValue::Match(to_match_options(values)),
            PredicateValue::Bool(flag) => PredicateValue::Match(to_match_options(flag.to_string())),
            PredicateValue::Number(number) => {
                PredicateValue::Match(to_match_options(number.to_string()))
            }
            other => other,
        },
    }
}

// ---------------------------------------------------------------------------
// Named type filters
// ---------------------------------------------------------------------------

/// A `type` value split around its `$` tokens.
#[derive(Debug, Default)]
struct TypeTokens {
    tokens: Vec<String>,
    /// Non-token `type` values; they form an alternative of their own.
    rest: Option<PredicateValue>,
    /// `all`, `not` and `exact` conditions that every alternative must meet.
    constraints: MatchOptions,
}

/// Replaces `$` tokens in `type` and `subFilters` with their registered
/// fragments.
///
/// Returns the alternatives the predicate stands for: the predicate itself
/// when it has no tokens, otherwise the remaining `type` values (if any) plus
/// one predicate per registered fragment. Each alternative keeps the
/// predicate's other fields, and the `all`/`not`/`exact` conditions on `type`
/// are AND-ed onto every alternative. Unregistered tokens are dropped.
fn expand_type_tokens(predicate: &Predicate) -> Vec<Predicate> {
    let split = predicate
        .get(TYPE_FIELD)
        .map(split_type_tokens)
        .unwrap_or_default();
    let sub_filters = predicate.get(SUB_FILTERS_FIELD).map(sub_filter_tokens);
    if split.tokens.is_empty() && sub_filters.is_none() {
        return vec![predicate.clone()];
    }

    let mut base = predicate.clone();
    base.remove(TYPE_FIELD);
    base.remove(SUB_FILTERS_FIELD);

    let constraints = split.constraints;
    let mut alternatives = Vec::new();
    if let Some(rest) = split.rest {
        alternatives.push(base.clone().with(TYPE_FIELD, rest));
    }

    let tokens = split.tokens.into_iter().chain(sub_filters.into_iter().flatten());
    for token in tokens {
        match lookup_named_filter(&token) {
            Some(fragments) => alternatives.extend(
                fragments
                    .iter()
                    .map(|fragment| apply_fragment(base.clone(), fragment, &constraints)),
            ),
            None => tracing::debug!(token = %token, "dropping unregistered named type filter"),
        }
    }

    if alternatives.is_empty() {
        if !constraints.is_empty() {
            base.insert(TYPE_FIELD, constraints);
        }
        alternatives.push(base);
    }
    alternatives
}

fn apply_fragment(
    mut predicate: Predicate,
    fragment: &Fragment,
    constraints: &MatchOptions,
) -> Predicate {
    let mut constrained_type = false;
    for (field, values) in fragment.iter() {
        if predicate.contains(field) {
            tracing::debug!(field = %field, "named type filter overrides predicate field");
        }
        let mut options = MatchOptions::any(*values);
        if *field == TYPE_FIELD {
            options.all = constraints.all.clone();
            options.not = constraints.not.clone();
            options.exact = constraints.exact.clone();
            constrained_type = true;
        }
        predicate.insert(*field, options);
    }
    if !constrained_type && !constraints.is_empty() {
        predicate.insert(TYPE_FIELD, constraints.clone());
    }
    predicate
}

fn split_type_tokens(value: &PredicateValue) -> TypeTokens {
    match value {
        PredicateValue::Text(text) if is_named_filter_token(text) => TypeTokens {
            tokens: vec![text.clone()],
            ..TypeTokens::default()
        },
        PredicateValue::List(values) => {
            let (tokens, rest) = partition_tokens(values.iter().map(String::as_str));
            TypeTokens {
                tokens,
                rest: (!rest.is_empty()).then(|| PredicateValue::List(rest)),
                constraints: MatchOptions::default(),
            }
        }
        PredicateValue::Match(options) => {
            let (tokens, rest) = match options.any.as_ref() {
                Some(any) => partition_tokens(any.iter()),
                None => (Vec::new(), Vec::new()),
            };
            let constraints = MatchOptions {
                any: None,
                ..options.clone()
            };
            let rest = (!rest.is_empty()).then(|| {
                PredicateValue::Match(MatchOptions {
                    any: Some(OneOrMany::Many(rest)),
                    ..constraints.clone()
                })
            });
            TypeTokens {
                tokens,
                rest,
                constraints,
            }
        }
        other => TypeTokens {
            rest: Some(other.clone()),
            ..TypeTokens::default()
        },
    }
}

/// Legacy content filters name their type groups in `subFilters`, with or
/// without the `$` prefix.
fn sub_filter_tokens(value: &PredicateValue) -> Vec<String> {
    let names: Vec<String> = match value {
        PredicateValue::Text(text) => vec![text.clone()],
        PredicateValue::List(values) => values.clone(),
        PredicateValue::Match(options) => options
            .any
            .as_ref()
            .map(OneOrMany::to_vec)
            .unwrap_or_default(),
        other => {
            tracing::debug!(value = ?other, "ignoring subFilters value without names");
            Vec::new()
        }
    };
    names
        .into_iter()
        .map(|name| {
            if is_named_filter_token(&name) {
                name
            } else {
                format!("${name}")
            }
        })
        .collect()
}

fn partition_tokens<'a>(values: impl Iterator<Item = &'a str>) -> (Vec<String>, Vec<String>) {
    let (tokens, rest): (Vec<&str>, Vec<&str>) =
        values.partition(|value| is_named_filter_token(value));
    (
        tokens.into_iter().map(str::to_string).collect(),
        rest.into_iter().map(str::to_string).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::date_range::{DateRange, RelativeDate, TimeUnit};
    use crate::query::filter::EntityType;
    use crate::query::named_filters::{DATASET_TYPES, MAP_TYPES, SITE_TYPES};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn list_field_expands_to_any() {
        let predicate = Predicate::new().with("tags", vec!["red", "blue"]);
        let expanded = expand_predicate(&predicate);
        assert_eq!(
            expanded.get("tags"),
            Some(&PredicateValue::Match(MatchOptions::any(vec!["red", "blue"])))
        );
    }

    #[test]
    fn pass_through_fields_are_copied() {
        let predicate = Predicate::new()
            .with("term", "water")
            .with("bbox", "1,2,3,4")
            .with("isopendata", true);
        assert_eq!(expand_predicate(&predicate), predicate);
    }

    #[test]
    fn relative_dates_resolve_against_now() {
        let predicate = Predicate::new()
            .with("modified", RelativeDate::new(TimeUnit::Days, 1))
            .with("created", DateRange::new(1, 2));
        let expanded = expand_predicate_at(&predicate, now());
        let to = now().timestamp_millis();
        assert_eq!(
            expanded.get("modified"),
            Some(&PredicateValue::DateRange(DateRange::new(to - 86_400_000, to)))
        );
        assert_eq!(
            expanded.get("created"),
            Some(&PredicateValue::DateRange(DateRange::new(1, 2)))
        );
    }

    #[test]
    fn expansion_is_idempotent() {
        let predicate = Predicate::new()
            .with("tags", vec!["a", "b"])
            .with("owner", "me")
            .with("access", MatchOptions::not("private"))
            .with("term", "water")
            .with("created", RelativeDate::new(TimeUnit::Months, 1));
        let once = expand_predicate_at(&predicate, now());
        let twice = expand_predicate_at(&once, now());
        assert_eq!(once, twice);
    }

    #[test]
    fn scalar_token_replaces_type() {
        let filter = Filter::and(vec![Predicate::new()
            .with("type", "$dataset")
            .with("owner", "me")]);
        let expanded = expand_filter_at(&filter, now());
        assert_eq!(expanded.len(), 1);
        let predicate = &expanded[0].predicates[0];
        assert_eq!(
            predicate.get("type"),
            Some(&PredicateValue::Match(MatchOptions::any(DATASET_TYPES)))
        );
        assert_eq!(
            predicate.get("owner"),
            Some(&PredicateValue::Match(MatchOptions::any(vec!["me"])))
        );
    }

    #[test]
    fn mixed_type_list_moves_alternatives_into_or_filter() {
        let filter = Filter::and(vec![
            Predicate::new().with("owner", "me"),
            Predicate::new().with("type", vec!["Web Map", "$dataset"]),
        ]);
        let expanded = expand_filter_at(&filter, now());
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0].operation, Operation::And);
        assert_eq!(expanded[0].predicates.len(), 1);
        assert_eq!(expanded[1].operation, Operation::Or);
        assert_eq!(expanded[1].predicates.len(), 2);
        assert_eq!(
            expanded[1].predicates[0].get("type"),
            Some(&PredicateValue::Match(MatchOptions::any(vec!["Web Map"])))
        );
    }

    #[test]
    fn or_filter_splices_alternatives_in_place() {
        let filter = Filter::or(vec![
            Predicate::new().with("type", "$storymap"),
            Predicate::new().with("tags", "x"),
        ]);
        let expanded = expand_filter_at(&filter, now());
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].predicates.len(), 3);
        assert_eq!(
            expanded[0].predicates[1].get("typekeywords"),
            Some(&PredicateValue::Match(MatchOptions::any(vec!["Story Map"])))
        );
    }

    #[test]
    fn lone_and_predicate_becomes_or_filter() {
        let filter = Filter::and(vec![Predicate::new().with("type", "$dashboard")]);
        let expanded = expand_filter_at(&filter, now());
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].operation, Operation::Or);
        assert_eq!(expanded[0].predicates.len(), 2);
    }

    #[test]
    fn unregistered_tokens_are_dropped() {
        let filter = Filter::and(vec![Predicate::new()
            .with("type", vec!["Web Map", "$bogus"])
            .with("owner", "me")]);
        let expanded = expand_filter_at(&filter, now());
        assert_eq!(expanded.len(), 1);
        assert_eq!(
            expanded[0].predicates[0].get("type"),
            Some(&PredicateValue::Match(MatchOptions::any(vec!["Web Map"])))
        );

        let only_bogus = Filter::and(vec![Predicate::new().with("type", "$bogus")]);
        let expanded = expand_filter_at(&only_bogus, now());
        assert!(expanded[0].predicates[0].is_empty());
    }

    #[test]
    fn type_conditions_constrain_every_fragment() {
        let filter = Filter::and(vec![Predicate::new().with(
            "type",
            MatchOptions::any(vec!["$site"]).with_not(vec!["Hub Site Application"]),
        )]);
        let expanded = expand_filter_at(&filter, now());
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].operation, Operation::And);
        assert_eq!(expanded[0].predicates.len(), 1);
        assert_eq!(
            expanded[0].predicates[0].get("type"),
            Some(&PredicateValue::Match(
                MatchOptions::any(SITE_TYPES).with_not(vec!["Hub Site Application"])
            ))
        );
    }

    #[test]
    fn leftover_any_values_keep_type_conditions() {
        let filter = Filter::or(vec![Predicate::new().with(
            "type",
            MatchOptions::any(vec!["Web Map", "$storymap"]).with_all(vec!["Hub"]),
        )]);
        let expanded = expand_filter_at(&filter, now());
        let predicates = &expanded[0].predicates;
        assert_eq!(predicates.len(), 3);
        assert_eq!(
            predicates[0].get("type"),
            Some(&PredicateValue::Match(
                MatchOptions::any(vec!["Web Map"]).with_all(vec!["Hub"])
            ))
        );
        assert_eq!(
            predicates[2].get("type"),
            Some(&PredicateValue::Match(
                MatchOptions::any(vec!["Web Mapping Application"]).with_all(vec!["Hub"])
            ))
        );
    }

    #[test]
    fn unregistered_tokens_keep_type_conditions() {
        let filter = Filter::and(vec![Predicate::new().with(
            "type",
            MatchOptions::any(vec!["$bogus"]).with_not(vec!["Web Map"]),
        )]);
        let expanded = expand_filter_at(&filter, now());
        assert_eq!(
            expanded[0].predicates[0].get("type"),
            Some(&PredicateValue::Match(MatchOptions::not(vec!["Web Map"])))
        );
    }

    #[test]
    fn sub_filters_splice_like_type_tokens() {
        let filter = Filter::and(vec![Predicate::new()
            .with("subFilters", vec!["maps", "$document"])
            .with("owner", "me")]);
        let expanded = expand_filter_at(&filter, now());
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].operation, Operation::Or);
        let predicates = &expanded[0].predicates;
        assert_eq!(predicates.len(), 2);
        assert!(predicates.iter().all(|p| !p.contains("subFilters")));
        assert_eq!(
            predicates[0].get("type"),
            Some(&PredicateValue::Match(MatchOptions::any(MAP_TYPES)))
        );
        assert_eq!(
            predicates[1].get("owner"),
            Some(&PredicateValue::Match(MatchOptions::any(vec!["me"])))
        );
    }

    #[test]
    fn sub_filters_join_the_type_alternatives() {
        let filter = Filter::or(vec![Predicate::new()
            .with("type", "Web Map")
            .with("subFilters", "$dataset")]);
        let expanded = expand_filter_at(&filter, now());
        let predicates = &expanded[0].predicates;
        assert_eq!(predicates.len(), 2);
        assert_eq!(
            predicates[0].get("type"),
            Some(&PredicateValue::Match(MatchOptions::any(vec!["Web Map"])))
        );
        assert_eq!(
            predicates[1].get("type"),
            Some(&PredicateValue::Match(MatchOptions::any(DATASET_TYPES)))
        );
    }

    #[test]
    fn query_expansion_preserves_structure_and_is_idempotent() {
        let query = Query::new(EntityType::Item)
            .with_filter(Filter::or(vec![
                Predicate::new().with("tags", "tag1"),
                Predicate::new().with("tags", "tag2"),
            ]))
            .with_filter(Filter::and(vec![Predicate::new().with("type", "$map")]));
        let once = expand_query_at(&query, now());
        assert_eq!(once.filters.len(), 2);
        assert_eq!(once.filters[0].operation, Operation::Or);
        assert_eq!(expand_query_at(&once, now()), once);
    }
}
