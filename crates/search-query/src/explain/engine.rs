use chrono::Utc;
use futures_util::future::try_join_all;
use serde_json::{json, Map, Value};

use super::group::{GroupMembershipSource, SharedGroupSource};
use super::types::{
    FilterExplanation, MatchCondition, MatchReason, PredicateExplanation, QueryExplanation,
};
use crate::error::{QueryError, Result};
use crate::query::{
    arrayify, check_all, check_any, check_not, expand_filter_at, EntityType, FieldKind, Filter,
    MatchOptions, OneOrMany, Operation, Predicate, PredicateValue, Query,
};

const GROUP_FIELD: &str = "group";
const ID_FIELD: &str = "id";

/// Explains results against queries, looking up group memberships through
/// the shared source.
#[derive(Clone)]
pub struct Explainer {
    groups: SharedGroupSource,
}

impl Explainer {
    pub fn new(groups: SharedGroupSource) -> Self {
        Self { groups }
    }

    pub async fn explain(
        &self,
        query: &Query,
        result: &Map<String, Value>,
    ) -> Result<QueryExplanation> {
        explain_query_result(query, result, self.groups.as_ref()).await
    }
}

/// Decides whether `result` satisfies `query` and records a reason for every
/// field check.
///
/// Only item queries are supported. Date and pass-through fields have no
/// explainer and fail with [`QueryError::NotImplemented`].
#[tracing::instrument(skip_all, fields(entity = %query.target_entity, filters = query.filters.len()))]
pub async fn explain_query_result(
    query: &Query,
    result: &Map<String, Value>,
    groups: &dyn GroupMembershipSource,
) -> Result<QueryExplanation> {
    if query.target_entity != EntityType::Item {
        return Err(QueryError::UnsupportedEntity(query.target_entity));
    }

    let now = Utc::now();
    let expanded: Vec<(usize, Filter)> = query
        .filters
        .iter()
        .enumerate()
        .flat_map(|(source, filter)| {
            expand_filter_at(filter, now)
                .into_iter()
                .map(move |filter| (source, filter))
        })
        .collect();
    let reasons = try_join_all(
        expanded
            .iter()
            .map(|(source, filter)| explain_filter(*source, filter, result, groups)),
    )
    .await?;

    let matched = reasons.iter().all(|filter| filter.matched);
    let summary = reasons
        .iter()
        .flat_map(|filter| filter.reasons.iter())
        .flat_map(|predicate| predicate.reasons.iter().cloned())
        .collect();

    Ok(QueryExplanation {
        result: result.clone(),
        query: query.clone(),
        matched,
        reasons,
        summary,
    })
}

async fn explain_filter(
    source: usize,
    filter: &Filter,
    result: &Map<String, Value>,
    groups: &dyn GroupMembershipSource,
) -> Result<FilterExplanation> {
    let reasons = try_join_all(
        filter
            .predicates
            .iter()
            .map(|predicate| explain_predicate(predicate, result, groups)),
    )
    .await?;

    let matched = match filter.operation {
        Operation::And => reasons.iter().all(|predicate| predicate.matched),
        Operation::Or => reasons.iter().any(|predicate| predicate.matched),
    };

    Ok(FilterExplanation {
        source,
        filter: filter.clone(),
        matched,
        reasons,
    })
}

async fn explain_predicate(
    predicate: &Predicate,
    result: &Map<String, Value>,
    groups: &dyn GroupMembershipSource,
) -> Result<PredicateExplanation> {
    let mut reasons = Vec::new();
    for (field, value) in predicate.iter() {
        reasons.extend(explain_field(field, value, result, groups).await?);
    }

    let matched = reasons.iter().all(|reason| reason.matched);
    tracing::trace!(matched, reasons = reasons.len(), "explained predicate");

    Ok(PredicateExplanation {
        predicate: predicate.clone(),
        matched,
        reasons,
    })
}

async fn explain_field(
    field: &str,
    value: &PredicateValue,
    result: &Map<String, Value>,
    groups: &dyn GroupMembershipSource,
) -> Result<Vec<MatchReason>> {
    match FieldKind::of(field) {
        FieldKind::Date => Err(QueryError::NotImplemented(format!(
            "explaining date field {field}"
        ))),
        FieldKind::PassThrough => Err(QueryError::NotImplemented(format!(
            "explaining pass-through field {field}"
        ))),
        FieldKind::Match => {
            let Some(options) = value.as_match() else {
                return Err(QueryError::NotImplemented(format!(
                    "explaining non-match value of {field}"
                )));
            };
            if field == GROUP_FIELD {
                explain_group(options, result, groups).await
            } else {
                Ok(explain_match(field, options, result.get(field), None))
            }
        }
    }
}

/// Group membership is not an attribute of the result, so it is fetched for
/// every predicate that filters on it.
async fn explain_group(
    options: &MatchOptions,
    result: &Map<String, Value>,
    groups: &dyn GroupMembershipSource,
) -> Result<Vec<MatchReason>> {
    let Some(item_id) = result.get(ID_FIELD).and_then(Value::as_str) else {
        return Ok(vec![MatchReason::missing(GROUP_FIELD)]);
    };

    let memberships = groups.fetch_item_groups(item_id).await?;
    let ids: Vec<Value> = memberships
        .ids()
        .into_iter()
        .map(Value::String)
        .collect();
    let meta = json!({
        "groups": memberships
            .iter()
            .map(|group| json!({"id": group.id, "title": group.title}))
            .collect::<Vec<_>>(),
    });

    Ok(explain_match(
        GROUP_FIELD,
        options,
        Some(&Value::Array(ids)),
        Some(meta),
    ))
}

/// Emits one reason per non-empty sub-condition: `any` as IN, `all` and
/// `exact` together as ALL, `not` as NOT_IN.
fn explain_match(
    attribute: &str,
    options: &MatchOptions,
    raw: Option<&Value>,
    meta: Option<Value>,
) -> Vec<MatchReason> {
    let any = non_empty(&options.any);
    let all: Vec<String> = non_empty(&options.all)
        .into_iter()
        .chain(non_empty(&options.exact))
        .flatten()
        .collect();
    let not = non_empty(&options.not);

    if any.is_none() && all.is_empty() && not.is_none() {
        return Vec::new();
    }

    let values = match raw {
        None | Some(Value::Null) => return vec![MatchReason::missing(attribute).with_meta(meta)],
        Some(raw) => arrayify(raw),
    };

    let mut reasons = Vec::new();
    if let Some(any) = any {
        let matched = check_any(&any, &values);
        reasons.push(MatchReason::compared(attribute, MatchCondition::In, &values, any, matched));
    }
    if !all.is_empty() {
        let matched = check_all(&all, &values);
        reasons.push(MatchReason::compared(attribute, MatchCondition::All, &values, all, matched));
    }
    if let Some(not) = not {
        let matched = check_not(&not, &values);
        reasons.push(MatchReason::compared(attribute, MatchCondition::NotIn, &values, not, matched));
    }

    reasons
        .into_iter()
        .map(|reason| reason.with_meta(meta.clone()))
        .collect()
}

fn non_empty(values: &Option<OneOrMany>) -> Option<Vec<String>> {
    values
        .as_ref()
        .map(OneOrMany::to_vec)
        .filter(|values| !values.is_empty())
}
