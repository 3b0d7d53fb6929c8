//! Full search requests assembled from compiled fragments plus paging options.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ogc::serialize_query_for_ogc_at;
use super::portal::serialize_query_for_portal_at;
use crate::config::{OgcSettings, PortalSettings};
use crate::query::{PredicateValue, Query};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Paging and sorting shared by both backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(flatten)]
    pub params: BTreeMap<String, String>,
    #[serde(flatten)]
    pub options: SearchOptions,
}

impl PortalSearchRequest {
    pub fn from_query(query: &Query, options: &SearchOptions, settings: &PortalSettings) -> Self {
        Self::from_query_at(query, options, settings, Utc::now())
    }

    pub fn from_query_at(
        query: &Query,
        options: &SearchOptions,
        settings: &PortalSettings,
        now: DateTime<Utc>,
    ) -> Self {
        let compiled = serialize_query_for_portal_at(query, settings, now);
        Self {
            q: compiled.q,
            filter: compiled.filter,
            params: compiled.params,
            options: options.clone(),
        }
    }

    /// Request parameters in a stable order.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = &self.q {
            pairs.push(("q".to_string(), q.clone()));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("filter".to_string(), filter.clone()));
        }
        pairs.extend(
            self.params
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        if let Some(num) = self.options.num {
            pairs.push(("num".to_string(), num.to_string()));
        }
        if let Some(start) = self.options.start {
            pairs.push(("start".to_string(), start.to_string()));
        }
        if let Some(field) = &self.options.sort_field {
            pairs.push(("sortField".to_string(), field.clone()));
        }
        if let Some(order) = self.options.sort_order {
            pairs.push(("sortOrder".to_string(), order.as_str().to_string()));
        }
        pairs
    }
}

/// Query parameters for an OGC API items request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OgcItemsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<String>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startindex: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
}

impl OgcItemsRequest {
    pub fn from_query(query: &Query, options: &SearchOptions, settings: &OgcSettings) -> Self {
        Self::from_query_at(query, options, settings, Utc::now())
    }

    pub fn from_query_at(
        query: &Query,
        options: &SearchOptions,
        settings: &OgcSettings,
        now: DateTime<Utc>,
    ) -> Self {
        let filter = serialize_query_for_ogc_at(query, settings, now);

        let terms: Vec<&str> = query
            .predicate_values("term")
            .into_iter()
            .filter_map(PredicateValue::as_text)
            .collect();
        let bbox = query
            .predicate_values("bbox")
            .into_iter()
            .find_map(PredicateValue::as_text)
            .map(str::to_string);

        let sort_by = options.sort_field.as_ref().map(|field| match options.sort_order {
            Some(SortOrder::Desc) => format!("-{field}"),
            _ => field.clone(),
        });

        Self {
            filter: (!filter.is_empty()).then_some(filter),
            q: (!terms.is_empty()).then(|| terms.join(" ")),
            bbox,
            limit: options.num.unwrap_or(settings.default_limit),
            startindex: options.start,
            sort_by,
        }
    }

    /// Percent-encoded `key=value&...` string.
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(filter) = &self.filter {
            pairs.push(("filter", filter.clone()));
        }
        if let Some(q) = &self.q {
            pairs.push(("q", q.clone()));
        }
        if let Some(bbox) = &self.bbox {
            pairs.push(("bbox", bbox.clone()));
        }
        pairs.push(("limit", self.limit.to_string()));
        if let Some(start) = self.startindex {
            pairs.push(("startindex", start.to_string()));
        }
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sortBy", sort_by.clone()));
        }
        pairs
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::query::{EntityType, Filter, Predicate};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn query() -> Query {
        Query::new(EntityType::Item).with_filter(Filter::and(vec![Predicate::new()
            .with("term", "water")
            .with("bbox", "1,2,3,4")
            .with("title", "park")]))
    }

    #[test]
    fn portal_request_orders_pairs() {
        let options = SearchOptions {
            num: Some(20),
            start: Some(1),
            sort_field: Some("title".into()),
            sort_order: Some(SortOrder::Desc),
        };
        let config = SearchConfig::default_new();
        let request = PortalSearchRequest::from_query_at(&query(), &options, &config.portal, now());
        let keys: Vec<String> = request.to_query_pairs().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["q", "bbox", "num", "start", "sortField", "sortOrder"]
        );
        assert_eq!(
            request.to_query_pairs()[0].1,
            r#"(water AND title:"park")"#
        );
    }

    #[test]
    fn ogc_request_encodes_components() {
        let options = SearchOptions {
            sort_field: Some("modified".into()),
            sort_order: Some(SortOrder::Desc),
            ..SearchOptions::default()
        };
        let config = SearchConfig::default_new();
        let request = OgcItemsRequest::from_query_at(&query(), &options, &config.ogc, now());
        assert_eq!(request.filter.as_deref(), Some("((title=park))"));
        assert_eq!(request.q.as_deref(), Some("water"));
        assert_eq!(request.limit, 10);
        assert_eq!(
            request.to_query_string(),
            "filter=%28%28title%3Dpark%29%29&q=water&bbox=1%2C2%2C3%2C4&limit=10&sortBy=-modified"
        );
    }
}
