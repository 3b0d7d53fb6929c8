//! Backend-agnostic search queries.
//!
//! This crate provides:
//! - A typed Query / Filter / Predicate model with any/all/not/exact matching
//! - Expansion of terse predicates, relative dates and `$` type shortcuts
//! - Compilers for key/value search parameters and boolean filter expressions
//! - An explain engine that justifies whether a result matches a query

pub mod compile;
pub mod config;
pub mod error;
pub mod explain;
pub mod query;

// Re-export main types
pub use compile::{
    serialize_query_for_ogc, serialize_query_for_portal, CanonicalQuery, OgcItemsRequest,
    PortalSearchParams, PortalSearchRequest, SearchOptions, SortOrder,
};
pub use config::{load_search_config, OgcSettings, PortalSettings, SearchConfig};
pub use error::{QueryError, Result};
pub use explain::{
    explain_query_result, Explainer, GroupMembershipSource, MatchReason, QueryExplanation,
};
pub use query::{
    expand_query, DateRange, EntityType, Filter, MatchOptions, Operation, Predicate,
    PredicateValue, Query, RelativeDate, TimeUnit,
};
