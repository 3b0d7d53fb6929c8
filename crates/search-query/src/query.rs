//! The backend-agnostic query model and its expansion rules.
//!
//! This module provides:
//! - Query / Filter / Predicate structure
//! - Match options (any / all / not / exact) and their set semantics
//! - Date ranges and relative dates
//! - The static field registry and named type filters
//! - Expansion of terse predicates into canonical form

mod date_range;
mod expand;
mod field_kind;
mod filter;
mod match_value;
mod named_filters;
mod predicate;

pub use date_range::{resolve_relative_date, DateRange, RelativeDate, TimeUnit};
pub use expand::{
    expand_filter, expand_filter_at, expand_predicate, expand_predicate_at, expand_query,
    expand_query_at,
};
pub use field_kind::FieldKind;
pub use filter::{EntityType, Filter, Operation, Query};
pub use match_value::{
    arrayify, check_all, check_any, check_not, to_match_options, MatchOptions, OneOrMany,
};
pub use named_filters::{is_named_filter_token, lookup_named_filter, Fragment};
pub use predicate::{Predicate, PredicateValue};
