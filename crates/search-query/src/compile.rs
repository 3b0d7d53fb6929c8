//! Backend compilers.
//!
//! Both backends expand the query once at a single captured time, lower it to
//! the [`canonical`] IR and render that IR in their own syntax:
//! - [`portal`]: key/value search parameters (`q`, `filter`, request params)
//! - [`ogc`]: a boolean filter expression
//!
//! [`request`] wraps the compiled fragments into complete requests.

pub mod canonical;
pub mod ogc;
pub mod portal;
pub mod request;

pub use canonical::{
    lower_query, AllFields, CanonicalFilter, CanonicalPredicate, CanonicalQuery, FieldClause,
    FieldPolicy, FieldTest,
};
pub use ogc::{serialize_query_for_ogc, serialize_query_for_ogc_at};
pub use portal::{serialize_query_for_portal, serialize_query_for_portal_at, PortalSearchParams};
pub use request::{OgcItemsRequest, PortalSearchRequest, SearchOptions, SortOrder};
