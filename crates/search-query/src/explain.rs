//! Reverse evaluation: does a concrete result satisfy a query, and why.
//!
//! The engine walks the same expanded tree the compilers render and applies
//! the match-value set checks directly to the result's fields. Group
//! membership is looked up through a [`GroupMembershipSource`].

mod engine;
mod group;
mod types;

pub use engine::{explain_query_result, Explainer};
pub use group::{GroupMembershipSource, GroupRef, ItemGroups, NoGroups, SharedGroupSource};
pub use types::{
    FilterExplanation, MatchCondition, MatchReason, PredicateExplanation, QueryExplanation,
};
