//! Filters and queries: the boolean structure above predicates.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::predicate::{Predicate, PredicateValue};

/// How the predicates of a filter combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    #[default]
    And,
    Or,
}

impl Operation {
    pub fn keyword(self) -> &'static str {
        match self {
            Operation::And => "AND",
            Operation::Or => "OR",
        }
    }
}

/// A boolean-combined group of predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub operation: Operation,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new(operation: Operation, predicates: Vec<Predicate>) -> Self {
        Self {
            operation,
            predicates,
        }
    }

    pub fn and(predicates: Vec<Predicate>) -> Self {
        Self::new(Operation::And, predicates)
    }

    pub fn or(predicates: Vec<Predicate>) -> Self {
        Self::new(Operation::Or, predicates)
    }
}

/// The kind of entity a query searches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Item,
    Group,
    User,
    Event,
    GroupMember,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityType::Item => "item",
            EntityType::Group => "group",
            EntityType::User => "user",
            EntityType::Event => "event",
            EntityType::GroupMember => "groupMember",
        };
        f.write_str(name)
    }
}

/// Filters that must all match, scoped to one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub target_entity: EntityType,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl Query {
    pub fn new(target_entity: EntityType) -> Self {
        Self {
            target_entity,
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.filters.iter().flat_map(|filter| filter.predicates.iter())
    }

    /// Every value given for `field`, in filter/predicate order.
    pub fn predicate_values(&self, field: &str) -> Vec<&PredicateValue> {
        self.predicates()
            .filter_map(|predicate| predicate.get(field))
            .collect()
    }
}
