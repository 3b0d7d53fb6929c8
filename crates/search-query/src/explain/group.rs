use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: String,
    pub title: String,
}

impl GroupRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// Groups an item is shared with, split by the caller's role in each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGroups {
    #[serde(default)]
    pub admin: Vec<GroupRef>,
    #[serde(default)]
    pub member: Vec<GroupRef>,
    #[serde(default)]
    pub other: Vec<GroupRef>,
}

impl ItemGroups {
    pub fn iter(&self) -> impl Iterator<Item = &GroupRef> {
        self.admin
            .iter()
            .chain(self.member.iter())
            .chain(self.other.iter())
    }

    pub fn ids(&self) -> Vec<String> {
        self.iter().map(|group| group.id.clone()).collect()
    }
}

/// Looks up the groups an item belongs to.
///
/// Failures are returned as-is to the caller of the explain engine; the
/// engine neither retries nor caches lookups.
#[async_trait]
pub trait GroupMembershipSource: Send + Sync {
    async fn fetch_item_groups(&self, item_id: &str) -> Result<ItemGroups>;
}

pub type SharedGroupSource = Arc<dyn GroupMembershipSource>;

/// A source for callers that never filter on `group`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGroups;

#[async_trait]
impl GroupMembershipSource for NoGroups {
    async fn fetch_item_groups(&self, _item_id: &str) -> Result<ItemGroups> {
        Ok(ItemGroups::default())
    }
}
