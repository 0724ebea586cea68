#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle of a Change.
///
/// `Draft -> Published -> Merged`, or `Published -> NeedsUpdate` when an
/// overlapping Change merged first. A `NeedsUpdate` Change keeps collecting
/// votes and may still be merged explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    #[default]
    Draft,
    Published,
    Merged,
    NeedsUpdate,
}

impl ChangeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeStatus::Draft => "draft",
            ChangeStatus::Published => "published",
            ChangeStatus::Merged => "merged",
            ChangeStatus::NeedsUpdate => "needs_update",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(ChangeStatus::Draft),
            "published" => Some(ChangeStatus::Published),
            "merged" => Some(ChangeStatus::Merged),
            "needs_update" => Some(ChangeStatus::NeedsUpdate),
            _ => None,
        }
    }

    pub fn can_publish(self) -> bool {
        matches!(self, ChangeStatus::Draft)
    }

    pub fn can_merge(self) -> bool {
        matches!(self, ChangeStatus::Published | ChangeStatus::NeedsUpdate)
    }

    pub fn is_open(self) -> bool {
        !matches!(self, ChangeStatus::Merged)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Entry,
    Change,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Entry => "entry",
            TargetType::Change => "change",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "entry" => Some(TargetType::Entry),
            "change" => Some(TargetType::Change),
            _ => None,
        }
    }
}

/// Minimal view of a Change used for overlap checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeFootprint<'a> {
    pub change_id: i64,
    pub status: ChangeStatus,
    pub affected_blocks: &'a BTreeSet<String>,
}

/// Ids of `Published` candidates whose affected blocks intersect the blocks
/// of a Change that just merged. `merged_change_id` is never reported.
pub fn stale_changes<'a>(
    merged_change_id: i64,
    merged_affected: &BTreeSet<String>,
    candidates: impl IntoIterator<Item = ChangeFootprint<'a>>,
) -> Vec<i64> {
    candidates
        .into_iter()
        .filter(|c| c.change_id != merged_change_id && c.status == ChangeStatus::Published)
        .filter(|c| !c.affected_blocks.is_disjoint(merged_affected))
        .map(|c| c.change_id)
        .collect()
}

#[cfg(test)]
mod tests;
