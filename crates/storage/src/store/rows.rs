#![forbid(unsafe_code)]

use qd_core::change::ChangeStatus;
use qd_core::governance::GovernanceSettings;
use qd_core::ops::Operation;
use qd_core::scope::{ChangeTarget, ValidatedChange};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub governance: GovernanceSettings,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentRow {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub version: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// A validated Change bound to the document version it was checked against.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StagedChange {
    pub document_id: i64,
    pub base_version: i64,
    pub validated: ValidatedChange,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChangeRow {
    pub id: i64,
    pub project_id: i64,
    pub document_id: i64,
    pub author: String,
    pub summary: String,
    pub ops: Vec<Operation>,
    pub affected_blocks: BTreeSet<String>,
    pub target: ChangeTarget,
    pub base_version: i64,
    pub status: ChangeStatus,
    pub before_outline: String,
    pub after_outline: String,
    pub created_at_ms: i64,
    pub published_at_ms: Option<i64>,
    pub closes_at_ms: Option<i64>,
    pub merged_at_ms: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    pub document_id: i64,
    pub version: i64,
    pub outline_before: String,
    pub outline_after: String,
    pub change_id: Option<i64>,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub change_id: i64,
    /// False when the Change had already been merged.
    pub merged: bool,
    pub version: i64,
    pub stale_change_ids: Vec<i64>,
}
