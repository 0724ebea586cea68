#![forbid(unsafe_code)]

use qd_core::block::Block;
use qd_core::change::{ChangeStatus, TargetType};
use qd_core::governance::{GovernanceSettings, VoteValue};
use qd_core::ops::Operation;
use qd_core::scope::ChangeTarget;

#[derive(Clone, Debug, PartialEq)]
pub struct CreateProjectRequest {
    pub name: String,
    pub governance: GovernanceSettings,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateDocumentRequest {
    pub project_id: i64,
    pub title: String,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StageChangeRequest {
    pub document_id: i64,
    pub target: ChangeTarget,
    pub ops: Vec<Operation>,
    pub affected_blocks: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateChangeRequest {
    pub staged: super::StagedChange,
    pub author: String,
    pub summary: String,
    pub publish: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListChangesRequest {
    pub document_id: i64,
    pub status: Option<ChangeStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CastVoteRequest {
    pub user: String,
    pub target_type: TargetType,
    pub target_id: i64,
    pub value: VoteValue,
}

/// Which published Changes `auto_merge` considers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeScope {
    Document(i64),
    Project(i64),
    All,
}
