#![forbid(unsafe_code)]

use qd_core::block::ArenaError;
use qd_core::governance::GovernanceError;
use qd_core::ops::{ApplyError, OpsError};
use qd_core::scope::ScopeError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("unknown project: {0}")]
    UnknownProject(i64),
    #[error("unknown document: {0}")]
    UnknownDocument(i64),
    #[error("unknown change: {0}")]
    UnknownChange(i64),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Ops(#[from] OpsError),
    #[error(transparent)]
    Arena(#[from] ArenaError),
    #[error(transparent)]
    Governance(#[from] GovernanceError),
    #[error("change is not passing yet ({current}/{required} yes votes)")]
    NotPassing { required: u32, current: u32 },
    #[error("change {0} is not published")]
    NotPublished(i64),
    #[error("change {0} is already published")]
    AlreadyPublished(i64),
    #[error("revision mismatch (expected={expected}, actual={actual})")]
    RevisionMismatch { expected: i64, actual: i64 },
}
