#![forbid(unsafe_code)]

mod apply;

pub use apply::*;

use crate::block::BlockKind;
use crate::ids::BlockId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One edit inside a Change. Wire form is internally tagged on `"type"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    UpdateText {
        block_id: String,
        new_text: String,
    },
    InsertBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after_id: Option<String>,
        new_block: NewBlock,
    },
    DeleteBlock {
        block_id: String,
    },
    MoveBlock {
        block_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after_id: Option<String>,
        #[serde(default, skip_serializing_if = "ParentChange::is_keep")]
        new_parent: ParentChange,
    },
}

impl Operation {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Operation::UpdateText { .. } => "UPDATE_TEXT",
            Operation::InsertBlock { .. } => "INSERT_BLOCK",
            Operation::DeleteBlock { .. } => "DELETE_BLOCK",
            Operation::MoveBlock { .. } => "MOVE_BLOCK",
        }
    }

    /// Anchor id with the empty string read as "no anchor".
    pub fn anchor(&self) -> Option<&str> {
        match self {
            Operation::InsertBlock { after_id, .. } | Operation::MoveBlock { after_id, .. } => {
                non_empty(after_id.as_deref())
            }
            Operation::UpdateText { .. } | Operation::DeleteBlock { .. } => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: BlockKind,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl NewBlock {
    pub fn parent_id(&self) -> Option<&str> {
        non_empty(self.parent.as_deref())
    }

    pub fn provided_id(&self) -> Option<&str> {
        non_empty(self.id.as_deref())
    }
}

/// Parent update carried by `MOVE_BLOCK`.
///
/// A missing `new_parent` field keeps the current parent, `null` or `""`
/// detaches the block to the document root, and an id attaches it there.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ParentChange {
    #[default]
    Keep,
    Detach,
    Attach(String),
}

impl ParentChange {
    pub fn is_keep(&self) -> bool {
        matches!(self, ParentChange::Keep)
    }
}

impl Serialize for ParentChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParentChange::Keep | ParentChange::Detach => serializer.serialize_none(),
            ParentChange::Attach(id) => serializer.serialize_str(id),
        }
    }
}

impl<'de> Deserialize<'de> for ParentChange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(match value {
            Some(id) if !id.trim().is_empty() => ParentChange::Attach(id),
            _ => ParentChange::Detach,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OpsError {
    #[error("ops are not valid JSON: {0}")]
    InvalidJson(String),
    #[error("ops must be a JSON array")]
    NotAList,
    #[error("ops[{index}]: {message}")]
    Malformed { index: usize, message: String },
}

/// Decodes a JSON operation list. The whole list is rejected on the first
/// malformed entry so nothing is ever half-applied.
pub fn parse_ops(value: &serde_json::Value) -> Result<Vec<Operation>, OpsError> {
    let serde_json::Value::Array(items) = value else {
        return Err(OpsError::NotAList);
    };
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let op = Operation::deserialize(item).map_err(|err| OpsError::Malformed {
            index,
            message: err.to_string(),
        })?;
        check_op_ids(&op).map_err(|message| OpsError::Malformed {
            index,
            message: message.to_string(),
        })?;
        out.push(op);
    }
    Ok(out)
}

pub fn parse_ops_str(raw: &str) -> Result<Vec<Operation>, OpsError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|err| OpsError::InvalidJson(err.to_string()))?;
    parse_ops(&value)
}

fn check_op_ids(op: &Operation) -> Result<(), &'static str> {
    match op {
        Operation::UpdateText { block_id, .. }
        | Operation::DeleteBlock { block_id }
        | Operation::MoveBlock { block_id, .. } => {
            BlockId::try_new(block_id.as_str()).map_err(|err| err.message())?;
        }
        Operation::InsertBlock { new_block, .. } => {
            if let Some(id) = new_block.provided_id() {
                BlockId::try_new(id).map_err(|err| err.message())?;
            }
        }
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
