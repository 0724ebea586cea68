#![forbid(unsafe_code)]

use super::{Operation, ParentChange};
use crate::block::{ArenaError, Block, BlockArena};
use crate::ids::BlockId;
use std::collections::BTreeSet;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Blocks created, updated or moved by the batch and still present after it.
    pub touched: BTreeSet<String>,
    pub inserted: Vec<String>,
    pub deleted: Vec<String>,
    /// Operations that targeted a block that no longer exists.
    pub skipped: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("ops[{index}]: block id already exists: {block_id}")]
    DuplicateBlock { index: usize, block_id: String },
    #[error("ops[{index}]: parent {parent_id} of {block_id} is not an existing heading")]
    InvalidParent {
        index: usize,
        block_id: String,
        parent_id: String,
    },
    #[error("ops[{index}]: moving {block_id} under {parent_id} would create a cycle")]
    ParentCycle {
        index: usize,
        block_id: String,
        parent_id: String,
    },
    #[error("block {block_id} references missing parent {parent_id}")]
    DanglingParent { block_id: String, parent_id: String },
}

/// Order key for a block placed right after `after_id`.
///
/// With no anchor the block goes first; an unknown anchor places it last;
/// otherwise it lands halfway between the anchor and the next key.
pub fn insert_position(arena: &BlockArena, after_id: Option<&str>) -> f64 {
    let Some(after_id) = after_id else {
        return arena.first_key().map(|key| key - 1.0).unwrap_or(1.0);
    };
    let Some(anchor) = arena.get(after_id) else {
        return arena.last_key().map(|key| key + 1.0).unwrap_or(1.0);
    };
    let key = anchor.order_key;
    let next = arena.next_key_after(key).unwrap_or(key + 2.0);
    (key + next) / 2.0
}

/// Like [`insert_position`], but renormalizes the working arena first when
/// repeated halving has left no float strictly between the anchor and the
/// next key.
fn place_after(arena: &mut BlockArena, after_id: Option<&str>) -> f64 {
    let key = insert_position(arena, after_id);
    if splits_gap(arena, after_id, key) {
        return key;
    }
    tracing::debug!(after_id = ?after_id, "order keys exhausted, renormalizing mid-batch");
    arena.renormalize();
    insert_position(arena, after_id)
}

fn splits_gap(arena: &BlockArena, after_id: Option<&str>, key: f64) -> bool {
    let Some(anchor) = after_id.and_then(|id| arena.get(id)) else {
        return true;
    };
    let next = arena.next_key_after(anchor.order_key);
    key > anchor.order_key && next.is_none_or(|next| key < next)
}

/// Applies `ops` in array order, then renormalizes order keys.
///
/// The batch runs on a copy of `arena`; on error the arena is left exactly
/// as it was.
pub fn apply_ops(arena: &mut BlockArena, ops: &[Operation]) -> Result<ApplyReport, ApplyError> {
    let mut working = arena.clone();
    let report = apply_in_place(&mut working, ops)?;
    *arena = working;
    Ok(report)
}

fn apply_in_place(arena: &mut BlockArena, ops: &[Operation]) -> Result<ApplyReport, ApplyError> {
    let mut report = ApplyReport::default();

    for (index, op) in ops.iter().enumerate() {
        match op {
            Operation::UpdateText { block_id, new_text } => {
                if arena.update_text(block_id, new_text.as_str()) {
                    report.touched.insert(block_id.clone());
                } else {
                    tracing::debug!(block_id = %block_id, "update skipped: block is gone");
                    report.skipped += 1;
                }
            }
            Operation::InsertBlock { new_block, .. } => {
                let block_id = match new_block.provided_id() {
                    Some(id) => id.to_string(),
                    None => BlockId::mint(new_block.kind).into_string(),
                };
                let parent_id = new_block.parent_id().map(str::to_string);
                if let Some(parent_id) = parent_id.as_deref() {
                    ensure_heading_parent(arena, index, &block_id, parent_id)?;
                }
                let block = Block {
                    id: block_id.clone(),
                    kind: new_block.kind,
                    text: new_block.text.clone(),
                    parent_id,
                    order_key: place_after(arena, op.anchor()),
                };
                arena.insert(block).map_err(|err| match err {
                    ArenaError::DuplicateId(block_id) => {
                        ApplyError::DuplicateBlock { index, block_id }
                    }
                })?;
                report.touched.insert(block_id.clone());
                report.inserted.push(block_id);
            }
            Operation::DeleteBlock { block_id } => {
                if arena.delete(block_id).is_some() {
                    report.touched.remove(block_id);
                    report.deleted.push(block_id.clone());
                } else {
                    tracing::debug!(block_id = %block_id, "delete skipped: block is gone");
                    report.skipped += 1;
                }
            }
            Operation::MoveBlock {
                block_id,
                new_parent,
                ..
            } => {
                let Some(current_parent) = arena.get(block_id).map(|b| b.parent_id.clone()) else {
                    tracing::debug!(block_id = %block_id, "move skipped: block is gone");
                    report.skipped += 1;
                    continue;
                };
                match new_parent {
                    ParentChange::Keep => {}
                    ParentChange::Detach => {
                        if current_parent.is_some() {
                            arena.reparent(block_id, None);
                        }
                    }
                    ParentChange::Attach(parent_id) => {
                        if current_parent.as_deref() != Some(parent_id.as_str()) {
                            ensure_heading_parent(arena, index, block_id, parent_id)?;
                            if arena.is_ancestor_or_self(block_id, parent_id) {
                                return Err(ApplyError::ParentCycle {
                                    index,
                                    block_id: block_id.clone(),
                                    parent_id: parent_id.clone(),
                                });
                            }
                            arena.reparent(block_id, Some(parent_id.clone()));
                        }
                    }
                }
                let key = place_after(arena, op.anchor());
                arena.set_order_key(block_id, key);
                report.touched.insert(block_id.clone());
            }
        }
    }

    if let Some((block_id, parent_id)) = arena.dangling_parents().into_iter().next() {
        return Err(ApplyError::DanglingParent {
            block_id,
            parent_id,
        });
    }

    arena.renormalize();
    Ok(report)
}

fn ensure_heading_parent(
    arena: &BlockArena,
    index: usize,
    block_id: &str,
    parent_id: &str,
) -> Result<(), ApplyError> {
    match arena.get(parent_id) {
        Some(parent) if parent.kind.is_heading() => Ok(()),
        _ => Err(ApplyError::InvalidParent {
            index,
            block_id: block_id.to_string(),
            parent_id: parent_id.to_string(),
        }),
    }
}
