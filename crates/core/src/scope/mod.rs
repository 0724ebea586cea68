#![forbid(unsafe_code)]

use crate::block::{ArenaError, Block, BlockArena, BlockKind};
use crate::ids::{BlockId, HEADING_ID_PREFIX};
use crate::ops::{ApplyError, Operation, ParentChange, apply_ops};
use crate::outline::render_outline;
use crate::section::{SectionInfo, build_section_index};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Target id that marks a proposal for a brand-new top-level section.
pub const NEW_SECTION_TARGET: &str = "root";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ChangeTarget {
    Section(String),
    NewSection,
}

impl ChangeTarget {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == NEW_SECTION_TARGET {
            ChangeTarget::NewSection
        } else {
            ChangeTarget::Section(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChangeTarget::Section(section_id) => section_id,
            ChangeTarget::NewSection => NEW_SECTION_TARGET,
        }
    }
}

impl From<String> for ChangeTarget {
    fn from(value: String) -> Self {
        ChangeTarget::parse(&value)
    }
}

impl From<ChangeTarget> for String {
    fn from(value: ChangeTarget) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("unknown section: {0}")]
    UnknownSection(String),
    #[error("ops[{index}] {op} on {block_id} rejected: {reason}")]
    Violation {
        index: usize,
        op: &'static str,
        block_id: String,
        reason: &'static str,
    },
    #[error("affected block {0} is outside the target section")]
    AffectedOutOfScope(String),
    #[error("a new section proposal needs a heading with a title")]
    MissingSectionTitle,
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error("document blocks are inconsistent: {0}")]
    Arena(#[from] ArenaError),
}

/// A Change that passed scope validation, with every inserted id minted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidatedChange {
    pub target: ChangeTarget,
    pub ops: Vec<Operation>,
    pub affected_blocks: BTreeSet<String>,
    pub inserted_ids: Vec<String>,
    pub before_outline: String,
    pub after_outline: String,
}

struct Scope<'a> {
    target: &'a ChangeTarget,
    section: Option<&'a SectionInfo>,
    kinds: HashMap<&'a str, BlockKind>,
    inserted: HashMap<String, BlockKind>,
}

impl Scope<'_> {
    fn in_scope(&self, id: &str) -> bool {
        self.section.is_some_and(|section| section.contains(id)) || self.inserted.contains_key(id)
    }

    fn is_scope_heading(&self, id: &str) -> bool {
        if let Some(kind) = self.inserted.get(id) {
            return kind.is_heading();
        }
        self.section.is_some_and(|section| section.contains(id))
            && self.kinds.get(id).is_some_and(|kind| kind.is_heading())
    }

    fn is_root_heading(&self, id: &str) -> bool {
        self.section
            .is_some_and(|section| section.heading_block_id == id)
    }

    fn new_section_mode(&self) -> bool {
        matches!(self.target, ChangeTarget::NewSection)
    }
}

/// Checks that `ops` stay inside `target` and stages them for storage.
///
/// `blocks` is the current document in order. Inserted blocks without an id
/// get one minted here so later operations in the batch (and the stored
/// Change) reference stable ids. The staged batch is dry-run against a copy
/// of the document, so deletes that would orphan descendants are rejected
/// before anything is persisted.
pub fn validate_and_stage_change(
    blocks: &[Block],
    target: &ChangeTarget,
    ops: Vec<Operation>,
    declared_affected: impl IntoIterator<Item = String>,
) -> Result<ValidatedChange, ScopeError> {
    let index = build_section_index(blocks);
    let section = match target {
        ChangeTarget::Section(section_id) => Some(
            index
                .get_by_section(section_id)
                .ok_or_else(|| ScopeError::UnknownSection(section_id.clone()))?,
        ),
        ChangeTarget::NewSection => None,
    };

    let mut scope = Scope {
        target,
        section,
        kinds: blocks.iter().map(|b| (b.id.as_str(), b.kind)).collect(),
        inserted: HashMap::new(),
    };

    let mut staged = Vec::with_capacity(ops.len());
    let mut affected = BTreeSet::new();
    let mut inserted_ids = Vec::new();
    let mut has_titled_heading = false;

    for (index, op) in ops.into_iter().enumerate() {
        let op_name = op.kind_str();
        let reject = move |block_id: &str, reason: &'static str| ScopeError::Violation {
            index,
            op: op_name,
            block_id: block_id.to_string(),
            reason,
        };

        let (after_id, mut new_block) = match op {
            Operation::InsertBlock {
                after_id,
                new_block,
            } => (after_id, new_block),
            Operation::UpdateText { ref block_id, .. } | Operation::DeleteBlock { ref block_id } => {
                if !scope.in_scope(block_id) {
                    return Err(reject(block_id, "block is outside the target section"));
                }
                affected.insert(block_id.clone());
                staged.push(op);
                continue;
            }
            Operation::MoveBlock {
                ref block_id,
                ref new_parent,
                ..
            } => {
                check_move(&scope, block_id, op.anchor(), new_parent, reject)?;
                affected.insert(block_id.clone());
                staged.push(op);
                continue;
            }
        };

        let block_id = match new_block.provided_id() {
            Some(id) => id.to_string(),
            None => BlockId::mint(new_block.kind).into_string(),
        };

        let anchor = after_id.filter(|id| !id.trim().is_empty());
        match anchor.as_deref() {
            Some(anchor) => {
                // A new section may be placed anywhere; it only reads the anchor's position.
                let anchor_ok = scope.in_scope(anchor)
                    || (scope.new_section_mode() && scope.kinds.contains_key(anchor));
                if !anchor_ok {
                    return Err(reject(anchor, "anchor is outside the target section"));
                }
            }
            None => {
                if !scope.new_section_mode() {
                    return Err(reject(
                        &block_id,
                        "needs an after_id inside the target section",
                    ));
                }
            }
        }

        if new_block.kind.is_heading() && !block_id.starts_with(HEADING_ID_PREFIX) {
            return Err(reject(&block_id, "new heading ids must start with 'h_'"));
        }
        if scope.kinds.contains_key(block_id.as_str()) || scope.inserted.contains_key(&block_id) {
            return Err(reject(&block_id, "block id already exists"));
        }

        match new_block.parent_id() {
            Some(parent_id) => {
                if !scope.is_scope_heading(parent_id) {
                    return Err(reject(
                        parent_id,
                        "parent must be a heading inside the target section",
                    ));
                }
            }
            None => {
                if !scope.new_section_mode() {
                    return Err(reject(
                        &block_id,
                        "new blocks must be placed under a heading of the target section",
                    ));
                }
            }
        }

        if new_block.kind.is_heading() && !new_block.text.trim().is_empty() {
            has_titled_heading = true;
        }
        scope.inserted.insert(block_id.clone(), new_block.kind);
        affected.insert(block_id.clone());
        inserted_ids.push(block_id.clone());
        new_block.parent = new_block.parent_id().map(str::to_string);
        new_block.id = Some(block_id);
        staged.push(Operation::InsertBlock {
            after_id: anchor,
            new_block,
        });
    }

    if scope.new_section_mode() && !has_titled_heading {
        return Err(ScopeError::MissingSectionTitle);
    }

    for block_id in declared_affected {
        if block_id.trim().is_empty() {
            continue;
        }
        if !scope.in_scope(&block_id) {
            return Err(ScopeError::AffectedOutOfScope(block_id));
        }
        affected.insert(block_id);
    }

    let mut preview = BlockArena::from_blocks(blocks.iter().cloned())?;
    let before_outline = render_outline(blocks);
    apply_ops(&mut preview, &staged)?;
    let after_outline = render_outline(preview.ordered());

    tracing::debug!(
        target = target.as_str(),
        ops = staged.len(),
        affected = affected.len(),
        "change staged"
    );

    Ok(ValidatedChange {
        target: target.clone(),
        ops: staged,
        affected_blocks: affected,
        inserted_ids,
        before_outline,
        after_outline,
    })
}

/// Scope rules for `MOVE_BLOCK`. Inside a section the block needs an anchor,
/// since a move without one goes to the top of the document.
fn check_move(
    scope: &Scope<'_>,
    block_id: &str,
    anchor: Option<&str>,
    new_parent: &ParentChange,
    reject: impl Fn(&str, &'static str) -> ScopeError,
) -> Result<(), ScopeError> {
    if !scope.in_scope(block_id) {
        return Err(reject(block_id, "block is outside the target section"));
    }
    match anchor {
        Some(anchor) => {
            if !scope.in_scope(anchor) {
                return Err(reject(anchor, "anchor is outside the target section"));
            }
        }
        None => {
            if !scope.new_section_mode() {
                return Err(reject(block_id, "needs an after_id inside the target section"));
            }
        }
    }
    match new_parent {
        ParentChange::Keep => {}
        ParentChange::Attach(parent_id) => {
            if !scope.is_scope_heading(parent_id) {
                return Err(reject(
                    parent_id,
                    "new parent must be a heading inside the target section",
                ));
            }
        }
        ParentChange::Detach => {
            let allowed = scope.is_root_heading(block_id)
                || (scope.new_section_mode() && scope.inserted.contains_key(block_id));
            if !allowed {
                return Err(reject(
                    block_id,
                    "only the section heading may move to the top level",
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
