#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    #[serde(rename = "h2")]
    Heading,
    #[default]
    #[serde(rename = "p")]
    Paragraph,
}

impl BlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Heading => "h2",
            BlockKind::Paragraph => "p",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "h2" | "heading" => Some(BlockKind::Heading),
            "p" | "paragraph" => Some(BlockKind::Paragraph),
            _ => None,
        }
    }

    pub fn is_heading(self) -> bool {
        matches!(self, BlockKind::Heading)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub text: String,
    #[serde(rename = "parent")]
    pub parent_id: Option<String>,
    #[serde(rename = "position")]
    pub order_key: f64,
}

impl Block {
    pub fn heading(id: impl Into<String>, text: impl Into<String>, parent_id: Option<&str>) -> Self {
        Self::new(id, BlockKind::Heading, text, parent_id)
    }

    pub fn paragraph(
        id: impl Into<String>,
        text: impl Into<String>,
        parent_id: Option<&str>,
    ) -> Self {
        Self::new(id, BlockKind::Paragraph, text, parent_id)
    }

    fn new(
        id: impl Into<String>,
        kind: BlockKind,
        text: impl Into<String>,
        parent_id: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            text: text.into(),
            parent_id: parent_id.map(str::to_string),
            order_key: 0.0,
        }
    }

    pub fn with_order_key(mut self, order_key: f64) -> Self {
        self.order_key = order_key;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Slot {
    block: Block,
    seq: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    #[error("block id already exists: {0}")]
    DuplicateId(String),
}

/// Blocks of one document version keyed by stable id.
///
/// Document order is `(order_key, creation_seq)`; the order is rebuilt on
/// every query instead of being stored, so mutations never need to shift
/// siblings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockArena {
    slots: HashMap<String, Slot>,
    next_seq: u64,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an arena from blocks listed in creation order.
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Result<Self, ArenaError> {
        let mut arena = Self::new();
        for block in blocks {
            arena.insert(block)?;
        }
        Ok(arena)
    }

    /// Builds an arena from `(creation_seq, block)` pairs loaded from storage.
    pub fn from_sequenced(
        blocks: impl IntoIterator<Item = (u64, Block)>,
    ) -> Result<Self, ArenaError> {
        let mut arena = Self::new();
        for (seq, block) in blocks {
            if arena.slots.contains_key(&block.id) {
                return Err(ArenaError::DuplicateId(block.id));
            }
            arena.next_seq = arena.next_seq.max(seq + 1);
            arena.slots.insert(block.id.clone(), Slot { block, seq });
        }
        Ok(arena)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.slots.get(id).map(|slot| &slot.block)
    }

    pub fn seq_of(&self, id: &str) -> Option<u64> {
        self.slots.get(id).map(|slot| slot.seq)
    }

    pub fn ordered(&self) -> Vec<&Block> {
        let mut slots = self.slots.values().collect::<Vec<_>>();
        slots.sort_by(|a, b| compare_slots(a, b));
        slots.into_iter().map(|slot| &slot.block).collect()
    }

    /// Owned snapshot in document order.
    pub fn to_blocks(&self) -> Vec<Block> {
        self.ordered().into_iter().cloned().collect()
    }

    /// Owned snapshot in document order, paired with each block's creation sequence.
    pub fn to_sequenced(&self) -> Vec<(u64, Block)> {
        let mut slots = self.slots.values().collect::<Vec<_>>();
        slots.sort_by(|a, b| compare_slots(a, b));
        slots
            .into_iter()
            .map(|slot| (slot.seq, slot.block.clone()))
            .collect()
    }

    pub fn first_key(&self) -> Option<f64> {
        self.slots
            .values()
            .map(|slot| slot.block.order_key)
            .min_by(f64::total_cmp)
    }

    pub fn last_key(&self) -> Option<f64> {
        self.slots
            .values()
            .map(|slot| slot.block.order_key)
            .max_by(f64::total_cmp)
    }

    /// Smallest order key strictly greater than `key`.
    pub fn next_key_after(&self, key: f64) -> Option<f64> {
        self.slots
            .values()
            .map(|slot| slot.block.order_key)
            .filter(|candidate| *candidate > key)
            .min_by(f64::total_cmp)
    }

    pub fn insert(&mut self, block: Block) -> Result<(), ArenaError> {
        if self.slots.contains_key(&block.id) {
            return Err(ArenaError::DuplicateId(block.id));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(block.id.clone(), Slot { block, seq });
        Ok(())
    }

    pub fn update_text(&mut self, id: &str, text: impl Into<String>) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) => {
                slot.block.text = text.into();
                true
            }
            None => false,
        }
    }

    /// Removes a single block. Children keep their `parent_id`.
    pub fn delete(&mut self, id: &str) -> Option<Block> {
        self.slots.remove(id).map(|slot| slot.block)
    }

    pub fn reparent(&mut self, id: &str, parent_id: Option<String>) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) => {
                slot.block.parent_id = parent_id;
                true
            }
            None => false,
        }
    }

    pub fn set_order_key(&mut self, id: &str, order_key: f64) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) => {
                slot.block.order_key = order_key;
                true
            }
            None => false,
        }
    }

    /// Rewrites order keys to `1..=N` in current document order.
    pub fn renormalize(&mut self) {
        let order = self
            .ordered()
            .into_iter()
            .map(|block| block.id.clone())
            .collect::<Vec<_>>();
        for (index, id) in order.iter().enumerate() {
            if let Some(slot) = self.slots.get_mut(id) {
                slot.block.order_key = (index + 1) as f64;
            }
        }
    }

    /// `(child, missing_parent)` pairs, sorted for stable reporting.
    pub fn dangling_parents(&self) -> Vec<(String, String)> {
        let mut out = self
            .slots
            .values()
            .filter_map(|slot| {
                let parent = slot.block.parent_id.as_deref()?;
                (!self.slots.contains_key(parent))
                    .then(|| (slot.block.id.clone(), parent.to_string()))
            })
            .collect::<Vec<_>>();
        out.sort();
        out
    }

    /// True when `ancestor` is `id` itself or one of its transitive parents.
    pub fn is_ancestor_or_self(&self, ancestor: &str, id: &str) -> bool {
        let mut current = Some(id);
        let mut steps = 0usize;
        while let Some(cursor) = current {
            if cursor == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.slots.len() {
                return false;
            }
            current = self.get(cursor).and_then(|block| block.parent_id.as_deref());
        }
        false
    }
}

fn compare_slots(a: &Slot, b: &Slot) -> Ordering {
    a.block
        .order_key
        .total_cmp(&b.block.order_key)
        .then(a.seq.cmp(&b.seq))
}
