#![forbid(unsafe_code)]

use crate::block::{Block, BlockKind};
use crate::ids::section_id_for_heading;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Numbering and membership of one heading's subtree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SectionInfo {
    pub section_id: String,
    pub heading_block_id: String,
    pub numbering: String,
    pub depth: usize,
    pub heading_text: String,
    /// The heading itself plus every transitive descendant.
    pub block_ids: BTreeSet<String>,
    pub parent_section_id: Option<String>,
}

impl SectionInfo {
    pub fn contains(&self, block_id: &str) -> bool {
        self.block_ids.contains(block_id)
    }
}

/// Derived view over a block list. Never persisted; rebuild it whenever the
/// blocks change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SectionIndex {
    sections: Vec<SectionInfo>,
    by_section_id: HashMap<String, usize>,
    by_heading_id: HashMap<String, usize>,
}

impl SectionIndex {
    pub fn get_by_section(&self, section_id: &str) -> Option<&SectionInfo> {
        self.by_section_id
            .get(section_id)
            .map(|index| &self.sections[*index])
    }

    pub fn get_by_heading(&self, heading_block_id: &str) -> Option<&SectionInfo> {
        self.by_heading_id
            .get(heading_block_id)
            .map(|index| &self.sections[*index])
    }

    /// Sections in numbering order (depth-first, document order among siblings).
    pub fn sections(&self) -> &[SectionInfo] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn from_sections(mut sections: Vec<SectionInfo>) -> Self {
        // Numbering order is depth-first: a heading precedes its subtree.
        sections.sort_by_cached_key(|info| numbering_key(&info.numbering));
        let mut by_section_id = HashMap::with_capacity(sections.len());
        let mut by_heading_id = HashMap::with_capacity(sections.len());
        for (position, info) in sections.iter().enumerate() {
            by_section_id.insert(info.section_id.clone(), position);
            by_heading_id.insert(info.heading_block_id.clone(), position);
        }
        Self {
            sections,
            by_section_id,
            by_heading_id,
        }
    }
}

/// Builds the section index for blocks given in document order.
///
/// Headings unreachable from the document root (malformed parent cycles or
/// dangling parents) are left out of the index.
pub fn build_section_index<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> SectionIndex {
    let mut children: HashMap<Option<&str>, Vec<&Block>> = HashMap::new();
    let mut heading_children: HashMap<Option<&str>, Vec<&Block>> = HashMap::new();
    for block in blocks {
        let parent = block.parent_id.as_deref();
        children.entry(parent).or_default().push(block);
        if block.kind == BlockKind::Heading {
            heading_children.entry(parent).or_default().push(block);
        }
    }

    let mut sections = Vec::new();
    // (parent heading id, numbering prefix, depth, parent section id)
    let mut stack: Vec<(Option<&str>, String, usize, Option<String>)> =
        vec![(None, String::new(), 1, None)];
    let mut assigned: HashSet<&str> = HashSet::new();

    while let Some((parent_id, prefix, depth, parent_section_id)) = stack.pop() {
        let Some(headings) = heading_children.get(&parent_id) else {
            continue;
        };
        let mut nested = Vec::new();
        for (ordinal, heading) in headings.iter().enumerate() {
            if !assigned.insert(heading.id.as_str()) {
                continue;
            }
            let numbering = if prefix.is_empty() {
                (ordinal + 1).to_string()
            } else {
                format!("{prefix}.{}", ordinal + 1)
            };
            let section_id = section_id_for_heading(&heading.id).to_string();
            sections.push(SectionInfo {
                section_id: section_id.clone(),
                heading_block_id: heading.id.clone(),
                numbering: numbering.clone(),
                depth,
                heading_text: heading.text.clone(),
                block_ids: collect_descendants(&heading.id, &children),
                parent_section_id: parent_section_id.clone(),
            });
            nested.push((Some(heading.id.as_str()), numbering, depth + 1, Some(section_id)));
        }
        stack.extend(nested.into_iter().rev());
    }

    SectionIndex::from_sections(sections)
}

fn collect_descendants(
    root_id: &str,
    children: &HashMap<Option<&str>, Vec<&Block>>,
) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let mut stack = vec![root_id];
    while let Some(current) = stack.pop() {
        if !out.insert(current.to_string()) {
            continue;
        }
        if let Some(kids) = children.get(&Some(current)) {
            stack.extend(kids.iter().map(|kid| kid.id.as_str()));
        }
    }
    out
}

fn numbering_key(numbering: &str) -> Vec<u64> {
    numbering
        .split('.')
        .map(|part| part.parse::<u64>().unwrap_or(u64::MAX))
        .collect()
}
