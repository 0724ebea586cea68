#![forbid(unsafe_code)]

use crate::block::{Block, BlockKind};
use crate::ids::{HEADING_ID_PREFIX, PARAGRAPH_ID_PREFIX};
use crate::section::build_section_index;

const INDENT: &str = "  ";
const PARAGRAPH_GLYPH: &str = "‣";

/// Plain-text outline used for before/after diffs.
///
/// Heading lines carry their numbering; paragraph lines carry a bullet glyph
/// and sit one level below their parent heading.
pub fn render_outline<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> String {
    let blocks = blocks.into_iter().collect::<Vec<_>>();
    if blocks.is_empty() {
        return String::new();
    }
    let index = build_section_index(blocks.iter().copied());

    let mut lines = Vec::with_capacity(blocks.len());
    for block in blocks {
        match block.kind {
            BlockKind::Heading => match index.get_by_heading(&block.id) {
                Some(info) => lines.push(format!(
                    "{}{} {}",
                    INDENT.repeat(info.depth - 1),
                    info.numbering,
                    block.text
                )),
                None => lines.push(block.text.clone()),
            },
            BlockKind::Paragraph => {
                let depth = block
                    .parent_id
                    .as_deref()
                    .and_then(|parent| index.get_by_heading(parent))
                    .map(|info| info.depth)
                    .unwrap_or(0);
                lines.push(format!(
                    "{}{PARAGRAPH_GLYPH} {}",
                    INDENT.repeat(depth),
                    block.text
                ));
            }
        }
    }
    lines.join("\n")
}

/// Seeds a flat document from outline text.
///
/// Lines starting with `#` or `##` open a top-level heading; other non-blank
/// lines are joined into one paragraph until the next blank line or heading.
/// Ids are `h_<n>` / `b_<n>`, the same prefixes minted ids use, and order
/// keys follow the line order.
pub fn parse_outline(text: &str) -> Vec<Block> {
    let mut out: Vec<Block> = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    let mut current_heading: Option<String> = None;

    fn flush(out: &mut Vec<Block>, pending: &mut Vec<&str>, parent: Option<&str>) {
        if pending.is_empty() {
            return;
        }
        let text = pending.join(" ").trim().to_string();
        pending.clear();
        if text.is_empty() {
            return;
        }
        let position = out.len() + 1;
        out.push(
            Block::paragraph(format!("{PARAGRAPH_ID_PREFIX}{position}"), text, parent)
                .with_order_key(position as f64),
        );
    }

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            flush(&mut out, &mut pending, current_heading.as_deref());
            continue;
        }
        let is_heading = line.starts_with('#') && !line.starts_with("###");
        if is_heading {
            flush(&mut out, &mut pending, current_heading.as_deref());
            let position = out.len() + 1;
            let id = format!("{HEADING_ID_PREFIX}{position}");
            out.push(
                Block::heading(id.clone(), line.trim_start_matches('#').trim(), None)
                    .with_order_key(position as f64),
            );
            current_heading = Some(id);
        } else {
            pending.push(line);
        }
    }
    flush(&mut out, &mut pending, current_heading.as_deref());
    out
}
