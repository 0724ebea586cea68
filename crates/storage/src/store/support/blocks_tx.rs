#![forbid(unsafe_code)]

use super::super::StoreError;
use qd_core::block::{Block, BlockArena, BlockKind};
use rusqlite::{Connection, Transaction, params};

pub(in crate::store) fn load_arena(
    conn: &Connection,
    document_id: i64,
) -> Result<BlockArena, StoreError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT stable_id, kind, text, parent_id, order_key, seq
        FROM blocks
        WHERE document_id=?1
        ORDER BY seq ASC
        "#,
    )?;
    let mut rows = stmt.query(params![document_id])?;
    let mut sequenced = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let kind_raw: String = row.get(1)?;
        let kind = BlockKind::parse(&kind_raw)
            .ok_or_else(|| StoreError::Corrupt(format!("block {id} has kind {kind_raw}")))?;
        let seq: i64 = row.get(5)?;
        let seq = u64::try_from(seq)
            .map_err(|_| StoreError::Corrupt(format!("block {id} has negative seq")))?;
        sequenced.push((
            seq,
            Block {
                id,
                kind,
                text: row.get(2)?,
                parent_id: row.get(3)?,
                order_key: row.get(4)?,
            },
        ));
    }
    Ok(BlockArena::from_sequenced(sequenced)?)
}

/// Replaces the stored blocks of a document with the arena contents.
pub(in crate::store) fn save_arena_tx(
    tx: &Transaction<'_>,
    document_id: i64,
    arena: &BlockArena,
) -> Result<(), StoreError> {
    tx.execute("DELETE FROM blocks WHERE document_id=?1", params![document_id])?;
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO blocks(document_id, stable_id, kind, text, parent_id, order_key, seq)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )?;
    for (seq, block) in arena.to_sequenced() {
        let seq = i64::try_from(seq).map_err(|_| StoreError::InvalidInput("block seq overflow"))?;
        stmt.execute(params![
            document_id,
            block.id,
            block.kind.as_str(),
            block.text,
            block.parent_id,
            block.order_key,
            seq,
        ])?;
    }
    Ok(())
}
