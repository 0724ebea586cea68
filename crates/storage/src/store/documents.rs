#![forbid(unsafe_code)]

use super::support::{document_row, load_arena, now_ms, project_row, save_arena_tx};
use super::{CreateDocumentRequest, DocumentRow, HistoryRow, SqliteStore, StoreError};
use qd_core::block::{Block, BlockArena};
use qd_core::ids::BlockId;
use qd_core::outline::render_outline;
use qd_core::section::{SectionIndex, build_section_index};
use rusqlite::params;

impl SqliteStore {
    /// Creates a document at version 1 from blocks listed in document order.
    pub fn create_document(
        &mut self,
        request: CreateDocumentRequest,
    ) -> Result<DocumentRow, StoreError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(StoreError::InvalidInput("document title must not be empty"));
        }
        let mut arena = seed_arena(request.blocks)?;
        arena.renormalize();

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        project_row(&tx, request.project_id)?;
        tx.execute(
            r#"
            INSERT INTO documents(project_id, title, version, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, 1, ?3, ?3)
            "#,
            params![request.project_id, title, now_ms],
        )?;
        let document_id = tx.last_insert_rowid();
        save_arena_tx(&tx, document_id, &arena)?;
        let document = document_row(&tx, document_id)?;
        tx.commit()?;

        tracing::info!(document_id, blocks = arena.len(), "document created");
        Ok(document)
    }

    pub fn document(&self, document_id: i64) -> Result<DocumentRow, StoreError> {
        document_row(&self.conn, document_id)
    }

    /// Current blocks in document order.
    pub fn document_blocks(&self, document_id: i64) -> Result<Vec<Block>, StoreError> {
        document_row(&self.conn, document_id)?;
        Ok(load_arena(&self.conn, document_id)?.to_blocks())
    }

    pub fn section_index(&self, document_id: i64) -> Result<SectionIndex, StoreError> {
        let blocks = self.document_blocks(document_id)?;
        Ok(build_section_index(&blocks))
    }

    pub fn outline(&self, document_id: i64) -> Result<String, StoreError> {
        let blocks = self.document_blocks(document_id)?;
        Ok(render_outline(&blocks))
    }

    /// Merge history, oldest version first.
    pub fn history(&self, document_id: i64) -> Result<Vec<HistoryRow>, StoreError> {
        document_row(&self.conn, document_id)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT document_id, version, outline_before, outline_after, change_id, created_at_ms
            FROM document_history
            WHERE document_id=?1
            ORDER BY version ASC
            "#,
        )?;
        let rows = stmt.query_map(params![document_id], |row| {
            Ok(HistoryRow {
                document_id: row.get(0)?,
                version: row.get(1)?,
                outline_before: row.get(2)?,
                outline_after: row.get(3)?,
                change_id: row.get(4)?,
                created_at_ms: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn seed_arena(blocks: Vec<Block>) -> Result<BlockArena, StoreError> {
    for block in &blocks {
        BlockId::try_new(block.id.as_str())
            .map_err(|err| StoreError::InvalidInput(err.message()))?;
    }
    let arena = BlockArena::from_blocks(blocks)?;
    for block in arena.ordered() {
        let Some(parent_id) = block.parent_id.as_deref() else {
            continue;
        };
        match arena.get(parent_id) {
            Some(parent) if parent.kind.is_heading() => {}
            Some(_) => return Err(StoreError::InvalidInput("block parent must be a heading")),
            None => return Err(StoreError::InvalidInput("block parent does not exist")),
        }
        if arena.is_ancestor_or_self(&block.id, parent_id) {
            return Err(StoreError::InvalidInput("block parents form a cycle"));
        }
    }
    Ok(arena)
}
