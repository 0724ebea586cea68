#![forbid(unsafe_code)]

use super::support::{
    CHANGE_COLUMNS, RawChangeRow, change_row, document_row, governance_for_project, load_arena,
    now_ms, upsert_vote_tx,
};
use super::{
    ChangeRow, CreateChangeRequest, ListChangesRequest, SqliteStore, StageChangeRequest,
    StagedChange, StoreError,
};
use qd_core::change::{ChangeStatus, TargetType};
use qd_core::governance::VoteValue;
use qd_core::scope::validate_and_stage_change;
use rusqlite::{Transaction, params};

impl SqliteStore {
    /// Validates a proposal against the current document without storing it.
    pub fn stage_change(&self, request: StageChangeRequest) -> Result<StagedChange, StoreError> {
        let document = document_row(&self.conn, request.document_id)?;
        let blocks = load_arena(&self.conn, document.id)?.to_blocks();
        let validated = validate_and_stage_change(
            &blocks,
            &request.target,
            request.ops,
            request.affected_blocks,
        )?;
        Ok(StagedChange {
            document_id: document.id,
            base_version: document.version,
            validated,
        })
    }

    pub fn create_change(&mut self, request: CreateChangeRequest) -> Result<ChangeRow, StoreError> {
        let author = request.author.trim();
        if author.is_empty() {
            return Err(StoreError::InvalidInput("author must not be empty"));
        }
        let staged = request.staged;
        let ops_json = serde_json::to_string(&staged.validated.ops)?;
        let affected_json = serde_json::to_string(&staged.validated.affected_blocks)?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let document = document_row(&tx, staged.document_id)?;
        if document.version != staged.base_version {
            return Err(StoreError::RevisionMismatch {
                expected: staged.base_version,
                actual: document.version,
            });
        }

        tx.execute(
            r#"
            INSERT INTO changes(
              project_id, document_id, author, summary, ops_json, affected_json,
              target_section_id, base_version, status, before_outline, after_outline, created_at_ms
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                document.project_id,
                document.id,
                author,
                request.summary.trim(),
                ops_json,
                affected_json,
                staged.validated.target.as_str(),
                staged.base_version,
                ChangeStatus::Draft.as_str(),
                staged.validated.before_outline,
                staged.validated.after_outline,
                now_ms,
            ],
        )?;
        let change_id = tx.last_insert_rowid();
        if request.publish {
            publish_tx(&tx, change_id, now_ms)?;
        }
        let change = change_row(&tx, change_id)?;
        tx.commit()?;

        tracing::info!(
            change_id,
            document_id = change.document_id,
            target = change.target.as_str(),
            status = change.status.as_str(),
            "change created"
        );
        Ok(change)
    }

    /// Opens a Draft for voting and records the author's own yes vote.
    pub fn publish_change(&mut self, change_id: i64) -> Result<ChangeRow, StoreError> {
        let tx = self.conn.transaction()?;
        publish_tx(&tx, change_id, now_ms())?;
        let change = change_row(&tx, change_id)?;
        tx.commit()?;

        tracing::info!(change_id, closes_at_ms = ?change.closes_at_ms, "change published");
        Ok(change)
    }

    pub fn change(&self, change_id: i64) -> Result<ChangeRow, StoreError> {
        change_row(&self.conn, change_id)
    }

    pub fn list_changes(&self, request: ListChangesRequest) -> Result<Vec<ChangeRow>, StoreError> {
        document_row(&self.conn, request.document_id)?;
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {CHANGE_COLUMNS}
            FROM changes
            WHERE document_id=?1 AND (?2 IS NULL OR status=?2)
            ORDER BY id ASC
            "#
        ))?;
        let status = request.status.map(ChangeStatus::as_str);
        let rows = stmt.query_map(params![request.document_id, status], RawChangeRow::from_row)?;
        let mut out = Vec::new();
        for raw in rows {
            out.push(raw?.decode()?);
        }
        Ok(out)
    }
}

fn publish_tx(tx: &Transaction<'_>, change_id: i64, now_ms: i64) -> Result<(), StoreError> {
    let change = change_row(tx, change_id)?;
    if !change.status.can_publish() {
        return Err(StoreError::AlreadyPublished(change_id));
    }
    let governance = governance_for_project(tx, change.project_id)?;
    tx.execute(
        r#"
        UPDATE changes
        SET status=?2, published_at_ms=?3, closes_at_ms=?4
        WHERE id=?1
        "#,
        params![
            change_id,
            ChangeStatus::Published.as_str(),
            now_ms,
            governance.closes_at_ms(now_ms),
        ],
    )?;
    upsert_vote_tx(
        tx,
        &change.author,
        TargetType::Change,
        change_id,
        VoteValue::Up,
        now_ms,
    )?;
    Ok(())
}
