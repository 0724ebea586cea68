#![forbid(unsafe_code)]

use super::super::{ChangeRow, StoreError};
use qd_core::change::ChangeStatus;
use qd_core::ops::parse_ops_str;
use qd_core::scope::ChangeTarget;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use std::collections::BTreeSet;

pub(in crate::store) const CHANGE_COLUMNS: &str = r#"
    id, project_id, document_id, author, summary, ops_json, affected_json,
    target_section_id, base_version, status, before_outline, after_outline,
    created_at_ms, published_at_ms, closes_at_ms, merged_at_ms
"#;

/// Column values as stored, before JSON and enum decoding.
pub(in crate::store) struct RawChangeRow {
    id: i64,
    project_id: i64,
    document_id: i64,
    author: String,
    summary: String,
    ops_json: String,
    affected_json: String,
    target_section_id: String,
    base_version: i64,
    status: String,
    before_outline: String,
    after_outline: String,
    created_at_ms: i64,
    published_at_ms: Option<i64>,
    closes_at_ms: Option<i64>,
    merged_at_ms: Option<i64>,
}

impl RawChangeRow {
    pub(in crate::store) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            document_id: row.get(2)?,
            author: row.get(3)?,
            summary: row.get(4)?,
            ops_json: row.get(5)?,
            affected_json: row.get(6)?,
            target_section_id: row.get(7)?,
            base_version: row.get(8)?,
            status: row.get(9)?,
            before_outline: row.get(10)?,
            after_outline: row.get(11)?,
            created_at_ms: row.get(12)?,
            published_at_ms: row.get(13)?,
            closes_at_ms: row.get(14)?,
            merged_at_ms: row.get(15)?,
        })
    }

    pub(in crate::store) fn decode(self) -> Result<ChangeRow, StoreError> {
        let status = parse_status(self.id, &self.status)?;
        let ops = parse_ops_str(&self.ops_json)?;
        let affected_blocks: BTreeSet<String> = serde_json::from_str(&self.affected_json)?;
        Ok(ChangeRow {
            id: self.id,
            project_id: self.project_id,
            document_id: self.document_id,
            author: self.author,
            summary: self.summary,
            ops,
            affected_blocks,
            target: ChangeTarget::parse(&self.target_section_id),
            base_version: self.base_version,
            status,
            before_outline: self.before_outline,
            after_outline: self.after_outline,
            created_at_ms: self.created_at_ms,
            published_at_ms: self.published_at_ms,
            closes_at_ms: self.closes_at_ms,
            merged_at_ms: self.merged_at_ms,
        })
    }
}

pub(in crate::store) fn parse_status(change_id: i64, raw: &str) -> Result<ChangeStatus, StoreError> {
    ChangeStatus::parse(raw)
        .ok_or_else(|| StoreError::Corrupt(format!("change {change_id} has status {raw}")))
}

pub(in crate::store) fn change_row(conn: &Connection, change_id: i64) -> Result<ChangeRow, StoreError> {
    let raw = conn
        .query_row(
            &format!("SELECT {CHANGE_COLUMNS} FROM changes WHERE id=?1"),
            params![change_id],
            RawChangeRow::from_row,
        )
        .optional()?;
    raw.ok_or(StoreError::UnknownChange(change_id))?.decode()
}

/// `(id, affected_blocks)` of every Published Change on a document.
pub(in crate::store) fn published_footprints(
    conn: &Connection,
    document_id: i64,
) -> Result<Vec<(i64, BTreeSet<String>)>, StoreError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, affected_json
        FROM changes
        WHERE document_id=?1 AND status=?2
        ORDER BY id ASC
        "#,
    )?;
    let rows = stmt.query_map(
        params![document_id, ChangeStatus::Published.as_str()],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
    )?;
    let mut out = Vec::new();
    for row in rows {
        let (id, affected_json) = row?;
        out.push((id, serde_json::from_str(&affected_json)?));
    }
    Ok(out)
}

pub(in crate::store) fn set_status_tx(
    tx: &Transaction<'_>,
    change_id: i64,
    status: ChangeStatus,
) -> Result<(), StoreError> {
    let updated = tx.execute(
        "UPDATE changes SET status=?2 WHERE id=?1",
        params![change_id, status.as_str()],
    )?;
    if updated == 0 {
        return Err(StoreError::UnknownChange(change_id));
    }
    Ok(())
}
