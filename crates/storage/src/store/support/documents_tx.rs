#![forbid(unsafe_code)]

use super::super::{DocumentRow, ProjectRow, StoreError};
use qd_core::governance::GovernanceSettings;
use rusqlite::{Connection, OptionalExtension, params};

pub(in crate::store) fn project_row(
    conn: &Connection,
    project_id: i64,
) -> Result<ProjectRow, StoreError> {
    let row = conn
        .query_row(
            r#"
            SELECT id, name, voting_pool_size, approval_threshold_bp, voting_duration_hours,
                   created_at_ms, updated_at_ms
            FROM projects
            WHERE id=?1
            "#,
            params![project_id],
            |row| {
                Ok(ProjectRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    governance: GovernanceSettings {
                        voting_pool_size: row.get(2)?,
                        approval_threshold_bp: row.get(3)?,
                        voting_duration_hours: row.get(4)?,
                    },
                    created_at_ms: row.get(5)?,
                    updated_at_ms: row.get(6)?,
                })
            },
        )
        .optional()?;
    row.ok_or(StoreError::UnknownProject(project_id))
}

pub(in crate::store) fn governance_for_project(
    conn: &Connection,
    project_id: i64,
) -> Result<GovernanceSettings, StoreError> {
    Ok(project_row(conn, project_id)?.governance)
}

pub(in crate::store) fn document_row(
    conn: &Connection,
    document_id: i64,
) -> Result<DocumentRow, StoreError> {
    let row = conn
        .query_row(
            r#"
            SELECT id, project_id, title, version, created_at_ms, updated_at_ms
            FROM documents
            WHERE id=?1
            "#,
            params![document_id],
            |row| {
                Ok(DocumentRow {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    title: row.get(2)?,
                    version: row.get(3)?,
                    created_at_ms: row.get(4)?,
                    updated_at_ms: row.get(5)?,
                })
            },
        )
        .optional()?;
    row.ok_or(StoreError::UnknownDocument(document_id))
}
