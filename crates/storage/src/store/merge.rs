#![forbid(unsafe_code)]

use super::support::{
    change_row, document_row, load_arena, now_ms, published_footprints, save_arena_tx,
    set_status_tx,
};
use super::votes::change_progress;
use super::{ChangeRow, MergeOutcome, MergeScope, SqliteStore, StoreError};
use qd_core::change::{ChangeFootprint, ChangeStatus, stale_changes};
use qd_core::ops::apply_ops;
use qd_core::outline::render_outline;
use rusqlite::{Connection, Transaction, params};

impl SqliteStore {
    /// Merges a passing Change. Merging an already merged Change is a no-op.
    pub fn merge_change(&mut self, change_id: i64) -> Result<MergeOutcome, StoreError> {
        let tx = self.conn.transaction()?;
        let change = change_row(&tx, change_id)?;
        match change.status {
            ChangeStatus::Merged => {
                let document = document_row(&tx, change.document_id)?;
                tracing::debug!(change_id, "merge skipped: already merged");
                return Ok(MergeOutcome {
                    change_id,
                    merged: false,
                    version: document.version,
                    stale_change_ids: Vec::new(),
                });
            }
            ChangeStatus::Draft => return Err(StoreError::NotPublished(change_id)),
            ChangeStatus::Published | ChangeStatus::NeedsUpdate => {}
        }

        let progress = change_progress(&tx, change_id)?;
        if !progress.is_met() {
            return Err(StoreError::NotPassing {
                required: progress.required,
                current: progress.current,
            });
        }

        let outcome = merge_tx(&tx, &change, now_ms())?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Merges every passing Published Change in `scope`, one transaction per
    /// Change. A Change whose ops no longer apply is moved to NeedsUpdate.
    pub fn auto_merge(&mut self, scope: MergeScope) -> Result<Vec<i64>, StoreError> {
        let candidates = published_in_scope(&self.conn, scope)?;
        let mut merged = Vec::new();

        for change_id in candidates {
            let tx = self.conn.transaction()?;
            let change = change_row(&tx, change_id)?;
            // An earlier merge in this pass may have marked it stale.
            if change.status != ChangeStatus::Published {
                continue;
            }
            if !change_progress(&tx, change_id)?.is_met() {
                continue;
            }
            match merge_tx(&tx, &change, now_ms()) {
                Ok(_) => {
                    tx.commit()?;
                    merged.push(change_id);
                }
                Err(StoreError::Apply(err)) => {
                    tx.rollback()?;
                    tracing::warn!(change_id, error = %err, "auto-merge failed, change needs update");
                    let tx = self.conn.transaction()?;
                    set_status_tx(&tx, change_id, ChangeStatus::NeedsUpdate)?;
                    tx.commit()?;
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(?scope, merged = merged.len(), "auto-merge finished");
        Ok(merged)
    }
}

fn published_in_scope(conn: &Connection, scope: MergeScope) -> Result<Vec<i64>, StoreError> {
    let published = ChangeStatus::Published.as_str();
    let (sql, scope_id) = match scope {
        MergeScope::Document(document_id) => (
            "SELECT id FROM changes WHERE status=?1 AND document_id=?2 ORDER BY id ASC",
            Some(document_id),
        ),
        MergeScope::Project(project_id) => (
            "SELECT id FROM changes WHERE status=?1 AND project_id=?2 ORDER BY id ASC",
            Some(project_id),
        ),
        MergeScope::All => ("SELECT id FROM changes WHERE status=?1 ORDER BY id ASC", None),
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = match scope_id {
        Some(scope_id) => stmt
            .query_map(params![published, scope_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map(params![published], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

/// Applies the Change, bumps the version, writes history and marks
/// overlapping Published Changes stale. Runs inside the caller's transaction.
fn merge_tx(
    tx: &Transaction<'_>,
    change: &ChangeRow,
    now_ms: i64,
) -> Result<MergeOutcome, StoreError> {
    let document_id = change.document_id;
    let mut arena = load_arena(tx, document_id)?;
    let outline_before = render_outline(arena.ordered());
    let report = apply_ops(&mut arena, &change.ops)?;
    save_arena_tx(tx, document_id, &arena)?;

    tx.execute(
        "UPDATE documents SET version=version+1, updated_at_ms=?2 WHERE id=?1",
        params![document_id, now_ms],
    )?;
    let version = document_row(tx, document_id)?.version;
    tx.execute(
        "UPDATE changes SET status=?2, merged_at_ms=?3 WHERE id=?1",
        params![change.id, ChangeStatus::Merged.as_str(), now_ms],
    )?;

    let outline_after = render_outline(arena.ordered());
    tx.execute(
        r#"
        INSERT INTO document_history(document_id, version, outline_before, outline_after, change_id, created_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![document_id, version, outline_before, outline_after, change.id, now_ms],
    )?;

    let footprints = published_footprints(tx, document_id)?;
    let stale_change_ids = stale_changes(
        change.id,
        &change.affected_blocks,
        footprints.iter().map(|(change_id, affected_blocks)| ChangeFootprint {
            change_id: *change_id,
            status: ChangeStatus::Published,
            affected_blocks,
        }),
    );
    for stale_id in &stale_change_ids {
        set_status_tx(tx, *stale_id, ChangeStatus::NeedsUpdate)?;
    }

    tracing::info!(
        change_id = change.id,
        document_id,
        version,
        touched = report.touched.len(),
        deleted = report.deleted.len(),
        stale = stale_change_ids.len(),
        "change merged"
    );
    Ok(MergeOutcome {
        change_id: change.id,
        merged: true,
        version,
        stale_change_ids,
    })
}
