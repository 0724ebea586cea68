#![forbid(unsafe_code)]

use super::super::StoreError;
use qd_core::change::TargetType;
use qd_core::governance::{VoteTally, VoteValue};
use rusqlite::{Connection, Transaction, params};

pub(in crate::store) fn tally_votes(
    conn: &Connection,
    target_type: TargetType,
    target_id: i64,
) -> Result<VoteTally, StoreError> {
    let mut stmt =
        conn.prepare("SELECT value FROM votes WHERE target_type=?1 AND target_id=?2")?;
    let rows = stmt.query_map(params![target_type.as_str(), target_id], |row| {
        row.get::<_, i64>(0)
    })?;
    let mut values = Vec::new();
    for value in rows {
        values.push(VoteValue::try_from(value?)?);
    }
    Ok(VoteTally::from_values(values))
}

/// Upserts a vote; `VoteValue::Clear` removes it instead.
pub(in crate::store) fn upsert_vote_tx(
    tx: &Transaction<'_>,
    user: &str,
    target_type: TargetType,
    target_id: i64,
    value: VoteValue,
    now_ms: i64,
) -> Result<(), StoreError> {
    if value == VoteValue::Clear {
        tx.execute(
            "DELETE FROM votes WHERE user_id=?1 AND target_type=?2 AND target_id=?3",
            params![user, target_type.as_str(), target_id],
        )?;
        return Ok(());
    }
    tx.execute(
        r#"
        INSERT INTO votes(user_id, target_type, target_id, value, created_at_ms, updated_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        ON CONFLICT(user_id, target_type, target_id)
        DO UPDATE SET value=excluded.value, updated_at_ms=excluded.updated_at_ms
        "#,
        params![user, target_type.as_str(), target_id, value.as_i64(), now_ms],
    )?;
    Ok(())
}
