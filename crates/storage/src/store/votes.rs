#![forbid(unsafe_code)]

use super::support::{
    change_row, document_row, governance_for_project, now_ms, tally_votes, upsert_vote_tx,
};
use super::{CastVoteRequest, SqliteStore, StoreError};
use qd_core::change::TargetType;
use qd_core::governance::{MergeProgress, VoteTally};
use rusqlite::Connection;

impl SqliteStore {
    /// Records, overwrites or clears a user's vote and returns the new tally.
    pub fn cast_vote(&mut self, request: CastVoteRequest) -> Result<VoteTally, StoreError> {
        let user = request.user.trim();
        if user.is_empty() {
            return Err(StoreError::InvalidInput("user must not be empty"));
        }
        let tx = self.conn.transaction()?;
        ensure_vote_target(&tx, request.target_type, request.target_id)?;
        upsert_vote_tx(
            &tx,
            user,
            request.target_type,
            request.target_id,
            request.value,
            now_ms(),
        )?;
        let tally = tally_votes(&tx, request.target_type, request.target_id)?;
        tx.commit()?;

        tracing::debug!(
            user,
            target_type = request.target_type.as_str(),
            target_id = request.target_id,
            value = request.value.as_i64(),
            yes = tally.yes,
            no = tally.no,
            "vote cast"
        );
        Ok(tally)
    }

    pub fn vote_tally(&self, target_type: TargetType, target_id: i64) -> Result<VoteTally, StoreError> {
        ensure_vote_target(&self.conn, target_type, target_id)?;
        tally_votes(&self.conn, target_type, target_id)
    }

    /// Yes votes against the project's current governance.
    pub fn is_passing(&self, change_id: i64) -> Result<bool, StoreError> {
        Ok(self.merge_progress(change_id)?.is_met())
    }

    pub fn merge_progress(&self, change_id: i64) -> Result<MergeProgress, StoreError> {
        change_progress(&self.conn, change_id)
    }
}

pub(super) fn change_progress(conn: &Connection, change_id: i64) -> Result<MergeProgress, StoreError> {
    let change = change_row(conn, change_id)?;
    let governance = governance_for_project(conn, change.project_id)?;
    let tally = tally_votes(conn, TargetType::Change, change_id)?;
    Ok(tally.progress(&governance))
}

fn ensure_vote_target(
    conn: &Connection,
    target_type: TargetType,
    target_id: i64,
) -> Result<(), StoreError> {
    match target_type {
        TargetType::Change => change_row(conn, target_id).map(|_| ()),
        TargetType::Entry => document_row(conn, target_id).map(|_| ()),
    }
}
