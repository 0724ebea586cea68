#![forbid(unsafe_code)]

use super::support::{governance_for_project, now_ms, project_row};
use super::{CreateProjectRequest, ProjectRow, SqliteStore, StoreError};
use qd_core::governance::GovernanceSettings;
use rusqlite::{ErrorCode, params};

impl SqliteStore {
    pub fn create_project(&mut self, request: CreateProjectRequest) -> Result<ProjectRow, StoreError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("project name must not be empty"));
        }
        request.governance.validate()?;

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        let insert = tx.execute(
            r#"
            INSERT INTO projects(name, voting_pool_size, approval_threshold_bp, voting_duration_hours, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
            params![
                name,
                request.governance.voting_pool_size,
                request.governance.approval_threshold_bp,
                request.governance.voting_duration_hours,
                now_ms,
            ],
        );
        if let Err(err) = insert {
            return Err(map_name_conflict(err));
        }
        let project_id = tx.last_insert_rowid();
        let project = project_row(&tx, project_id)?;
        tx.commit()?;

        tracing::info!(project_id, name = %project.name, "project created");
        Ok(project)
    }

    pub fn project(&self, project_id: i64) -> Result<ProjectRow, StoreError> {
        project_row(&self.conn, project_id)
    }

    /// Replaces a project's governance. Open Changes are judged against the
    /// new settings from now on.
    pub fn update_governance(
        &mut self,
        project_id: i64,
        governance: GovernanceSettings,
    ) -> Result<ProjectRow, StoreError> {
        governance.validate()?;
        let tx = self.conn.transaction()?;
        let updated = tx.execute(
            r#"
            UPDATE projects
            SET voting_pool_size=?2, approval_threshold_bp=?3, voting_duration_hours=?4, updated_at_ms=?5
            WHERE id=?1
            "#,
            params![
                project_id,
                governance.voting_pool_size,
                governance.approval_threshold_bp,
                governance.voting_duration_hours,
                now_ms(),
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::UnknownProject(project_id));
        }
        let project = project_row(&tx, project_id)?;
        tx.commit()?;

        tracing::info!(
            project_id,
            pool = governance.voting_pool_size,
            threshold_bp = governance.approval_threshold_bp,
            "governance updated"
        );
        Ok(project)
    }

    pub fn required_yes_votes(&self, project_id: i64) -> Result<u32, StoreError> {
        Ok(governance_for_project(&self.conn, project_id)?.required_yes_votes())
    }
}

fn map_name_conflict(err: rusqlite::Error) -> StoreError {
    let conflict = match &err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message
                    .as_deref()
                    .is_some_and(|value| value.contains("UNIQUE constraint failed"))
        }
        _ => false,
    };
    if conflict {
        return StoreError::InvalidInput("project name already exists");
    }
    StoreError::Sql(err)
}
