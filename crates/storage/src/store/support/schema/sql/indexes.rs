#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE INDEX IF NOT EXISTS idx_changes_document_status ON changes(document_id, status);
        CREATE INDEX IF NOT EXISTS idx_changes_project_status ON changes(project_id, status);
        CREATE INDEX IF NOT EXISTS idx_votes_target ON votes(target_type, target_id);
"#;
