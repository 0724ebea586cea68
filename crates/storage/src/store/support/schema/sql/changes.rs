#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS changes (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          project_id INTEGER NOT NULL REFERENCES projects(id),
          document_id INTEGER NOT NULL REFERENCES documents(id),
          author TEXT NOT NULL,
          summary TEXT NOT NULL,
          ops_json TEXT NOT NULL,
          affected_json TEXT NOT NULL,
          target_section_id TEXT NOT NULL,
          base_version INTEGER NOT NULL,
          status TEXT NOT NULL,
          before_outline TEXT NOT NULL,
          after_outline TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          published_at_ms INTEGER,
          closes_at_ms INTEGER,
          merged_at_ms INTEGER
        );
"#;
