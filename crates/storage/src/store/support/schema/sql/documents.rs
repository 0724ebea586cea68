#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS documents (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          project_id INTEGER NOT NULL REFERENCES projects(id),
          title TEXT NOT NULL,
          version INTEGER NOT NULL CHECK (version >= 1),
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        -- `seq` is the creation sequence used to break order_key ties.
        CREATE TABLE IF NOT EXISTS blocks (
          document_id INTEGER NOT NULL REFERENCES documents(id),
          stable_id TEXT NOT NULL,
          kind TEXT NOT NULL,
          text TEXT NOT NULL,
          parent_id TEXT,
          order_key REAL NOT NULL,
          seq INTEGER NOT NULL,
          PRIMARY KEY (document_id, stable_id)
        );

        CREATE TABLE IF NOT EXISTS document_history (
          document_id INTEGER NOT NULL REFERENCES documents(id),
          version INTEGER NOT NULL,
          outline_before TEXT NOT NULL,
          outline_after TEXT NOT NULL,
          change_id INTEGER REFERENCES changes(id),
          created_at_ms INTEGER NOT NULL,
          PRIMARY KEY (document_id, version)
        );
"#;
