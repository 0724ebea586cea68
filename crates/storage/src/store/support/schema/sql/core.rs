#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        -- Governance lives on the project row; the threshold is stored in basis points.
        CREATE TABLE IF NOT EXISTS projects (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL UNIQUE,
          voting_pool_size INTEGER NOT NULL CHECK (voting_pool_size >= 1),
          approval_threshold_bp INTEGER NOT NULL CHECK (approval_threshold_bp BETWEEN 1 AND 10000),
          voting_duration_hours INTEGER NOT NULL CHECK (voting_duration_hours >= 1),
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );
"#;
