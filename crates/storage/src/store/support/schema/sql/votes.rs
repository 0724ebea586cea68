#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        -- One row per (user, target); a cleared vote deletes the row.
        CREATE TABLE IF NOT EXISTS votes (
          user_id TEXT NOT NULL,
          target_type TEXT NOT NULL,
          target_id INTEGER NOT NULL,
          value INTEGER NOT NULL CHECK (value IN (-1, 1)),
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          PRIMARY KEY (user_id, target_type, target_id)
        );
"#;
