//! SQL DDL for the credential table.

/// Fixed file name of the database inside the data directory.
pub const DATABASE_NAME: &str = "LOGIN_DATABASE";

/// Stored in `PRAGMA user_version`. Any other non-zero value found on open
/// means an incompatible layout and the table is recreated from scratch.
pub const SCHEMA_VERSION: i64 = 1;

/// Must match `SCHEMA_VERSION`.
pub const SQLITE_STAMP_VERSION: &str = "PRAGMA user_version = 1";

/// SQLite schema with:
/// - `id` INTEGER PRIMARY KEY AUTOINCREMENT (ids are never reused)
/// - `username` not unique; the same name may be saved many times
/// - plain-text `password`
/// - non-unique index on `username` for lookups
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS Login (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    password TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_login_username ON Login(username);
"#;

/// Destructive migration: drop everything and let `SQLITE_INIT` rebuild it.
pub const SQLITE_WIPE: &str = r#"
DROP INDEX IF EXISTS idx_login_username;
DROP TABLE IF EXISTS Login;
"#;

/// Split a multi-statement script into individual statements
/// (sqlx::query runs one statement at a time).
pub fn statements(script: &str) -> impl Iterator<Item = &str> {
    script.split(';').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_matches_schema_version() {
        assert_eq!(
            SQLITE_STAMP_VERSION,
            format!("PRAGMA user_version = {SCHEMA_VERSION}")
        );
    }

    #[test]
    fn init_script_splits_into_table_and_index() {
        let stmts: Vec<_> = statements(SQLITE_INIT).collect();
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("CREATE TABLE IF NOT EXISTS Login"));
        assert!(stmts[1].starts_with("CREATE INDEX"));
    }
}
