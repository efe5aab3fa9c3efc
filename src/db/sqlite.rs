use crate::config::DatabaseConfig;
use crate::db::models::{Credential, CredentialId};
use crate::db::schema::{SCHEMA_VERSION, SQLITE_INIT, SQLITE_STAMP_VERSION, SQLITE_WIPE, statements};
use crate::error::StorageError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, warn};

pub type SqlitePool = Pool<Sqlite>;

/// Record store over the `Login` table.
#[derive(Clone)]
pub struct LoginStorage {
    pool: SqlitePool,
}

impl LoginStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if absent) the database file described by `cfg` and
    /// bring its schema up to date.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(&cfg.data_dir).await?;

        let path = cfg.path();
        let connect_opts = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(cfg.max_connections.max(1))
            .connect_with(connect_opts)
            .await?;

        let storage = Self::new(pool);
        storage.init_schema().await?;
        info!(path = %path.display(), "credential store opened");
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the table if needed. A database stamped with a different
    /// schema version is wiped first.
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        let (version,): (i64,) = sqlx::query_as("PRAGMA user_version")
            .fetch_one(&mut *tx)
            .await?;
        if version != 0 && version != SCHEMA_VERSION {
            warn!(
                found = version,
                expected = SCHEMA_VERSION,
                "schema version mismatch; recreating credential table"
            );
            for stmt in statements(SQLITE_WIPE) {
                sqlx::query(stmt).execute(&mut *tx).await?;
            }
        }

        for stmt in statements(SQLITE_INIT) {
            sqlx::query(stmt).execute(&mut *tx).await?;
        }
        sqlx::query(SQLITE_STAMP_VERSION).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Append a row. Returns the id SQLite assigned to it.
    pub async fn insert(&self, username: &str, password: &str) -> Result<CredentialId, StorageError> {
        let id = sqlx::query("INSERT INTO Login (username, password) VALUES (?, ?)")
            .bind(username)
            .bind(password)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();
        debug!(id, username, "credential inserted");
        Ok(id)
    }

    /// Exact (case-sensitive) match on `username`; the newest row wins when
    /// the name was saved more than once.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StorageError> {
        let row = sqlx::query_as::<_, Credential>(
            r#"SELECT id, username, password FROM Login
               WHERE username = ? ORDER BY id DESC LIMIT 1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        debug!(username, found = row.is_some(), "credential lookup");
        Ok(row)
    }

    /// Every row saved under `username`, oldest first.
    pub async fn list_by_username(&self, username: &str) -> Result<Vec<Credential>, StorageError> {
        let rows = sqlx::query_as::<_, Credential>(
            r#"SELECT id, username, password FROM Login
               WHERE username = ? ORDER BY id"#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
