use login_store::DatabaseConfig;
use login_store::db::LoginStorage;
use login_store::db::schema::SCHEMA_VERSION;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

async fn open(dir: &tempfile::TempDir) -> LoginStorage {
    LoginStorage::connect(&DatabaseConfig::at(dir.path()))
        .await
        .expect("failed to open credential store")
}

async fn user_version(storage: &LoginStorage) -> i64 {
    let (v,): (i64,) = sqlx::query_as("PRAGMA user_version")
        .fetch_one(storage.pool())
        .await
        .expect("failed to read user_version");
    v
}

#[tokio::test]
async fn connect_creates_backing_file_and_stamps_version() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = DatabaseConfig::at(dir.path().join("nested"));
    assert!(!cfg.path().exists());

    let storage = LoginStorage::connect(&cfg).await.expect("open");
    assert!(cfg.path().exists());
    assert!(cfg.path().ends_with("LOGIN_DATABASE"));
    assert_eq!(user_version(&storage).await, SCHEMA_VERSION);
}

#[tokio::test]
async fn insert_assigns_strictly_increasing_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = open(&dir).await;

    let mut last = 0;
    for i in 0..10 {
        let id = storage
            .insert(&format!("user{}", i % 3), "pw")
            .await
            .expect("insert");
        assert!(id > last, "id {id} not greater than {last}");
        last = id;
    }
}

#[tokio::test]
async fn newest_row_wins_for_repeated_username() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = open(&dir).await;

    storage.insert("alice", "pw1").await.expect("insert");
    let newest = storage.insert("alice", "pw2").await.expect("insert");
    storage.insert("bob", "other").await.expect("insert");

    let found = storage
        .find_by_username("alice")
        .await
        .expect("lookup")
        .expect("alice should exist");
    assert_eq!(found.id, newest);
    assert_eq!(found.password, "pw2");

    let all = storage.list_by_username("alice").await.expect("list");
    let passwords: Vec<_> = all.iter().map(|c| c.password.as_str()).collect();
    assert_eq!(passwords, vec!["pw1", "pw2"]);
}

#[tokio::test]
async fn lookup_is_exact_and_case_sensitive() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = open(&dir).await;
    storage.insert("Alice", "pw").await.expect("insert");

    assert!(storage.find_by_username("alice").await.expect("lookup").is_none());
    assert!(storage.find_by_username("Alic").await.expect("lookup").is_none());
    assert!(storage.find_by_username("Alice").await.expect("lookup").is_some());
}

#[tokio::test]
async fn empty_values_are_accepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = open(&dir).await;

    storage.insert("", "").await.expect("insert");
    let found = storage
        .find_by_username("")
        .await
        .expect("lookup")
        .expect("empty username row");
    assert_eq!(found.password, "");
}

#[tokio::test]
async fn ids_are_not_reused_after_delete() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = open(&dir).await;

    let first = storage.insert("a", "1").await.expect("insert");
    let second = storage.insert("b", "2").await.expect("insert");
    sqlx::query("DELETE FROM Login WHERE id = ?")
        .bind(second)
        .execute(storage.pool())
        .await
        .expect("delete");

    let third = storage.insert("c", "3").await.expect("insert");
    assert!(third > second && second > first);
}

#[tokio::test]
async fn reopening_same_version_keeps_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = open(&dir).await;
    let id = storage.insert("alice", "pw").await.expect("insert");
    storage.close().await;

    let storage = open(&dir).await;
    let found = storage.find_by_username("alice").await.expect("lookup");
    assert_eq!(found.map(|c| c.id), Some(id));
}

#[tokio::test]
async fn version_mismatch_wipes_and_recreates_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = DatabaseConfig::at(dir.path());

    let opts = SqliteConnectOptions::new()
        .filename(cfg.path())
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .expect("raw open");
    for stmt in [
        "CREATE TABLE Login (id INTEGER PRIMARY KEY, username TEXT, password TEXT, legacy TEXT)",
        "INSERT INTO Login (username, password, legacy) VALUES ('alice', 'old', 'x')",
        "PRAGMA user_version = 7",
    ] {
        sqlx::query(stmt).execute(&pool).await.expect("seed");
    }
    pool.close().await;

    let storage = LoginStorage::connect(&cfg).await.expect("open");
    assert_eq!(user_version(&storage).await, SCHEMA_VERSION);
    assert!(storage.find_by_username("alice").await.expect("lookup").is_none());

    storage.insert("alice", "new").await.expect("insert into fresh table");
    let found = storage.find_by_username("alice").await.expect("lookup");
    assert_eq!(found.map(|c| c.password), Some("new".to_string()));
}
