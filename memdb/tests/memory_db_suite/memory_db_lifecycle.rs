// FICHIER : memdb/tests/memory_db_suite/memory_db_lifecycle.rs

use crate::{init_test_env, read_snapshot};
use raise_memdb::memory_db::storage::{ENV_COALESCE_MS, ENV_FILE};
use raise_memdb::memory_db::{MemoryDb, MemoryDbConfig};
use raise_memdb::utils::prelude::*;
use raise_memdb::utils::Duration;
use serial_test::serial;

#[tokio::test]
async fn test_open_without_file_creates_nothing_until_first_write() {
    let env = init_test_env().await;
    assert!(!env.file.exists());

    env.db.define("Empty").await.unwrap();
    assert!(env.file.exists());

    let snapshot = read_snapshot(&env.file).await;
    assert_eq!(snapshot.ids["Empty"], 1);
    assert_eq!(snapshot.record_count("Empty"), 0);
    assert_eq!(env.db.collections().await.unwrap(), vec!["Empty"]);
}

#[tokio::test]
async fn test_clones_share_state_and_writer() {
    let env = init_test_env().await;
    let other = env.db.clone();

    other.create("User", json!({ "name": "John" })).await.unwrap();
    assert!(env.db.exists("User", &json!(1)).await.unwrap());
    assert_eq!(env.db.persisted_writes(), other.persisted_writes());
}

#[tokio::test]
async fn test_full_crud_cycle() {
    let env = init_test_env().await;
    let db = &env.db;

    let id = db
        .create("Post", json!({ "title": "Hello", "tags": ["a"] }))
        .await
        .unwrap();
    let updated = db
        .update_attributes("Post", &id, json!({ "title": "Hello!" }))
        .await
        .unwrap();
    assert_eq!(updated, json!({ "title": "Hello!", "tags": ["a"], "id": 1 }));

    let n = db
        .update_all("Post", None, json!({ "published": true }))
        .await
        .unwrap();
    assert_eq!(n, 1);

    let stored = db.find_by_id("Post", &id).await.unwrap().unwrap();
    assert_eq!(stored["published"], true);

    assert_eq!(db.destroy_all("Post").await.unwrap(), 1);
    assert!(db.find_by_id("Post", &id).await.unwrap().is_none());
    assert_eq!(read_snapshot(&env.file).await.record_count("Post"), 0);
    // Le compteur survit au vidage
    assert_eq!(read_snapshot(&env.file).await.ids["Post"], 2);
}

#[tokio::test]
async fn test_in_memory_engine_has_no_writer() {
    let db = MemoryDb::open(MemoryDbConfig::in_memory()).await.unwrap();
    db.create("User", json!({})).await.unwrap();
    db.flush().await.unwrap();
    assert_eq!(db.persisted_writes(), None);
}

#[tokio::test]
#[serial]
async fn test_open_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("env.json");
    std::env::set_var(ENV_FILE, &file);
    std::env::set_var(ENV_COALESCE_MS, "5");

    let config = MemoryDbConfig::from_env().unwrap();
    std::env::remove_var(ENV_FILE);
    std::env::remove_var(ENV_COALESCE_MS);

    assert_eq!(config.coalesce_window, Duration::from_millis(5));
    let db = MemoryDb::open(config).await.unwrap();
    db.create("User", json!({ "name": "Env" })).await.unwrap();
    assert_eq!(read_snapshot(&file).await.record_count("User"), 1);
}
