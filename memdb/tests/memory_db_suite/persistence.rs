// FICHIER : memdb/tests/memory_db_suite/persistence.rs

use crate::{init_test_env, read_snapshot};
use raise_memdb::memory_db::{MemoryDb, MemoryDbConfig};
use raise_memdb::utils::prelude::*;
use raise_memdb::utils::Duration;

#[tokio::test]
async fn test_save_and_reload_snapshot() {
    let env = init_test_env().await;
    let db = &env.db;

    for (i, name) in ["John1", "John2", "John3"].iter().enumerate() {
        db.create("User", json!({ "name": name })).await.unwrap();
        // L'écriture est sur disque quand create rend la main
        assert_eq!(read_snapshot(&env.file).await.record_count("User"), i + 1);
    }

    assert_eq!(db.delete_by_id("User", &json!(1)).await.unwrap(), 1);
    assert_eq!(read_snapshot(&env.file).await.record_count("User"), 2);

    db.upsert("User", json!({ "id": 2, "name": "John2bis" }))
        .await
        .unwrap();
    let snapshot = read_snapshot(&env.file).await;
    assert_eq!(snapshot.record_count("User"), 2);
    assert_eq!(snapshot.ids["User"], 4);
    assert_eq!(
        snapshot.models["User"]["2"],
        r#"{"id":2,"name":"John2bis"}"#
    );

    // Nouveau moteur sur le même fichier
    let reloaded = MemoryDb::open(MemoryDbConfig::with_file(&env.file))
        .await
        .unwrap();
    let all = reloaded.all("User").await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].0, "2");
    assert_eq!(
        reloaded.find_by_id("User", &json!(2)).await.unwrap().unwrap()["name"],
        "John2bis"
    );
    assert_eq!(
        reloaded.create("User", json!({ "name": "John4" })).await.unwrap(),
        json!(4)
    );
}

#[tokio::test]
async fn test_unchanged_snapshot_is_rewritten_byte_for_byte() {
    let env = init_test_env().await;
    env.db
        .create("User", json!({ "name": "John", "bio": null }))
        .await
        .unwrap();
    env.db.define("Post").await.unwrap();
    let before = tokio::fs::read(&env.file).await.unwrap();

    let reloaded = MemoryDb::open(MemoryDbConfig::with_file(&env.file))
        .await
        .unwrap();
    reloaded.flush().await.unwrap();

    let after = tokio::fs::read(&env.file).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_counter_observes_ids_found_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("legacy.json");
    // Compteur en retard sur les clés présentes
    let raw = r#"{
  "ids": {
    "User": 1
  },
  "models": {
    "User": {
      "7": "{\"name\":\"Seven\",\"id\":7}"
    }
  }
}"#;
    tokio::fs::write(&file, raw).await.unwrap();

    let db = MemoryDb::open(MemoryDbConfig::with_file(&file)).await.unwrap();
    assert_eq!(db.create("User", json!({})).await.unwrap(), json!(8));
}

#[tokio::test]
async fn test_burst_of_creates_is_coalesced() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("burst.json");
    let config = MemoryDbConfig::with_file(&file).coalesce_window(Duration::from_millis(20));
    let db = MemoryDb::open(config).await.unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for n in 0..20 {
        let db = db.clone();
        tasks.spawn(async move { db.create("Burst", json!({ "n": n })).await });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap().unwrap();
    }

    let writes = db.persisted_writes().unwrap();
    assert!(writes >= 1 && writes < 20, "écritures : {}", writes);
    assert_eq!(read_snapshot(&file).await.record_count("Burst"), 20);
}
