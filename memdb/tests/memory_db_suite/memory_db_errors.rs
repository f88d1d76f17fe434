// FICHIER : memdb/tests/memory_db_suite/memory_db_errors.rs

use crate::{init_test_env, seed_beatles};
use raise_memdb::memory_db::storage::SnapshotBackend;
use raise_memdb::memory_db::{MemoryDb, MemoryDbConfig};
use raise_memdb::utils::prelude::*;
use raise_memdb::utils::{async_trait, Arc, Duration};
use std::sync::atomic::{AtomicBool, Ordering};

/// Support qui refuse d'écrire tant que `broken` est levé.
#[derive(Default)]
struct FlakyBackend {
    broken: AtomicBool,
    last: std::sync::Mutex<Option<String>>,
}

#[async_trait]
impl SnapshotBackend for FlakyBackend {
    async fn load(&self) -> RaiseResult<Option<String>> {
        Ok(None)
    }

    async fn write(&self, content: &str) -> RaiseResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disque plein",
            )));
        }
        *self.last.lock().unwrap() = Some(content.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "flaky".into()
    }
}

#[tokio::test]
async fn test_invalid_operands_fail_even_without_data() {
    let env = init_test_env().await;
    let db = &env.db;

    for filter in [
        json!({ "where": { "name": { "like": 123 } } }),
        json!({ "where": { "name": { "nlike": 123 } } }),
        json!({ "where": { "seq": { "inq": "12" } } }),
        json!({ "where": { "seq": { "nin": 12 } } }),
        json!({ "where": { "seq": { "between": "12" } } }),
        json!({ "where": { "seq": { "between": [12] } } }),
        json!({ "where": { "name": { "regexp": "/(/" } } }),
    ] {
        let res = db.find("User", &filter).await;
        assert!(
            matches!(res, Err(AppError::InvalidOperand { .. })),
            "filtre {} : {:?}",
            filter,
            res
        );
    }

    seed_beatles(db).await;
    assert!(matches!(
        db.find("User", &json!({ "where": { "name": { "like": 123 } } })).await,
        Err(AppError::InvalidOperand { .. })
    ));
}

#[tokio::test]
async fn test_malformed_order_spec() {
    let env = init_test_env().await;

    let err = env
        .db
        .find("User", &json!({ "order": "seq ABC" }))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MalformedOrderSpec(ref spec) if spec == "seq ABC"));

    seed_beatles(&env.db).await;
    assert!(matches!(
        env.db.find("User", &json!({ "order": "seq ABC" })).await,
        Err(AppError::MalformedOrderSpec(_))
    ));
    assert!(matches!(
        env.db.find("User", &json!({ "order": { "seq": 1 } })).await,
        Err(AppError::MalformedOrderSpec(_))
    ));
}

#[tokio::test]
async fn test_error_serializes_as_message() {
    let err = AppError::invalid_operand("inq", "attendu un tableau, reçu chaîne");
    let as_json = serde_json::to_value(&err).unwrap();
    assert_eq!(
        as_json,
        json!("Opérande invalide pour 'inq' : attendu un tableau, reçu chaîne")
    );
}

#[tokio::test]
async fn test_write_failure_keeps_record_readable() {
    let backend = Arc::new(FlakyBackend::default());
    backend.broken.store(true, Ordering::SeqCst);
    let db = MemoryDb::with_backend(backend.clone(), Duration::ZERO)
        .await
        .unwrap();

    let res = db.create("User", json!({ "name": "John" })).await;
    assert!(matches!(res, Err(AppError::PersistenceWriteFailure(_))));

    // Pas de retour arrière : la table reste la référence
    let doc = db.find_by_id("User", &json!(1)).await.unwrap().unwrap();
    assert_eq!(doc["name"], "John");
    assert!(backend.last.lock().unwrap().is_none());

    // L'écriture suivante réconcilie le support
    backend.broken.store(false, Ordering::SeqCst);
    db.create("User", json!({ "name": "Paul" })).await.unwrap();
    let written = backend.last.lock().unwrap().clone().unwrap();
    let snapshot = raise_memdb::memory_db::storage::Snapshot::decode(&written).unwrap();
    assert_eq!(snapshot.record_count("User"), 2);
}

#[tokio::test]
async fn test_corrupted_snapshot_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("broken.json");
    tokio::fs::write(&file, "{ not json").await.unwrap();

    let res = MemoryDb::open(MemoryDbConfig::with_file(&file)).await;
    assert!(matches!(res, Err(AppError::Serialization(_))));
}
