// FICHIER : memdb/tests/memory_db_suite/query_integration.rs

use crate::{init_test_env, seed_beatles};
use raise_memdb::memory_db::query::{Condition, QueryBuilder, SortOrder};
use raise_memdb::utils::prelude::*;

fn names(docs: &[Value]) -> Vec<&str> {
    docs.iter().map(|d| d["name"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn test_like_and_nlike() {
    let env = init_test_env().await;
    seed_beatles(&env.db).await;
    let db = &env.db;

    let hits = db
        .find("User", &json!({ "where": { "name": { "like": "%St%" } } }))
        .await
        .unwrap();
    assert_eq!(names(&hits), vec!["Ringo Starr", "Stuart Sutcliffe"]);

    let others = db
        .find("User", &json!({ "where": { "name": { "nlike": "%St%" } } }))
        .await
        .unwrap();
    assert_eq!(others.len(), 4);

    let none = db
        .find("User", &json!({ "where": { "name": { "like": "M%XY" } } }))
        .await
        .unwrap();
    assert!(none.is_empty());

    let all = db
        .find("User", &json!({ "where": { "name": { "nlike": "M%XY" } } }))
        .await
        .unwrap();
    assert_eq!(all.len(), 6);
}

#[tokio::test]
async fn test_order_missing_values_first() {
    let env = init_test_env().await;
    seed_beatles(&env.db).await;

    let users = env
        .db
        .find("User", &json!({ "order": "vip ASC, seq DESC" }))
        .await
        .unwrap();
    assert_eq!(users[0]["seq"], 4);
    assert_eq!(users[1]["seq"], 3);

    let users = env
        .db
        .find("User", &json!({ "order": ["order DESC"], "limit": 2 }))
        .await
        .unwrap();
    assert_eq!(names(&users), vec!["Ringo Starr", "George Harrison"]);
}

#[tokio::test]
async fn test_ranges_lists_and_dates() {
    let env = init_test_env().await;
    seed_beatles(&env.db).await;
    let db = &env.db;

    let mid = db
        .find("User", &json!({ "where": { "seq": { "between": [1, 3] } }, "order": "seq" }))
        .await
        .unwrap();
    assert_eq!(names(&mid), vec!["Paul McCartney", "George Harrison", "Ringo Starr"]);

    let picked = db
        .find("User", &json!({ "where": { "seq": { "inq": [0, "5"] } } }))
        .await
        .unwrap();
    assert_eq!(names(&picked), vec!["John Lennon", "Stuart Sutcliffe"]);

    assert_eq!(
        db.count("User", Some(&json!({ "seq": { "nin": [0, 1, 2] } })))
            .await
            .unwrap(),
        3
    );

    let born_before = db
        .find(
            "User",
            &json!({ "where": { "birthday": { "lt": "1970-01-01T00:00:00.000Z" } } }),
        )
        .await
        .unwrap();
    assert_eq!(names(&born_before), vec!["Paul McCartney"]);

    // Champ absent : seule l'égalité à null correspond
    let no_vip = db
        .find("User", &json!({ "where": { "vip": null } }))
        .await
        .unwrap();
    assert_eq!(names(&no_vip), vec!["Pete Best"]);
}

#[tokio::test]
async fn test_and_or_and_regexp() {
    let env = init_test_env().await;
    seed_beatles(&env.db).await;
    let db = &env.db;

    let leads_or_last = db
        .find(
            "User",
            &json!({ "where": { "or": [{ "role": "lead" }, { "seq": 5 }] }, "fields": ["name"] }),
        )
        .await
        .unwrap();
    assert_eq!(
        leads_or_last,
        vec![
            json!({ "name": "John Lennon" }),
            json!({ "name": "Paul McCartney" }),
            json!({ "name": "Stuart Sutcliffe" }),
        ]
    );

    let both = db
        .count(
            "User",
            Some(&json!({ "and": [{ "vip": true }, { "seq": { "gt": 0 } }] })),
        )
        .await
        .unwrap();
    assert_eq!(both, 2);

    // Champ absent ou différent : la négation correspond
    let not_lead = db
        .count("User", Some(&json!({ "not": { "role": "lead" } })))
        .await
        .unwrap();
    assert_eq!(not_lead, 4);

    let j = db
        .find("User", &json!({ "where": { "name": { "regexp": "/^j/i" } } }))
        .await
        .unwrap();
    assert_eq!(names(&j), vec!["John Lennon"]);

    let pattern = db
        .find("User", &json!({ "where": { "name": { "$regex": "^P", "$options": "" } } }))
        .await
        .unwrap();
    assert_eq!(names(&pattern), vec!["Paul McCartney", "Pete Best"]);
}

#[tokio::test]
async fn test_typed_query_builder() {
    let env = init_test_env().await;
    seed_beatles(&env.db).await;

    let query = QueryBuilder::new("User")
        .where_cond(Condition::like("name", "%e%").unwrap())
        .sort("seq", SortOrder::Desc)
        .offset(1)
        .limit(2)
        .build();
    let result = env.db.find_query(query).await.unwrap();

    // Seul Ringo Starr n'a pas de 'e'
    assert_eq!(result.total_count, 5);
    assert_eq!(names(&result.documents), vec!["Pete Best", "George Harrison"]);
}
