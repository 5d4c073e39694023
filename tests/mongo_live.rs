//! Runs against a real server. Set `DOCSTORE_TEST_URI` and run with
//! `--ignored`.

use std::time::{SystemTime, UNIX_EPOCH};

use docstore::{
    doc, ConnectionConfig, DocumentStore, Filter, Projection, Sort, StoreError, UpdateSpec,
    WriteAcknowledgement,
};

fn live_config() -> Option<ConnectionConfig> {
    let uri = std::env::var("DOCSTORE_TEST_URI").ok()?;
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    Some(ConnectionConfig::new(uri, format!("docstore_test_{nanos}")))
}

#[test]
#[ignore = "requires a MongoDB server at DOCSTORE_TEST_URI"]
fn crud_scenario_against_server() {
    let Some(config) = live_config() else {
        return;
    };
    let store = DocumentStore::connect_with_config(&config).unwrap();
    let coll = store.collection("people");

    coll.insert(doc! {"_id": 1, "name": "a"}).unwrap();
    assert_eq!(coll.count().unwrap(), 1);

    let found: Vec<_> = coll.find(Filter::eq("name", "a")).unwrap().try_collect().unwrap();
    assert_eq!(found, vec![doc! {"_id": 1, "name": "a"}]);

    let modified = coll
        .update_many(Filter::eq("name", "a"), UpdateSpec::new().set("name", "b"))
        .unwrap();
    assert_eq!(modified, 1);
    assert!(coll.find_one(Filter::eq("name", "a")).unwrap().is_none());

    coll.insert_many(vec![
        doc! {"_id": 2, "name": "c", "rank": 2},
        doc! {"_id": 3, "name": "d", "rank": 1},
    ])
    .unwrap();
    let ranked: Vec<_> = coll
        .find_sorted_with_projection(
            Filter::exists("rank"),
            Sort::new().ascending("rank"),
            Projection::excluding(["rank"]),
        )
        .unwrap()
        .try_collect()
        .unwrap();
    assert_eq!(ranked, vec![doc! {"_id": 3, "name": "d"}, doc! {"_id": 2, "name": "c"}]);

    let err = coll.insert(doc! {"_id": 1}).unwrap_err();
    assert!(matches!(err, StoreError::Write(_)));
}

#[test]
#[ignore = "requires a MongoDB server at DOCSTORE_TEST_URI"]
fn unacknowledged_update_many_returns_zero() {
    let Some(config) = live_config() else {
        return;
    };
    let store = DocumentStore::connect_with_config(
        &config.write_concern(WriteAcknowledgement::Unacknowledged),
    )
    .unwrap();
    let coll = store.collection("items");
    let modified = coll
        .update_many(Filter::all(), UpdateSpec::new().set("seen", true))
        .unwrap();
    assert_eq!(modified, 0);
}

#[test]
#[ignore = "needs network access to fail a server selection"]
fn unreachable_cluster_fails_on_connect() {
    let config = ConnectionConfig::new(
        "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200",
        "testdb",
    );
    let err = DocumentStore::connect_with_config(&config).unwrap_err();
    assert!(matches!(err, StoreError::Connection(_)));
}
