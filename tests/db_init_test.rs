use saathi::db;
use saathi::db::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use saathi::record::NewRecord;
use saathi::store::{current_snapshot, CollectionPath, DocumentStore, SqliteStore};

#[test]
fn open_database_creates_file_and_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("activities.db");

    let conn = db::open_database(&path).unwrap();
    assert!(path.exists());
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);

    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");

    let timeout: i64 = conn
        .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[test]
fn reopening_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activities.db");

    drop(db::open_database(&path).unwrap());
    let conn = db::open_database(&path).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn health_check_on_fresh_database() {
    let conn = db::open_memory_database().unwrap();
    let report = db::check_database_health(&conn).unwrap();
    assert_eq!(report.schema_version, CURRENT_SCHEMA_VERSION);
    assert_eq!(report.activity_count, 0);
    assert_eq!(report.collection_count, 0);
    assert_eq!(report.pending_count, 0);
    assert!(report.integrity_ok);
}

#[tokio::test]
async fn records_survive_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activities.db");
    let asha = CollectionPath::new("app", "asha");
    let bela = CollectionPath::new("app", "bela");

    {
        let store = SqliteStore::open(&path).unwrap();
        store.append(&asha, NewRecord::user("pehla message")).await.unwrap();
        store.append(&asha, NewRecord::note()).await.unwrap();
        store.append(&bela, NewRecord::user("hi")).await.unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let snapshot = current_snapshot(&store, &asha).await.unwrap();
    let texts: Vec<&str> = snapshot.chronological().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, ["pehla message", "I've made a note of that."]);

    let conn = db::open_database(&path).unwrap();
    let report = db::check_database_health(&conn).unwrap();
    assert_eq!(report.activity_count, 3);
    assert_eq!(report.collection_count, 2);
}
