//! SQLite-backed [`DocumentStore`].
//!
//! Writes run on the blocking pool behind a shared connection. Every append
//! broadcasts the written [`CollectionPath`]; each live subscription owns a pump
//! task that reloads the full ordered collection when its path changes and
//! forwards the result as one snapshot.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tokio::sync::{broadcast, mpsc};

use super::{CollectionPath, DocumentStore, Subscription};
use crate::error::{Result, SaathiError};
use crate::record::{ActivityRecord, Details, NewRecord, RecordType, Snapshot, Timestamp};

/// Change notifications buffered before a slow subscriber starts lagging.
const CHANGE_BUFFER: usize = 64;
/// Snapshots buffered per subscription.
const SNAPSHOT_BUFFER: usize = 8;

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    changes: broadcast::Sender<CollectionPath>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            conn: Arc::new(Mutex::new(conn)),
            changes,
        }
    }

    /// Open (or create) an on-disk store.
    ///
    /// Any failure to open or migrate the database is a configuration error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = crate::db::open_database(path).map_err(SaathiError::configuration)?;
        Ok(Self::new(conn))
    }

    /// An ephemeral store that lives as long as this value.
    pub fn in_memory() -> Result<Self> {
        let conn = crate::db::open_memory_database().map_err(SaathiError::configuration)?;
        Ok(Self::new(conn))
    }

    /// Number of live subscriptions currently listening for changes.
    pub fn listener_count(&self) -> usize {
        self.changes.receiver_count()
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        run_blocking(Arc::clone(&self.conn), f).await
    }
}

async fn run_blocking<T, F>(conn: Arc<Mutex<Connection>>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = conn
            .lock()
            .map_err(|e| SaathiError::Connectivity(format!("db lock poisoned: {e}")))?;
        f(&mut conn)
    })
    .await?
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn append(&self, path: &CollectionPath, record: NewRecord) -> Result<String> {
        let owner = path.clone();
        let record_type = record.record_type.clone();
        let id = self
            .with_conn(move |conn| insert_record(conn, &owner, &record))
            .await?;

        tracing::debug!(id = %id, record_type = %record_type, collection = %path, "record appended");

        // No receivers simply means nobody is subscribed right now.
        let _ = self.changes.send(path.clone());
        Ok(id)
    }

    async fn subscribe(&self, path: &CollectionPath) -> Result<Subscription> {
        // Listen before the first load so no write between the two is missed.
        let mut changes = self.changes.subscribe();
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        let conn = Arc::clone(&self.conn);
        let path = path.clone();

        tracing::debug!(collection = %path, "subscription opened");

        let pump = tokio::spawn(async move {
            loop {
                let owner = path.clone();
                let snapshot = run_blocking(Arc::clone(&conn), move |conn| {
                    load_snapshot(conn, &owner)
                })
                .await;

                if let Err(ref e) = snapshot {
                    tracing::warn!(collection = %path, error = %e, "snapshot load failed");
                }
                if tx.send(snapshot).await.is_err() {
                    break;
                }

                if !wait_for_change(&mut changes, &path).await {
                    break;
                }
            }
            tracing::debug!(collection = %path, "subscription closed");
        });

        Ok(Subscription::new(rx, pump.abort_handle()))
    }
}

/// Block until `path` changes. Returns `false` once the store is gone.
///
/// Notifications that arrive while waiting are coalesced into one reload.
async fn wait_for_change(
    changes: &mut broadcast::Receiver<CollectionPath>,
    path: &CollectionPath,
) -> bool {
    loop {
        match changes.recv().await {
            Ok(changed) if &changed == path => break,
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "change feed lagged, reloading");
                break;
            }
            Err(broadcast::error::RecvError::Closed) => return false,
        }
    }
    while let Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) = changes.try_recv() {}
    true
}

/// Insert one record, assigning an id and a timestamp strictly greater than
/// any earlier timestamp in the same collection.
fn insert_record(conn: &mut Connection, path: &CollectionPath, record: &NewRecord) -> Result<String> {
    let tx = conn.transaction()?;

    let last: Option<i64> = tx.query_row(
        "SELECT MAX(timestamp) FROM activities WHERE app_id = ?1 AND user_id = ?2",
        params![path.app_id, path.user_id],
        |row| row.get(0),
    )?;
    let now = Utc::now().timestamp_micros();
    let timestamp = match last {
        Some(last) if last >= now => last + 1,
        _ => now,
    };

    let id = uuid::Uuid::now_v7().to_string();
    let details = record.details.as_ref().map(|d| d.to_json().to_string());

    tx.execute(
        "INSERT INTO activities (id, app_id, user_id, type, text, icon, details, timestamp) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id,
            path.app_id,
            path.user_id,
            record.record_type.as_str(),
            record.text,
            record.icon,
            details,
            timestamp,
        ],
    )?;

    tx.commit()?;
    Ok(id)
}

/// Load a collection's full ordered snapshot.
fn load_snapshot(conn: &mut Connection, path: &CollectionPath) -> Result<Snapshot> {
    let mut stmt = conn.prepare(
        "SELECT id, seq, type, text, icon, details, timestamp FROM activities \
         WHERE app_id = ?1 AND user_id = ?2 \
         ORDER BY timestamp DESC, seq DESC",
    )?;

    let records = stmt
        .query_map(params![path.app_id, path.user_id], |row| {
            Ok(StoredRow {
                id: row.get(0)?,
                sequence: row.get(1)?,
                record_type: row.get(2)?,
                text: row.get(3)?,
                icon: row.get(4)?,
                details: row.get(5)?,
                timestamp: row.get(6)?,
            })
        })?
        .map(|row| row.map(StoredRow::decode))
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Snapshot::from_records(records))
}

/// A raw row, before lenient decoding.
struct StoredRow {
    id: String,
    sequence: i64,
    record_type: String,
    text: String,
    icon: Option<String>,
    details: Option<String>,
    timestamp: Option<i64>,
}

impl StoredRow {
    /// Decode without failing: malformed payloads are dropped, unknown types kept.
    fn decode(self) -> ActivityRecord {
        let record_type = RecordType::parse_lossy(&self.record_type);
        let details = self
            .details
            .as_deref()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|value| Details::from_json(&record_type, &value));
        let timestamp = self
            .timestamp
            .and_then(DateTime::<Utc>::from_timestamp_micros)
            .map(Timestamp::Resolved)
            .unwrap_or(Timestamp::Pending);

        ActivityRecord {
            id: self.id,
            record_type,
            text: self.text,
            icon: self.icon,
            details,
            timestamp,
            sequence: self.sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Emotion, ExpenseCategory};
    use futures::StreamExt;
    use std::time::Duration;

    fn path(user: &str) -> CollectionPath {
        CollectionPath::new("test-app", user)
    }

    async fn next_snapshot(sub: &mut Subscription) -> Snapshot {
        tokio::time::timeout(Duration::from_secs(5), sub.next())
            .await
            .expect("snapshot within timeout")
            .expect("stream open")
            .expect("snapshot ok")
    }

    #[tokio::test]
    async fn initial_snapshot_is_empty() {
        let store = SqliteStore::in_memory().unwrap();
        let mut sub = store.subscribe(&path("u1")).await.unwrap();
        assert!(next_snapshot(&mut sub).await.is_empty());
    }

    #[tokio::test]
    async fn append_delivers_full_snapshot_newest_first() {
        let store = SqliteStore::in_memory().unwrap();
        let p = path("u1");
        let mut sub = store.subscribe(&p).await.unwrap();
        assert!(next_snapshot(&mut sub).await.is_empty());

        let first = store.append(&p, NewRecord::user("kal 200 ka petrol")).await.unwrap();
        let first_snap = next_snapshot(&mut sub).await;
        assert_eq!(first_snap.len(), 1);

        let second = store
            .append(&p, NewRecord::expense(ExpenseCategory::Transport, 200.0))
            .await
            .unwrap();
        let snap = next_snapshot(&mut sub).await;
        let ids: Vec<&str> = snap.newest_first().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, [second.as_str(), first.as_str()]);
        assert_eq!(snap.get(&second).unwrap().expense().unwrap().amount, 200.0);
    }

    #[tokio::test]
    async fn timestamps_are_strictly_increasing() {
        let store = SqliteStore::in_memory().unwrap();
        let p = path("u1");
        for _ in 0..5 {
            store.append(&p, NewRecord::note()).await.unwrap();
        }
        let snap = crate::store::current_snapshot(&store, &p).await.unwrap();
        let stamps: Vec<_> = snap.chronological().map(|r| r.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = SqliteStore::in_memory().unwrap();
        store.append(&path("a"), NewRecord::mood(Emotion::Calm)).await.unwrap();

        let other = crate::store::current_snapshot(&store, &path("b")).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn malformed_rows_decode_leniently() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO activities (id, app_id, user_id, type, text, details, timestamp) \
                     VALUES ('a', 'test-app', 'u1', 'expense', 'broken', '{not json', 10), \
                            ('b', 'test-app', 'u1', 'legacy', 'old kind', NULL, 20), \
                            ('c', 'test-app', 'u1', 'mood', 'pending', '{\"emotion\":\"sad\"}', NULL)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let snap = crate::store::current_snapshot(&store, &path("u1")).await.unwrap();
        let ids: Vec<&str> = snap.newest_first().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);

        assert!(snap.get("a").unwrap().details.is_none());
        assert_eq!(
            snap.get("b").unwrap().record_type,
            RecordType::Unknown("legacy".into())
        );
        let pending = snap.get("c").unwrap();
        assert!(pending.timestamp.is_pending());
        assert_eq!(pending.mood().unwrap().emotion, "sad");
    }

    #[tokio::test]
    async fn dropping_subscription_releases_listener() {
        let store = SqliteStore::in_memory().unwrap();
        let mut sub = store.subscribe(&path("u1")).await.unwrap();
        next_snapshot(&mut sub).await;
        assert_eq!(store.listener_count(), 1);

        drop(sub);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.listener_count(), 0);

        // Writes keep working with nobody listening.
        store.append(&path("u1"), NewRecord::note()).await.unwrap();
    }
}
