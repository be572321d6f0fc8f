//! Storage layer for rollcall.
//!
//! This module provides `SQLite`-backed persistent storage for the
//! volunteer, material, and activity collections, with index-assisted
//! lookups and atomic multi-collection transactions.
//!
//! A [`Store`] is a cheap, cloneable handle. All access goes through a
//! single connection guarded by an async mutex, so at most one transaction
//! runs at a time and every read observes only committed state.

pub mod migrations;
mod record;
pub mod schema;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::{params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result, StorageContext};

pub use record::{Collection, Record};

/// How long `SQLite` waits on a locked database file before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the persistent store.
///
/// Cloning the handle shares the underlying connection.
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open or create a store with an explicit busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.busy_timeout(busy_timeout).during("configure busy timeout")?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .during("configure journal")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self::from_connection(path, conn))
    }

    /// Create an in-memory store, isolated from every other instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self::from_connection(PathBuf::from(":memory:"), conn))
    }

    fn from_connection(path: PathBuf, conn: Connection) -> Self {
        Self {
            inner: Arc::new(Inner {
                path,
                conn: Mutex::new(conn),
            }),
        }
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Fetch a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the stored document is corrupt.
    pub async fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
        let conn = self.inner.conn.lock().await;
        fetch(&conn, id)
    }

    /// Fetch every record in a collection, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a stored document is corrupt.
    pub async fn get_all<T: Record>(&self) -> Result<Vec<T>> {
        let conn = self.inner.conn.lock().await;
        fetch_where(&conn, None)
    }

    /// Fetch every record whose indexed `field` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if `field` is not indexed for the collection or the
    /// database operation fails.
    pub async fn find_by<T: Record>(&self, field: &str, value: &str) -> Result<Vec<T>> {
        let conn = self.inner.conn.lock().await;
        fetch_where(&conn, Some((field, value)))
    }

    /// Fetch at most `limit` records, sorted descending by the indexed
    /// `order_by` columns, first column first.
    ///
    /// # Errors
    ///
    /// Returns an error if a column is not indexed for the collection or the
    /// database operation fails.
    pub async fn latest<T: Record>(&self, order_by: &[&str], limit: usize) -> Result<Vec<T>> {
        let conn = self.inner.conn.lock().await;
        fetch_latest(&conn, order_by, limit)
    }

    /// Insert or overwrite a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn put<T: Record>(&self, record: &T) -> Result<()> {
        let conn = self.inner.conn.lock().await;
        write(&conn, record)
    }

    /// Delete a record by id.
    ///
    /// Returns `true` if a record was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn delete<T: Record>(&self, id: &str) -> Result<bool> {
        let conn = self.inner.conn.lock().await;
        remove(&conn, T::COLLECTION, id)
    }

    /// Count the records in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn count(&self, collection: Collection) -> Result<i64> {
        let conn = self.inner.conn.lock().await;
        count(&conn, collection)
    }

    /// Run `body` inside a read-write transaction over `scope`.
    ///
    /// Every write staged through the [`Txn`] becomes visible at once when
    /// `body` returns `Ok`. If `body` returns `Err`, nothing is applied and
    /// the error is returned unchanged. Touching a collection outside
    /// `scope` fails with an internal error.
    ///
    /// # Errors
    ///
    /// Returns the body's error, or a storage error if the transaction
    /// cannot begin or commit.
    pub async fn transaction<T, F>(&self, scope: &[Collection], body: F) -> Result<T>
    where
        F: FnOnce(&Txn<'_>) -> Result<T>,
    {
        let mut conn = self.inner.conn.lock().await;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .during("begin transaction")?;
        let txn = Txn {
            tx,
            scope: scope.to_vec(),
        };

        match body(&txn) {
            Ok(value) => {
                txn.tx.commit().during("commit transaction")?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.tx.rollback() {
                    warn!("Rollback failed after aborted transaction: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Get per-collection record counts and file size.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn stats(&self) -> Result<StoreStats> {
        let conn = self.inner.conn.lock().await;
        let db_size_bytes = if self.inner.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.inner.path)
                .map(|m| m.len())
                .unwrap_or(0)
        };

        Ok(StoreStats {
            volunteers: count(&conn, Collection::Volunteers)?,
            materials: count(&conn, Collection::Materials)?,
            activities: count(&conn, Collection::Activities)?,
            db_size_bytes,
        })
    }
}

/// An open read-write transaction.
///
/// Reads observe the transaction's own staged writes; nobody else sees
/// them until [`Store::transaction`] commits.
pub struct Txn<'conn> {
    tx: rusqlite::Transaction<'conn>,
    scope: Vec<Collection>,
}

impl fmt::Debug for Txn<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Txn").field("scope", &self.scope).finish()
    }
}

impl Txn<'_> {
    fn check_scope(&self, collection: Collection) -> Result<()> {
        if self.scope.contains(&collection) {
            Ok(())
        } else {
            Err(Error::internal(format!(
                "collection '{collection}' is not part of this transaction"
            )))
        }
    }

    /// Fetch a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is out of scope or the read fails.
    pub fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
        self.check_scope(T::COLLECTION)?;
        fetch(&self.tx, id)
    }

    /// Fetch a record by id, failing with `NotFound` when absent.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such record exists, or any error from [`Txn::get`].
    pub fn require<T: Record>(&self, id: &str) -> Result<T> {
        self.get(id)?.ok_or_else(|| Error::not_found(T::COLLECTION.entity(), id))
    }

    /// Fetch every record in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is out of scope or the read fails.
    pub fn get_all<T: Record>(&self) -> Result<Vec<T>> {
        self.check_scope(T::COLLECTION)?;
        fetch_where(&self.tx, None)
    }

    /// Fetch every record whose indexed `field` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is out of scope, the field is not
    /// indexed, or the read fails.
    pub fn find_by<T: Record>(&self, field: &str, value: &str) -> Result<Vec<T>> {
        self.check_scope(T::COLLECTION)?;
        fetch_where(&self.tx, Some((field, value)))
    }

    /// Stage an insert-or-overwrite.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is out of scope or the write fails.
    pub fn put<T: Record>(&self, record: &T) -> Result<()> {
        self.check_scope(T::COLLECTION)?;
        write(&self.tx, record)
    }

    /// Stage a delete.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is out of scope or the write fails.
    pub fn delete<T: Record>(&self, id: &str) -> Result<bool> {
        self.check_scope(T::COLLECTION)?;
        remove(&self.tx, T::COLLECTION, id)
    }
}

/// Record counts for the whole store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of volunteers.
    pub volunteers: i64,
    /// Number of materials.
    pub materials: i64,
    /// Number of activities.
    pub activities: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

fn decode<T: Record>(id: &str, doc: &str) -> Result<T> {
    serde_json::from_str(doc).map_err(|source| Error::CorruptRecord {
        collection: T::COLLECTION.table(),
        id: id.to_string(),
        source,
    })
}

fn fetch<T: Record>(conn: &Connection, id: &str) -> Result<Option<T>> {
    let sql = format!("SELECT doc FROM {} WHERE id = ?1", T::COLLECTION.table());
    let doc: Option<String> = conn
        .query_row(&sql, [id], |row| row.get(0))
        .optional()
        .during("get")?;
    doc.map(|doc| decode(id, &doc)).transpose()
}

fn fetch_where<T: Record>(conn: &Connection, filter: Option<(&str, &str)>) -> Result<Vec<T>> {
    let collection = T::COLLECTION;
    let mut sql = format!("SELECT id, doc FROM {}", collection.table());
    let mut params = Vec::new();
    if let Some((field, value)) = filter {
        if !collection.is_indexed(field) {
            return Err(Error::internal(format!(
                "'{field}' is not an indexed field of {collection}"
            )));
        }
        sql.push_str(&format!(" WHERE {field} = ?1"));
        params.push(value);
    }

    let mut stmt = conn.prepare(&sql).during("find")?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .during("find")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .during("find")?;

    rows.iter().map(|(id, doc)| decode(id, doc)).collect()
}

fn fetch_latest<T: Record>(conn: &Connection, order_by: &[&str], limit: usize) -> Result<Vec<T>> {
    let collection = T::COLLECTION;
    if order_by.is_empty() {
        return Err(Error::internal("latest needs at least one ordering column"));
    }
    if let Some(field) = order_by.iter().find(|f| !collection.is_indexed(f)) {
        return Err(Error::internal(format!(
            "'{field}' is not an indexed field of {collection}"
        )));
    }

    let ordering: Vec<String> = order_by.iter().map(|f| format!("{f} DESC")).collect();
    let sql = format!(
        "SELECT id, doc FROM {} ORDER BY {} LIMIT ?1",
        collection.table(),
        ordering.join(", ")
    );
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let mut stmt = conn.prepare(&sql).during("latest")?;
    let rows = stmt
        .query_map([limit], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .during("latest")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .during("latest")?;

    rows.iter().map(|(id, doc)| decode(id, doc)).collect()
}

fn write<T: Record>(conn: &Connection, record: &T) -> Result<()> {
    let collection = T::COLLECTION;
    let doc = serde_json::to_string(record).map_err(|source| Error::CorruptRecord {
        collection: collection.table(),
        id: record.id().to_string(),
        source,
    })?;

    let fields = collection.index_fields();
    let placeholders: Vec<String> = (1..=fields.len() + 2).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT OR REPLACE INTO {} (id, doc, {}) VALUES ({})",
        collection.table(),
        fields.join(", "),
        placeholders.join(", ")
    );

    let mut values = vec![Some(record.id().to_string()), Some(doc)];
    values.extend(record.index_values());
    debug_assert_eq!(values.len(), fields.len() + 2);

    conn.execute(&sql, params_from_iter(values.iter())).during("put")?;
    debug!("Wrote {} record {}", collection, record.id());
    Ok(())
}

fn remove(conn: &Connection, collection: Collection, id: &str) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", collection.table());
    let affected = conn.execute(&sql, [id]).during("delete")?;
    Ok(affected > 0)
}

fn count(conn: &Connection, collection: Collection) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", collection.table());
    conn.query_row(&sql, [], |row| row.get(0)).during("count")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::error::{EntityKind, ErrorKind};
    use crate::model::{
        Material, MaterialStats, MaterialStatus, MaterialType, Ministry, Volunteer, VolunteerStats,
    };

    fn create_test_store() -> Store {
        Store::open_in_memory().expect("failed to create test store")
    }

    fn volunteer(id: &str, name: &str) -> Volunteer {
        Volunteer {
            id: id.to_string(),
            name: name.to_string(),
            phone: None,
            ministry: Ministry::Midia,
            active: true,
            registered_at: Utc::now(),
            active_session: None,
            stats: VolunteerStats::default(),
        }
    }

    fn material(id: &str, name: &str, status: MaterialStatus) -> Material {
        Material {
            id: id.to_string(),
            name: name.to_string(),
            code: None,
            kind: MaterialType::Radio,
            status,
            loaned_to: None,
            loaned_at: None,
            notes: None,
            registered_at: Utc::now(),
            stats: MaterialStats::default(),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = create_test_store();
        store.put(&volunteer("v-1", "Ana")).await.unwrap();

        let fetched: Volunteer = store.get("v-1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Ana");
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let store = create_test_store();
        let fetched: Option<Volunteer> = store.get("missing").await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = create_test_store();
        store.put(&volunteer("v-1", "Ana")).await.unwrap();
        store.put(&volunteer("v-1", "Ana Paula")).await.unwrap();

        let all: Vec<Volunteer> = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Ana Paula");
    }

    #[tokio::test]
    async fn test_returned_values_are_copies() {
        let store = create_test_store();
        store.put(&volunteer("v-1", "Ana")).await.unwrap();

        let mut copy: Volunteer = store.get("v-1").await.unwrap().unwrap();
        copy.name = "Changed".to_string();

        let stored: Volunteer = store.get("v-1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Ana");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = create_test_store();
        store.put(&volunteer("v-1", "Ana")).await.unwrap();

        assert!(store.delete::<Volunteer>("v-1").await.unwrap());
        assert!(!store.delete::<Volunteer>("v-1").await.unwrap());
        assert!(store.get::<Volunteer>("v-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_status_and_holder() {
        let store = create_test_store();
        let mut loaned = material("m-1", "Rádio 1", MaterialStatus::Loaned);
        loaned.loaned_to = Some("v-1".to_string());
        store.put(&loaned).await.unwrap();
        store
            .put(&material("m-2", "Rádio 2", MaterialStatus::Available))
            .await
            .unwrap();

        let available: Vec<Material> = store.find_by("status", "available").await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, "m-2");

        let held: Vec<Material> = store.find_by("loaned_to", "v-1").await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].id, "m-1");
    }

    #[tokio::test]
    async fn test_find_by_name_key_is_lowercase() {
        let store = create_test_store();
        store
            .put(&material("m-1", "Crachá Azul", MaterialStatus::Available))
            .await
            .unwrap();

        let found: Vec<Material> = store.find_by("name_key", "crachá azul").await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_unindexed_field() {
        let store = create_test_store();
        let err = store
            .find_by::<Material>("doc", "x")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_latest_orders_and_limits() {
        let store = create_test_store();
        for (id, name, status) in [
            ("m-1", "Rádio A", MaterialStatus::Available),
            ("m-2", "Rádio B", MaterialStatus::Maintenance),
            ("m-3", "Rádio C", MaterialStatus::Available),
            ("m-4", "Rádio D", MaterialStatus::Maintenance),
        ] {
            store.put(&material(id, name, status)).await.unwrap();
        }

        let top: Vec<Material> = store.latest(&["name_key"], 2).await.unwrap();
        let ids: Vec<_> = top.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m-4", "m-3"]);

        let grouped: Vec<Material> = store.latest(&["status", "name_key"], 10).await.unwrap();
        let ids: Vec<_> = grouped.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m-4", "m-2", "m-3", "m-1"]);

        assert!(store.latest::<Material>(&["name_key"], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_rejects_unindexed_order() {
        let store = create_test_store();
        let err = store.latest::<Material>(&["doc"], 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        let err = store.latest::<Material>(&[], 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_transaction_commits_all_writes() {
        let store = create_test_store();
        store
            .transaction(&[Collection::Volunteers, Collection::Materials], |txn| {
                txn.put(&volunteer("v-1", "Ana"))?;
                txn.put(&material("m-1", "Rádio", MaterialStatus::Available))?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(store.count(Collection::Volunteers).await.unwrap(), 1);
        assert_eq!(store.count(Collection::Materials).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_transaction_error_applies_nothing() {
        let store = create_test_store();
        store.put(&volunteer("v-1", "Ana")).await.unwrap();

        let result: Result<()> = store
            .transaction(&[Collection::Volunteers, Collection::Materials], |txn| {
                let mut v: Volunteer = txn.require("v-1")?;
                v.name = "Changed".to_string();
                txn.put(&v)?;
                txn.put(&material("m-1", "Rádio", MaterialStatus::Available))?;
                Err(Error::business("test", "abort"))
            })
            .await;

        assert!(result.is_err());
        let stored: Volunteer = store.get("v-1").await.unwrap().unwrap();
        assert_eq!(stored.name, "Ana");
        assert_eq!(store.count(Collection::Materials).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transaction_reads_own_writes() {
        let store = create_test_store();
        let name = store
            .transaction(&[Collection::Volunteers], |txn| {
                txn.put(&volunteer("v-1", "Ana"))?;
                let v: Volunteer = txn.require("v-1")?;
                Ok(v.name)
            })
            .await
            .unwrap();
        assert_eq!(name, "Ana");
    }

    #[tokio::test]
    async fn test_transaction_scope_enforced() {
        let store = create_test_store();
        let err = store
            .transaction(&[Collection::Volunteers], |txn| {
                txn.put(&material("m-1", "Rádio", MaterialStatus::Available))
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(store.count(Collection::Materials).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_require_missing() {
        let store = create_test_store();
        let err = store
            .transaction(&[Collection::Volunteers], |txn| {
                txn.require::<Volunteer>("ghost")
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::NotFound {
                entity: EntityKind::Volunteer,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_corrupt_document() {
        let store = create_test_store();
        {
            let conn = store.inner.conn.lock().await;
            conn.execute(
                "INSERT INTO volunteers (id, doc) VALUES ('v-bad', 'not json')",
                [],
            )
            .unwrap();
        }

        let err = store.get::<Volunteer>("v-bad").await.unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { .. }));
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = create_test_store();
        store.put(&volunteer("v-1", "Ana")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.volunteers, 1);
        assert_eq!(stats.materials, 0);
        assert_eq!(stats.activities, 0);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("rollcall.db");

        {
            let store = Store::open(&db_path).unwrap();
            let mut loaned = material("m-1", "Rádio", MaterialStatus::Loaned);
            loaned.loaned_to = Some("v-1".to_string());
            store.put(&loaned).await.unwrap();
            assert_eq!(store.path(), db_path);
        }

        let reopened = Store::open(&db_path).unwrap();
        let m: Material = reopened.get("m-1").await.unwrap().unwrap();
        assert_eq!(m.status, MaterialStatus::Loaned);
        assert_eq!(m.loaned_to.as_deref(), Some("v-1"));
        assert!(reopened.stats().await.unwrap().db_size_bytes > 0);
    }
}
