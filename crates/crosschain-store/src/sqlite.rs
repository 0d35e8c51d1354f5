//! SQLite implementation of the KvStore trait.
//!
//! This is the persistent backend. It uses rusqlite with bundled SQLite;
//! every batch is applied inside one SQLite transaction.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{prefix_upper_bound, BatchOp, KvStore, WriteBatch};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
#[derive(Clone)]
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }

    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut conn)
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.with_conn(|conn| {
            let rows = match prefix_upper_bound(prefix) {
                Some(upper) => {
                    let mut stmt = conn.prepare(
                        "SELECT key, value FROM kv WHERE key >= ?1 AND key < ?2 ORDER BY key",
                    )?;
                    let rows: Vec<(Vec<u8>, Vec<u8>)> = stmt
                        .query_map(params![prefix, upper], |row| Ok((row.get(0)?, row.get(1)?)))?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt =
                        conn.prepare("SELECT key, value FROM kv WHERE key >= ?1 ORDER BY key")?;
                    let rows: Vec<(Vec<u8>, Vec<u8>)> = stmt
                        .query_map(params![prefix], |row| Ok((row.get(0)?, row.get(1)?)))?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(rows)
        })
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for op in batch.into_ops() {
                match op {
                    BatchOp::Put { key, value } => {
                        tx.execute(
                            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                            params![key, value],
                        )?;
                    }
                    BatchOp::Delete { key } => {
                        tx.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                    }
                }
            }
            tx.commit()?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_get_put_delete() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        store.put(b"a", b"1").unwrap();
        store.put(b"a", b"2").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"2".to_vec()));
        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
    }

    #[test]
    fn test_scan_prefix_with_max_byte() {
        let store = SqliteStore::open_memory().unwrap();
        let mut batch = WriteBatch::new();
        batch.put(vec![0xff, 1], b"a".to_vec());
        batch.put(vec![0xff, 0xff], b"b".to_vec());
        batch.put(vec![0xfe], b"c".to_vec());
        store.write_batch(batch).unwrap();

        assert_eq!(store.scan_prefix(&[0xff]).unwrap().len(), 2);
        assert_eq!(store.scan_prefix(&[0xff, 0xff]).unwrap().len(), 1);
        assert_eq!(store.scan_prefix(&[]).unwrap().len(), 3);
    }

    #[test]
    fn test_batch_is_applied_in_order() {
        let store = SqliteStore::open_memory().unwrap();
        let mut batch = WriteBatch::new();
        batch.put(b"k".to_vec(), b"1".to_vec());
        batch.delete(b"k".to_vec());
        batch.put(b"j".to_vec(), b"2".to_vec());
        store.write_batch(batch).unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
        assert_eq!(store.get(b"j").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notarisations.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.put(b"Bkey", b"value").unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get(b"Bkey").unwrap(), Some(b"value".to_vec()));
    }

    #[test]
    fn test_open_refuses_foreign_value_encoding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notarisations.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .with_conn(|conn| {
                    conn.execute("UPDATE meta SET value = 'json' WHERE name = 'value_encoding'", [])?;
                    Ok(())
                })
                .unwrap();
        }
        assert!(matches!(SqliteStore::open(&path), Err(StoreError::Migration(_))));
    }
}
