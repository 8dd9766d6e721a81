use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, TransactionBehavior};
use tracing::debug;

use crate::codec::EncodedItem;
use crate::error::{Error, Result};

// Rows are only ever inserted at the tail or deleted from the head.
// AUTOINCREMENT keeps ids from being reused after the tail row is popped.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "fifoqueue" (
    "id" INTEGER PRIMARY KEY AUTOINCREMENT,
    "item" TEXT NOT NULL,
    "type" TEXT NOT NULL
);
"#;

const SQL_PUSH: &str = r#"INSERT INTO "fifoqueue" ("item", "type") VALUES (?1, ?2)"#;
const SQL_LEN: &str = r#"SELECT COUNT("id") FROM "fifoqueue""#;
const SQL_PEEKS: &str =
    r#"SELECT "id", "item", "type" FROM "fifoqueue" ORDER BY "id" ASC LIMIT ?1"#;
const SQL_DELETE_PREFIX: &str = r#"DELETE FROM "fifoqueue" WHERE "id" IN
    (SELECT "id" FROM "fifoqueue" ORDER BY "id" ASC LIMIT ?1)"#;
const SQL_DELETE_THROUGH: &str = r#"DELETE FROM "fifoqueue" WHERE "id" <= ?1"#;

/// A raw row as read from the table
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: i64,
    pub text: String,
    pub tag: String,
}

/// Owns the connection to one queue file
#[derive(Debug)]
pub struct QueueStore {
    conn: Connection,
}

/// Resolve `path` against the working directory without touching the disk.
/// `..` is folded lexically, so the file need not exist yet.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .map_err(|e| Error::io(format!("resolving {}", path.display()), e))?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

// SQLite keeps these next to the database file.
const SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .map_err(|e| Error::io(format!("removing {}", path.display()), e))?;
    }
    Ok(())
}

fn limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl QueueStore {
    /// Open (creating if needed) the queue file at an absolute path.
    pub fn open(path: &Path, overwrite: bool, busy_timeout_ms: u64) -> Result<Self> {
        if overwrite {
            debug!(path = %path.display(), "overwriting existing queue file");
            remove_if_exists(path)?;
            for suffix in SIDECAR_SUFFIXES {
                remove_if_exists(&sidecar_path(path, suffix))?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
        Self::with_connection(conn)
    }

    /// Wrap an already open connection, creating the schema if absent.
    pub fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Number of live rows.
    pub fn size(&self) -> Result<usize> {
        let size: i64 = self.conn.query_row(SQL_LEN, [], |row| row.get(0))?;
        Ok(usize::try_from(size).unwrap_or(0))
    }

    /// Insert a batch at the tail in one transaction.
    pub fn append(&mut self, rows: &[EncodedItem]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(SQL_PUSH)?;
            for row in rows {
                stmt.execute(params![row.text, row.tag.as_str()])?;
            }
        }
        tx.commit()?;
        debug!(count = rows.len(), "appended rows");
        Ok(())
    }

    /// The `n` oldest rows, oldest first.
    pub fn read_prefix(&self, n: usize) -> Result<Vec<StoredRow>> {
        read_rows(&self.conn, n)
    }

    /// Remove the `n` oldest rows (or all of them). Returns how many went.
    pub fn delete_prefix(&self, n: usize) -> Result<usize> {
        Ok(self.conn.execute(SQL_DELETE_PREFIX, params![limit(n)])?)
    }

    /// Read, convert and delete the `n` oldest rows as one transaction.
    ///
    /// The write lock is taken before the read, so the deleted set is
    /// exactly the set that was read. If `convert` fails on any row the
    /// transaction rolls back and nothing is removed.
    pub fn take_prefix<T>(
        &mut self,
        n: usize,
        mut convert: impl FnMut(&StoredRow) -> Result<T>,
    ) -> Result<Vec<T>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let rows = read_rows(&tx, n)?;
        let items = rows.iter().map(&mut convert).collect::<Result<Vec<_>>>()?;
        if let Some(last) = rows.last() {
            tx.execute(SQL_DELETE_THROUGH, params![last.id])?;
        }
        tx.commit()?;
        Ok(items)
    }

    /// Release the connection.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::Sqlite(e))
    }
}

fn read_rows(conn: &Connection, n: usize) -> Result<Vec<StoredRow>> {
    if n == 0 {
        return Ok(Vec::new());
    }
    let mut stmt = conn.prepare_cached(SQL_PEEKS)?;
    let rows = stmt.query_map(params![limit(n)], |row| {
        Ok(StoredRow {
            id: row.get(0)?,
            text: row.get(1)?,
            tag: row.get(2)?,
        })
    })?;
    let mut result = Vec::new();
    for row in rows {
        result.push(row?);
    }
    Ok(result)
}
