//! The queue handle.
//!
//! Every operation that touches the database goes through [`FifoQueue::guarded`]
//! (or its `_mut` twin), which is the only place the live store is reached.
//! Once the handle is closed the store is gone and the guard answers
//! [`Error::QueueClosed`] for anything that follows.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::codec::{self, Decoded};
use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crate::sqlite::{absolute_path, QueueStore, StoredRow};
use crate::value::{Item, Value};

/// A durable FIFO queue backed by one SQLite file.
#[derive(Debug)]
pub struct FifoQueue {
    path: PathBuf,
    config: QueueConfig,
    store: Option<QueueStore>,
}

impl FifoQueue {
    /// Open or create the queue described by `config`.
    pub fn open(config: QueueConfig) -> Result<Self> {
        Self::open_with_items(config, std::iter::empty::<Item>())
    }

    /// Open the queue and push an initial batch. The batch is all-or-nothing.
    pub fn open_with_items<I>(config: QueueConfig, items: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        // Encode before touching the disk so a bad item leaves no trace.
        let rows = encode_all(items)?;
        let path = absolute_path(&config.path)?;
        let mut store = QueueStore::open(&path, config.overwrite, config.busy_timeout_ms)?;
        if !rows.is_empty() {
            store.append(&rows)?;
        }
        debug!(path = %path.display(), initial = rows.len(), "opened queue");
        Ok(Self {
            path,
            config,
            store: Some(store),
        })
    }

    /// Absolute path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// True until `close` has been called.
    pub fn is_open(&self) -> bool {
        self.store.is_some()
    }

    fn guarded<T>(&self, op: impl FnOnce(&QueueStore) -> Result<T>) -> Result<T> {
        match &self.store {
            Some(store) => op(store),
            None => Err(Error::QueueClosed),
        }
    }

    fn guarded_mut<T>(&mut self, op: impl FnOnce(&mut QueueStore) -> Result<T>) -> Result<T> {
        match &mut self.store {
            Some(store) => op(store),
            None => Err(Error::QueueClosed),
        }
    }

    /// Number of items in the queue.
    pub fn len(&self) -> Result<usize> {
        self.guarded(QueueStore::size)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Append one item at the tail.
    pub fn push(&mut self, item: impl Into<Item>) -> Result<()> {
        self.pushes(std::iter::once(item))
    }

    /// Append items in order. If any item fails to encode nothing is stored.
    pub fn pushes<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<Item>,
    {
        let rows = encode_all(items)?;
        self.guarded_mut(|store| store.append(&rows))
    }

    /// Append a dynamically typed JSON value. `null`, booleans and integers
    /// beyond `i64` are rejected with [`Error::UnsupportedType`].
    pub fn push_json(&mut self, json: serde_json::Value) -> Result<()> {
        let value = Value::try_from(json)?;
        self.push(value)
    }

    /// The head item, left in place.
    pub fn peek(&self) -> Result<Value> {
        first(self.peeks(1)?)
    }

    /// Up to `n` items from the head, left in place.
    pub fn peeks(&self, n: usize) -> Result<Vec<Value>> {
        self.peek_decoded(n, false)
            .map(|items| items.into_iter().map(Decoded::into_value).collect())
    }

    /// The head item and its retry counter, left in place.
    pub fn peek_retry(&self) -> Result<(Value, i64)> {
        let default_max_try = self.config.default_max_try;
        first(self.peek_decoded(1, true)?).map(|d| d.into_retry(default_max_try))
    }

    /// Remove and return the head item.
    pub fn pop(&mut self) -> Result<Value> {
        first(self.pops(1)?)
    }

    /// Remove and return up to `n` items from the head in one transaction.
    pub fn pops(&mut self, n: usize) -> Result<Vec<Value>> {
        self.take_decoded(n, false)
            .map(|items| items.into_iter().map(Decoded::into_value).collect())
    }

    /// Remove the head item and return it with its retry counter. Plain items
    /// report the configured `default_max_try`.
    pub fn pop_retry(&mut self) -> Result<(Value, i64)> {
        first(self.pops_retry(1)?)
    }

    /// Batch form of [`pop_retry`](Self::pop_retry).
    pub fn pops_retry(&mut self, n: usize) -> Result<Vec<(Value, i64)>> {
        let default_max_try = self.config.default_max_try;
        self.take_decoded(n, true).map(|items| {
            items
                .into_iter()
                .map(|d| d.into_retry(default_max_try))
                .collect()
        })
    }

    fn peek_decoded(&self, n: usize, retry_mode: bool) -> Result<Vec<Decoded>> {
        let default_max_try = self.config.default_max_try;
        self.guarded(|store| {
            store
                .read_prefix(n)?
                .iter()
                .map(|row| decode_row(row, retry_mode, default_max_try))
                .collect()
        })
    }

    fn take_decoded(&mut self, n: usize, retry_mode: bool) -> Result<Vec<Decoded>> {
        let default_max_try = self.config.default_max_try;
        self.guarded_mut(|store| {
            store.take_prefix(n, |row| decode_row(row, retry_mode, default_max_try))
        })
    }

    /// Destructive iterator: each step pops the head item. It ends when the
    /// queue is empty and cannot be restarted.
    pub fn drain(&mut self) -> Drain<'_> {
        Drain {
            queue: self,
            done: false,
        }
    }

    /// Close using the configured `remove_on_close`.
    pub fn close(&mut self) -> Result<()> {
        self.close_with(self.config.remove_on_close)
    }

    /// Release the connection. When `remove_if_empty` is set and the queue
    /// holds nothing, the backing file is deleted as well.
    pub fn close_with(&mut self, remove_if_empty: bool) -> Result<()> {
        let size = self.len()?;
        if let Some(store) = self.store.take() {
            store.close()?;
        }
        debug!(path = %self.path.display(), size, "closed queue");
        if size == 0 && remove_if_empty {
            std::fs::remove_file(&self.path).map_err(|e| {
                warn!(path = %self.path.display(), error = %e, "failed to remove queue file");
                Error::io(format!("removing {}", self.path.display()), e)
            })?;
            debug!(path = %self.path.display(), "removed empty queue file");
        }
        Ok(())
    }
}

impl PartialEq for FifoQueue {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for FifoQueue {}

impl<'a> IntoIterator for &'a mut FifoQueue {
    type Item = Result<Value>;
    type IntoIter = Drain<'a>;

    fn into_iter(self) -> Drain<'a> {
        self.drain()
    }
}

/// Iterator returned by [`FifoQueue::drain`].
///
/// Yields `Ok(item)` until the queue is empty, then `None`. Any other error
/// is yielded once, after which the iterator is finished.
#[derive(Debug)]
pub struct Drain<'a> {
    queue: &'a mut FifoQueue,
    done: bool,
}

impl Iterator for Drain<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.queue.pop() {
            Ok(value) => Some(Ok(value)),
            Err(Error::EmptyQueue) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Drain<'_> {}

fn encode_all<I>(items: I) -> Result<Vec<codec::EncodedItem>>
where
    I: IntoIterator,
    I::Item: Into<Item>,
{
    items
        .into_iter()
        .map(|item| codec::encode(&item.into()))
        .collect()
}

fn decode_row(row: &StoredRow, retry_mode: bool, default_max_try: i64) -> Result<Decoded> {
    codec::decode(&row.text, &row.tag, retry_mode, default_max_try).map_err(|e| {
        warn!(id = row.id, error = %e, "undecodable queue row");
        e
    })
}

fn first<T>(items: Vec<T>) -> Result<T> {
    items.into_iter().next().ok_or(Error::EmptyQueue)
}
