//! Durable first-in-first-out queue backed by a single SQLite file.
//!
//! # Intention
//!
//! - Items pushed at the tail survive process restarts; items are taken from
//!   the head in insertion order.
//! - Each item keeps its type across the round trip (`int`, `float`, `str`,
//!   `list`, `dict`), and may carry an opaque retry counter.
//!
//! # Architectural Boundaries
//!
//! - `codec` knows how items look as text, nothing about storage.
//! - `sqlite` knows the table and its SQL, nothing about item types.
//! - `queue` composes the two behind a handle that refuses all work once closed.
//!
//! ```no_run
//! use rust_fifoqueue::{FifoQueue, QueueConfig, RetryItem, Value};
//!
//! # fn main() -> rust_fifoqueue::Result<()> {
//! let mut queue = FifoQueue::open(QueueConfig::new("jobs.db"))?;
//! queue.push(1)?;
//! queue.push(RetryItem::new("fetch", 3))?;
//! assert_eq!(queue.pop()?, Value::Int(1));
//! let (job, again) = queue.pop_retry()?;
//! # let _ = (job, again);
//! queue.close()?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod queue;
pub mod sqlite;
pub mod value;

pub use codec::{decode, encode, Decoded, EncodedItem, TypeTag};
pub use config::QueueConfig;
pub use error::{Error, Result};
pub use queue::{Drain, FifoQueue};
pub use value::{Item, RetryItem, Value};
