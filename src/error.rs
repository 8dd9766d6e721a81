//! Error taxonomy for queue operations.

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Queue errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The item (or something nested inside it) has no stored encoding.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Singular peek/pop on a queue with no rows.
    #[error("queue is empty")]
    EmptyQueue,

    /// The handle was closed; its connection is gone.
    #[error("queue is closed")]
    QueueClosed,

    /// A stored row cannot be decoded. The database was written by something
    /// other than this crate, or has been damaged.
    #[error("corrupted row (type {tag:?}): {reason}")]
    Corrupted { tag: String, reason: String },

    /// SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn corrupted(tag: impl Into<String>, reason: impl ToString) -> Self {
        Self::Corrupted {
            tag: tag.into(),
            reason: reason.to_string(),
        }
    }

    /// True for the normal "nothing to take" signal.
    pub fn is_empty_queue(&self) -> bool {
        matches!(self, Self::EmptyQueue)
    }

    /// True when the operation hit a closed handle.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::QueueClosed)
    }
}
