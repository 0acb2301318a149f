//! Error kinds shared by the pool, the queues and both pipelines.

use thiserror::Error;

/// Errors reported by thread-context operations.
///
/// Interrupt handlers never return these; they apply the drop/replay policy
/// and bump [`StreamStats`](crate::io::StreamStats) counters instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// The buffer pool has no free chunk left.
    #[error("buffer pool exhausted")]
    PoolExhausted,

    /// The hand-off queue has no free slot.
    #[error("queue full")]
    QueueFull,

    /// The hand-off queue holds no chunk.
    #[error("queue empty")]
    QueueEmpty,

    /// A chunk handle was given to a pool it does not belong to.
    #[error("chunk handle does not belong to this pool")]
    InvalidHandle,

    /// The receive pipeline was never started, so no chunk will ever arrive.
    #[error("stream not started")]
    NotStarted,

    /// A used length the operation cannot take: above capacity for a chunk,
    /// or empty or odd for transmit.
    #[error("invalid length {len} for chunk capacity {capacity}")]
    InvalidLength {
        /// Requested length in bytes.
        len: usize,
        /// Chunk capacity in bytes.
        capacity: usize,
    },

    /// An interrupt source already has a handler registered.
    #[error("interrupt source already has a handler")]
    SourceInUse,
}
