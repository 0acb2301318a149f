//! Fixed-capacity chunks and the pool that owns them.
//!
//! Every [`Chunk`] lives inside a [`BufferPool`] for the whole lifetime of the
//! program. Code outside the pool only ever holds a [`ChunkHandle`], which is
//! move-only and returns its chunk to the free-list when dropped.

pub mod chunk;
pub mod handle;
pub mod pool;

pub use chunk::{Chunk, ChunkStatus};
pub use handle::ChunkHandle;
pub use pool::BufferPool;
