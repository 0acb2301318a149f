use core::fmt;
use core::ops::{Deref, DerefMut};

use super::chunk::Chunk;
use super::pool::BufferPool;

/// Exclusive handle to one chunk of a [`BufferPool`].
///
/// There is exactly one `ChunkHandle` per handed-out slot. It is move-only,
/// derefs to the underlying [`Chunk`], and returns the slot to the pool's
/// free-list when dropped.
pub struct ChunkHandle<'p, const N: usize> {
    pool: &'p BufferPool<N>,
    slot: u8,
}

impl<'p, const N: usize> ChunkHandle<'p, N> {
    /// The caller must have just claimed `slot` in `pool`.
    pub(crate) fn new(pool: &'p BufferPool<N>, slot: u8) -> Self {
        ChunkHandle { pool, slot }
    }

    /// Get the pool slot index.
    pub fn slot(&self) -> u8 {
        self.slot
    }

    /// Whether this handle was acquired from `pool`.
    pub fn belongs_to(&self, pool: &BufferPool<N>) -> bool {
        core::ptr::eq(self.pool, pool)
    }
}

impl<const N: usize> Deref for ChunkHandle<'_, N> {
    type Target = Chunk;

    fn deref(&self) -> &Chunk {
        // SAFETY: We are the unique handle for this slot.
        unsafe { &*self.pool.chunk_ptr(self.slot) }
    }
}

impl<const N: usize> DerefMut for ChunkHandle<'_, N> {
    fn deref_mut(&mut self) -> &mut Chunk {
        // SAFETY: We are the unique handle for this slot.
        unsafe { &mut *self.pool.chunk_ptr(self.slot) }
    }
}

impl<const N: usize> Drop for ChunkHandle<'_, N> {
    fn drop(&mut self) {
        self.pool.free(self.slot);
    }
}

impl<const N: usize> fmt::Debug for ChunkHandle<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkHandle")
            .field("slot", &self.slot)
            .field("len", &self.len())
            .field("status", &self.status())
            .finish()
    }
}
