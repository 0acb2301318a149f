use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::StreamError;

use super::chunk::{Chunk, ChunkStatus};
use super::handle::ChunkHandle;

/// Lock-free fixed-size pool of [`Chunk`]s.
///
/// The free-list is an atomic bitmap: bit `i` set means slot `i` is handed
/// out. Acquire and release are a single compare-exchange / fetch-and, so both
/// are safe to call from an interrupt handler and never block.
///
/// `N` must be in `1..=32`.
pub struct BufferPool<const N: usize> {
    /// Bitmap: bit N = 1 means slot N is allocated.
    bitmap: AtomicU32,
    storage: [UnsafeCell<Chunk>; N],
}

// SAFETY: The bitmap is only touched atomically. A storage slot is only
// dereferenced through the unique `ChunkHandle` that claimed it.
unsafe impl<const N: usize> Sync for BufferPool<N> {}

impl<const N: usize> BufferPool<N> {
    const SLOT_MASK: u32 = if N == 32 { u32::MAX } else { (1u32 << N) - 1 };

    /// Create a pool with every chunk on the free-list.
    ///
    /// `const` so the pool can live in a `static`.
    pub const fn new() -> Self {
        assert!(N >= 1 && N <= 32, "buffer pool holds between 1 and 32 chunks");

        BufferPool {
            bitmap: AtomicU32::new(0),
            storage: [const { UnsafeCell::new(Chunk::new()) }; N],
        }
    }

    /// Take a chunk off the free-list. Returns `None` if the pool is exhausted.
    ///
    /// The chunk comes back with `len = 0` and status `Start`; its sample
    /// storage is not cleared.
    pub fn acquire(&self) -> Option<ChunkHandle<'_, N>> {
        let slot = self.claim()?;
        // SAFETY: We just exclusively claimed this slot via the bitmap CAS.
        unsafe { (*self.chunk_ptr(slot)).reset() };
        Some(ChunkHandle::new(self, slot))
    }

    /// Return a chunk to the free-list.
    ///
    /// A handle that was acquired from a different pool is rejected with
    /// [`StreamError::InvalidHandle`]; it still goes back to the pool it came
    /// from, so nothing leaks.
    pub fn release(&self, handle: ChunkHandle<'_, N>) -> Result<(), StreamError> {
        if !handle.belongs_to(self) {
            return Err(StreamError::InvalidHandle);
        }
        drop(handle);
        Ok(())
    }

    /// `true` if no chunk is left on the free-list.
    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Number of chunks on the free-list.
    pub fn available(&self) -> usize {
        N - self.outstanding()
    }

    /// Number of chunks currently handed out.
    pub fn outstanding(&self) -> usize {
        self.bitmap.load(Ordering::Acquire).count_ones() as usize
    }

    /// Total number of chunks owned by the pool.
    pub const fn capacity(&self) -> usize {
        N
    }

    fn claim(&self) -> Option<u8> {
        loop {
            let bitmap = self.bitmap.load(Ordering::Acquire);
            let free = !bitmap & Self::SLOT_MASK;
            if free == 0 {
                return None;
            }
            let slot = free.trailing_zeros();
            let bit = 1u32 << slot;
            match self.bitmap.compare_exchange_weak(
                bitmap,
                bitmap | bit,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(slot as u8),
                Err(_) => continue, // an interrupt raced us, retry
            }
        }
    }

    /// Put `slot` back on the free-list. Called from `ChunkHandle::drop`.
    pub(crate) fn free(&self, slot: u8) {
        debug_assert!((slot as usize) < N);
        let bit = 1u32 << (slot as u32);
        debug_assert!(
            self.bitmap.load(Ordering::Acquire) & bit != 0,
            "free of a slot that is not handed out"
        );
        // SAFETY: The caller is the unique handle for this slot.
        unsafe { (*self.chunk_ptr(slot)).set_status(ChunkStatus::Free) };
        self.bitmap.fetch_and(!bit, Ordering::Release);
    }

    /// Pointer to the chunk stored in `slot`.
    ///
    /// # Safety
    /// The caller must own the slot (hold its unique handle) for as long as
    /// the pointer is dereferenced.
    pub(crate) unsafe fn chunk_ptr(&self, slot: u8) -> *mut Chunk {
        self.storage[slot as usize].get()
    }
}

impl<const N: usize> Default for BufferPool<N> {
    fn default() -> Self {
        Self::new()
    }
}
