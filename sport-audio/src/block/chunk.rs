use crate::constants::{CHUNK_BYTES, CHUNK_SAMPLES};
use crate::error::StreamError;

/// Lifecycle tag carried by every chunk.
///
/// Advisory only: exclusivity is enforced by the pool and the queues, never
/// by reading this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    /// Freshly acquired from the pool.
    Start,
    /// Engaged with the transfer engine.
    InProgress,
    /// Filled by the transfer engine.
    Complete,
    /// Sitting on the pool's free-list.
    Free,
}

/// Fixed-capacity audio buffer: 1024 signed 16-bit samples plus a used
/// length in bytes.
///
/// Word-aligned so the storage can be handed to a DMA engine directly.
#[repr(C, align(4))]
pub struct Chunk {
    samples: [i16; CHUNK_SAMPLES],
    len: usize,
    status: ChunkStatus,
}

impl Chunk {
    /// Create an empty, zero-filled chunk.
    pub const fn new() -> Self {
        Chunk {
            samples: [0i16; CHUNK_SAMPLES],
            len: 0,
            status: ChunkStatus::Free,
        }
    }

    /// Capacity in bytes.
    pub const fn capacity(&self) -> usize {
        CHUNK_BYTES
    }

    /// Used length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set the used length in bytes.
    ///
    /// Fails with [`StreamError::InvalidLength`] if `len` exceeds the capacity.
    pub fn set_len(&mut self, len: usize) -> Result<(), StreamError> {
        if len > CHUNK_BYTES {
            return Err(StreamError::InvalidLength {
                len,
                capacity: CHUNK_BYTES,
            });
        }
        self.len = len;
        Ok(())
    }

    pub fn status(&self) -> ChunkStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ChunkStatus) {
        self.status = status;
    }

    /// Reset to the state the pool hands out: empty, status `Start`.
    ///
    /// The sample storage is left as is.
    pub fn reset(&mut self) {
        self.len = 0;
        self.status = ChunkStatus::Start;
    }

    /// Mark the whole capacity as filled by the transfer engine.
    pub fn mark_complete(&mut self) {
        self.len = CHUNK_BYTES;
        self.status = ChunkStatus::Complete;
    }

    /// All samples, regardless of the used length.
    pub fn samples(&self) -> &[i16; CHUNK_SAMPLES] {
        &self.samples
    }

    /// All samples, regardless of the used length.
    pub fn samples_mut(&mut self) -> &mut [i16; CHUNK_SAMPLES] {
        &mut self.samples
    }

    /// Samples covered by the used length (a trailing odd byte is not a sample).
    pub fn used_samples(&self) -> &[i16] {
        &self.samples[..self.len / 2]
    }

    pub fn used_samples_mut(&mut self) -> &mut [i16] {
        let n = self.len / 2;
        &mut self.samples[..n]
    }

    /// Byte view of the full storage.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `[i16; N]` is `2 * N` initialized bytes with no padding.
        unsafe { core::slice::from_raw_parts(self.samples.as_ptr().cast::<u8>(), CHUNK_BYTES) }
    }

    /// Mutable byte view of the full storage.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: every byte pattern is a valid `i16`, and the borrow is exclusive.
        unsafe {
            core::slice::from_raw_parts_mut(self.samples.as_mut_ptr().cast::<u8>(), CHUNK_BYTES)
        }
    }

    /// Bytes covered by the used length.
    pub fn data(&self) -> &[u8] {
        &self.as_bytes()[..self.len]
    }

    /// Copy `bytes` into the chunk and set the used length to match.
    pub fn fill_from(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        self.set_len(bytes.len())?;
        self.as_bytes_mut()[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Copy the used bytes and used length of `src` into `self`.
    ///
    /// The status of `self` is not touched.
    pub fn copy_from(&mut self, src: &Chunk) {
        let len = src.len;
        self.as_bytes_mut()[..len].copy_from_slice(&src.as_bytes()[..len]);
        self.len = len;
    }
}

impl Default for Chunk {
    fn default() -> Self {
        Self::new()
    }
}
