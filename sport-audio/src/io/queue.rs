//! Lock-free single-producer single-consumer bounded FIFO.
//!
//! Connects an interrupt handler to thread-context code. The indices run over
//! `0..2K` and address slot `index % K`, so all `K` slots are usable and a
//! full queue (`tail - head == K`) is distinct from an empty one.
//!
//! # Safety Contract
//!
//! - Only ONE context may call [`try_put()`](BoundedQueue::try_put) (the "producer").
//! - Only ONE context may call [`try_get()`](BoundedQueue::try_get) (the "consumer").
//! - These may be an interrupt handler and a thread preempting each other.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicUsize, Ordering};

/// A bounded single-producer single-consumer queue of capacity `K`.
///
/// # Type Parameters
///
/// - `T`: The element type. Must be `Send` for cross-context safety.
/// - `K`: Capacity. Must be ≥ 1.
pub struct BoundedQueue<T, const K: usize> {
    buffer: [UnsafeCell<MaybeUninit<T>>; K],
    /// Next index to read, in `0..2K` (only advanced by the consumer).
    head: AtomicUsize,
    /// Next index to write, in `0..2K` (only advanced by the producer).
    tail: AtomicUsize,
}

// SAFETY: T: Send is required because values cross thread/ISR boundaries.
// The SPSC contract ensures head and tail each have a single writer, and
// acquire/release ordering publishes slot writes before the index moves.
unsafe impl<T: Send, const K: usize> Sync for BoundedQueue<T, K> {}
unsafe impl<T: Send, const K: usize> Send for BoundedQueue<T, K> {}

impl<T, const K: usize> BoundedQueue<T, K> {
    /// Create a new empty queue.
    ///
    /// # Panics
    ///
    /// Compile-time assertion: `K` must be at least 1.
    pub const fn new() -> Self {
        assert!(K >= 1, "bounded queue needs at least one slot");

        BoundedQueue {
            buffer: [const { UnsafeCell::new(MaybeUninit::uninit()) }; K],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Append `val` at the tail (producer side).
    ///
    /// Returns `Err(val)` if the queue is full, handing ownership back to the
    /// caller, who decides whether to drop, retry or block.
    pub fn try_put(&self, val: T) -> Result<(), T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if Self::distance(head, tail) >= K {
            return Err(val);
        }

        // SAFETY: We are the sole producer and `tail` is only advanced by us.
        // Fewer than K items are live, so this slot is not held by the consumer.
        unsafe {
            (*self.buffer[tail % K].get()).write(val);
        }

        // Release ordering ensures the slot write is visible before tail advances.
        self.tail.store(Self::advance(tail), Ordering::Release);
        Ok(())
    }

    /// Remove the item at the head (consumer side).
    ///
    /// Returns `None` if the queue is empty.
    pub fn try_get(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);

        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: We are the sole consumer and `head` is only advanced by us.
        // `head != tail` guarantees this slot contains a valid value.
        let val = unsafe { (*self.buffer[head % K].get()).assume_init_read() };

        // Release ordering ensures the read completes before the slot is
        // handed back to the producer.
        self.head.store(Self::advance(head), Ordering::Release);
        Some(val)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= K
    }

    /// Return the number of items currently in the queue.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        Self::distance(head, tail)
    }

    pub const fn capacity(&self) -> usize {
        K
    }

    const fn advance(index: usize) -> usize {
        (index + 1) % (2 * K)
    }

    const fn distance(head: usize, tail: usize) -> usize {
        (tail + 2 * K - head) % (2 * K)
    }
}

impl<T, const K: usize> Default for BoundedQueue<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const K: usize> Drop for BoundedQueue<T, K> {
    fn drop(&mut self) {
        // Drop any remaining items; for chunk handles this returns them to the pool.
        while self.try_get().is_some() {}
    }
}
