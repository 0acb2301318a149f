//! Transmit half: caller's chunks in, DMA playback out.
//!
//! ## Architecture
//!
//! ```text
//! caller's Chunk ──put()──► BoundedQueue ──isr()──► pending chunk ──DMA──► SPORT TX
//!        │ copy                                         │
//!        └────────── BufferPool ◄──── superseded ───────┘
//! ```
//!
//! The first chunk bypasses the queue and starts the stream. After that the
//! interrupt half swaps in the next queued chunk on every completion, or
//! replays the current one when the queue has run dry. The thread half blocks
//! while the queue is full rather than drop output.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use log::{debug, info, warn};

use crate::block::{BufferPool, Chunk, ChunkHandle, ChunkStatus};
use crate::error::StreamError;
use crate::power::{PowerControl, PowerMode};

use super::engine::{arm, Engaged, TransferEngine};
use super::queue::BoundedQueue;
use super::stats::StreamStats;

/// DMA-driven transmit pipeline.
///
/// [`put()`](Self::put) runs in thread context and is the queue's only
/// producer; [`isr()`](Self::isr) runs in interrupt context and is its only
/// consumer.
pub struct TransmitPipeline<'p, E, const N: usize, const K: usize> {
    pool: &'p BufferPool<N>,
    queue: BoundedQueue<ChunkHandle<'p, N>, K>,
    engaged: Mutex<RefCell<Engaged<'p, E, N>>>,
    running: AtomicBool,
    stats: StreamStats,
}

impl<'p, E: TransferEngine, const N: usize, const K: usize> TransmitPipeline<'p, E, N, K> {
    /// Create a stopped pipeline drawing chunks from `pool`.
    pub const fn new(pool: &'p BufferPool<N>, engine: E) -> Self {
        TransmitPipeline {
            pool,
            queue: BoundedQueue::new(),
            engaged: Mutex::new(RefCell::new(Engaged::new(engine))),
            running: AtomicBool::new(false),
            stats: StreamStats::new(),
        }
    }

    /// Queue a copy of `src` for playback, sleeping while the queue is full.
    ///
    /// The first call starts the stream with `src` directly. `src` itself is
    /// never retained.
    ///
    /// # Errors
    ///
    /// - [`StreamError::InvalidLength`] if `src` is empty or holds a partial
    ///   sample. Checked before any wait.
    /// - [`StreamError::PoolExhausted`] if no chunk is free for the copy.
    /// - [`StreamError::QueueFull`] if the queue filled up again between the
    ///   wait and the enqueue. The copy is released.
    pub fn put<P: PowerControl>(&self, src: &Chunk, power: &mut P) -> Result<(), StreamError> {
        check_playable(src)?;

        if self.queue.is_full() {
            debug!("tx: queue full, waiting for transfer");
            while self.queue.is_full() {
                power.request_mode(PowerMode::Active);
                power.wait_for_interrupt();
            }
            power.request_mode(PowerMode::FullOn);
        }

        self.try_put(src)
    }

    /// Non-blocking [`put()`](Self::put): a full queue is [`StreamError::QueueFull`].
    pub fn try_put(&self, src: &Chunk) -> Result<(), StreamError> {
        check_playable(src)?;

        let mut chunk = self.pool.acquire().ok_or_else(|| {
            warn!("tx: no free chunk, {} bytes not queued", src.len());
            StreamError::PoolExhausted
        })?;
        chunk.copy_from(src);

        if !self.is_running() {
            self.kick_off(chunk);
            return Ok(());
        }

        match self.queue.try_put(chunk) {
            Ok(()) => Ok(()),
            Err(rejected) => {
                self.pool.release(rejected)?;
                Err(StreamError::QueueFull)
            }
        }
    }

    /// Make `chunk` pending and start the serial port.
    fn kick_off(&self, mut chunk: ChunkHandle<'p, N>) {
        chunk.set_status(ChunkStatus::InProgress);
        let samples = chunk.len() / 2;
        let slot = chunk.slot();

        critical_section::with(|cs| {
            let engaged = &mut *self.engaged.borrow_ref_mut(cs);
            let pending = engaged.pending.insert(chunk);
            arm(&mut engaged.engine, pending, samples);
            engaged.engine.enable();
            self.running.store(true, Ordering::Release);
        });

        info!("tx: started with chunk {slot} ({samples} samples)");
    }

    /// Handle a transfer-complete interrupt.
    ///
    /// Call this from the TX DMA ISR. The next queued chunk replaces the
    /// pending one, which goes back to the pool. With nothing queued the
    /// pending chunk is re-armed as is and played again.
    pub fn isr(&self) {
        critical_section::with(|cs| {
            let engaged = &mut *self.engaged.borrow_ref_mut(cs);
            let Some(pending) = engaged.pending.as_mut() else {
                return; // not running
            };

            self.stats.record_transfer();

            match self.queue.try_get() {
                Some(mut next) => {
                    next.set_status(ChunkStatus::InProgress);
                    // The played chunk goes back to the pool
                    drop(core::mem::replace(pending, next));
                }
                None => self.stats.record_underrun(),
            }

            let samples = pending.len() / 2;
            arm(&mut engaged.engine, pending, samples);
        });
    }

    /// Give `f` the chunk currently engaged with the engine.
    ///
    /// For software transfer engines, which read samples where DMA would.
    /// Returns `None` until the first [`put()`](Self::put).
    pub fn read_pending<R>(&self, f: impl FnOnce(&Chunk) -> R) -> Option<R> {
        critical_section::with(|cs| self.engaged.borrow_ref(cs).pending.as_deref().map(f))
    }

    /// Run `f` on the transfer engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        critical_section::with(|cs| f(&mut self.engaged.borrow_ref_mut(cs).engine))
    }

    /// Pool slot of the chunk currently engaged with the engine.
    pub fn pending_slot(&self) -> Option<u8> {
        critical_section::with(|cs| {
            self.engaged
                .borrow_ref(cs)
                .pending
                .as_ref()
                .map(|chunk| chunk.slot())
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of chunks waiting behind the pending one.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}

/// The engine is armed with whole samples, and a zero-sample transfer never
/// completes.
fn check_playable(src: &Chunk) -> Result<(), StreamError> {
    let len = src.len();
    if len == 0 || len % 2 != 0 {
        warn!("tx: rejected chunk of {len} bytes");
        return Err(StreamError::InvalidLength {
            len,
            capacity: src.capacity(),
        });
    }
    Ok(())
}
