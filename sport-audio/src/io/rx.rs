//! Receive half: DMA completions in, filled chunks out.
//!
//! ## Architecture
//!
//! ```text
//! SPORT RX ──DMA──► pending chunk ──isr()──► BoundedQueue ──get()──► caller's Chunk
//!                        ▲                                      │
//!                        └──────── BufferPool ◄─── release ─────┘
//! ```
//!
//! The interrupt half never blocks: when the queue is full the pending chunk
//! is simply re-armed and overwritten, dropping the newest data. The thread
//! half sleeps through [`PowerControl`] until a completion makes a chunk
//! available.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU8, Ordering};

use critical_section::Mutex;
use log::{debug, info, warn};

use crate::block::{BufferPool, Chunk, ChunkHandle, ChunkStatus};
use crate::constants::CHUNK_SAMPLES;
use crate::error::StreamError;
use crate::power::{PowerControl, PowerMode};

use super::engine::{arm, Engaged, TransferEngine};
use super::queue::BoundedQueue;
use super::stats::StreamStats;

/// Lifecycle of a [`ReceivePipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    /// Not started; no chunk is engaged with the engine.
    Idle,
    /// First chunk armed, no transfer completed yet.
    Priming,
    /// At least one transfer has completed.
    Streaming,
}

impl RxState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => RxState::Idle,
            1 => RxState::Priming,
            _ => RxState::Streaming,
        }
    }
}

/// DMA-driven receive pipeline.
///
/// [`isr()`](Self::isr) runs in interrupt context and is the queue's only
/// producer; [`get()`](Self::get) runs in thread context and is its only
/// consumer. All methods take `&self`, so the pipeline can sit in a `static`
/// shared by the interrupt handler and the application loop.
pub struct ReceivePipeline<'p, E, const N: usize, const K: usize> {
    pool: &'p BufferPool<N>,
    queue: BoundedQueue<ChunkHandle<'p, N>, K>,
    engaged: Mutex<RefCell<Engaged<'p, E, N>>>,
    state: AtomicU8,
    stats: StreamStats,
}

impl<'p, E: TransferEngine, const N: usize, const K: usize> ReceivePipeline<'p, E, N, K> {
    /// Create an idle pipeline drawing chunks from `pool`.
    pub const fn new(pool: &'p BufferPool<N>, engine: E) -> Self {
        ReceivePipeline {
            pool,
            queue: BoundedQueue::new(),
            engaged: Mutex::new(RefCell::new(Engaged::new(engine))),
            state: AtomicU8::new(RxState::Idle as u8),
            stats: StreamStats::new(),
        }
    }

    /// Prime the engine with a first chunk and start the serial port.
    ///
    /// Fails with [`StreamError::PoolExhausted`] (and stays idle) if no chunk
    /// is free. Calling it again once started does nothing.
    pub fn start(&self) -> Result<(), StreamError> {
        if self.state() != RxState::Idle {
            return Ok(());
        }

        let mut chunk = self.pool.acquire().ok_or_else(|| {
            warn!("rx: no free chunk to prime the stream");
            StreamError::PoolExhausted
        })?;
        chunk.set_status(ChunkStatus::InProgress);
        let slot = chunk.slot();

        critical_section::with(|cs| {
            let engaged = &mut *self.engaged.borrow_ref_mut(cs);
            let pending = engaged.pending.insert(chunk);
            arm(&mut engaged.engine, pending, CHUNK_SAMPLES);
            engaged.engine.enable();
            self.state.store(RxState::Priming as u8, Ordering::Release);
        });

        info!("rx: started, priming chunk {slot}");
        Ok(())
    }

    /// Handle a transfer-complete interrupt.
    ///
    /// Call this from the RX DMA ISR. The filled chunk is queued and a fresh
    /// one armed in its place. If the queue is full, or the pool has no
    /// replacement, the same chunk is re-armed and its data dropped; the
    /// engine never writes into a chunk that has been queued.
    pub fn isr(&self) {
        critical_section::with(|cs| {
            let engaged = &mut *self.engaged.borrow_ref_mut(cs);
            let Some(pending) = engaged.pending.as_mut() else {
                return; // not started
            };

            pending.mark_complete();
            self.stats.record_transfer();

            if self.queue.is_full() {
                self.stats.record_overrun();
            } else if let Some(fresh) = self.pool.acquire() {
                let filled = core::mem::replace(pending, fresh);
                if let Err(filled) = self.queue.try_put(filled) {
                    // Unreachable with a single producer. Keep the filled chunk.
                    drop(core::mem::replace(pending, filled));
                    self.stats.record_overrun();
                }
            } else {
                self.stats.record_starvation();
            }

            pending.set_status(ChunkStatus::InProgress);
            arm(&mut engaged.engine, pending, CHUNK_SAMPLES);
            self.state.store(RxState::Streaming as u8, Ordering::Release);
        });
    }

    /// Copy the oldest filled chunk into `dest`, sleeping until one arrives.
    ///
    /// While the queue is empty the core is put in [`PowerMode::Active`] and
    /// parked in [`PowerControl::wait_for_interrupt`]; full power is restored
    /// before the copy. The source chunk goes back to the pool afterwards.
    pub fn get<P: PowerControl>(&self, dest: &mut Chunk, power: &mut P) -> Result<(), StreamError> {
        if self.state() == RxState::Idle {
            return Err(StreamError::NotStarted);
        }

        if self.queue.is_empty() {
            debug!("rx: queue empty, waiting for transfer");
            while self.queue.is_empty() {
                power.request_mode(PowerMode::Active);
                power.wait_for_interrupt();
            }
            power.request_mode(PowerMode::FullOn);
        }

        self.try_get(dest)
    }

    /// Non-blocking [`get()`](Self::get): fails with [`StreamError::QueueEmpty`].
    pub fn try_get(&self, dest: &mut Chunk) -> Result<(), StreamError> {
        let chunk = self.queue.try_get().ok_or(StreamError::QueueEmpty)?;
        dest.copy_from(&chunk);
        self.pool.release(chunk)
    }

    /// Give `f` the chunk currently engaged with the engine.
    ///
    /// For software transfer engines, which have to put samples where DMA
    /// would. Returns `None` if the pipeline is not started.
    pub fn write_pending<R>(&self, f: impl FnOnce(&mut Chunk) -> R) -> Option<R> {
        critical_section::with(|cs| {
            let mut engaged = self.engaged.borrow_ref_mut(cs);
            engaged.pending.as_deref_mut().map(f)
        })
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

    pub fn state(&self) -> RxState {
        RxState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of filled chunks waiting for [`get()`](Self::get).
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CHUNK_BYTES;
    use crate::testing::{IsrPower, MockEngine, NoWait};

    type Rx<'p, const N: usize, const K: usize> = ReceivePipeline<'p, MockEngine, N, K>;

    /// Simulate one DMA transfer: fill the pending chunk with `value`, then complete.
    fn transfer<const N: usize, const K: usize>(rx: &Rx<'_, N, K>, value: i16) {
        rx.write_pending(|chunk| chunk.samples_mut().fill(value))
            .expect("pipeline not started");
        rx.isr();
    }

    #[test]
    fn new_is_idle() {
        let pool: BufferPool<4> = BufferPool::new();
        let rx: Rx<'_, 4, 2> = ReceivePipeline::new(&pool, MockEngine::new());
        assert_eq!(rx.state(), RxState::Idle);
        assert_eq!(rx.pending_slot(), None);
        assert_eq!(rx.queued(), 0);
        assert!(!rx.with_engine(|e| e.enabled));
    }

    #[test]
    fn start_arms_full_chunk() {
        let pool: BufferPool<4> = BufferPool::new();
        let rx: Rx<'_, 4, 2> = ReceivePipeline::new(&pool, MockEngine::new());

        rx.start().unwrap();

        assert_eq!(rx.state(), RxState::Priming);
        assert_eq!(pool.outstanding(), 1);
        assert!(rx.pending_slot().is_some());
        let (arms, enabled, samples) =
            rx.with_engine(|e| (e.arms, e.enabled, e.last.map(|(_, n)| n)));
        assert_eq!(arms, 1);
        assert!(enabled);
        assert_eq!(samples, Some(CHUNK_SAMPLES));
    }

    #[test]
    fn start_twice_is_noop() {
        let pool: BufferPool<4> = BufferPool::new();
        let rx: Rx<'_, 4, 2> = ReceivePipeline::new(&pool, MockEngine::new());
        rx.start().unwrap();
        rx.start().unwrap();
        assert_eq!(pool.outstanding(), 1);
        assert_eq!(rx.with_engine(|e| e.arms), 1);
    }

    #[test]
    fn start_with_exhausted_pool_stays_idle() {
        let pool: BufferPool<1> = BufferPool::new();
        let rx: Rx<'_, 1, 2> = ReceivePipeline::new(&pool, MockEngine::new());
        let hog = pool.acquire().unwrap();

        assert_eq!(rx.start(), Err(StreamError::PoolExhausted));
        assert_eq!(rx.state(), RxState::Idle);

        drop(hog);
        rx.start().unwrap();
        assert_eq!(rx.state(), RxState::Priming);
    }

    #[test]
    fn isr_before_start_is_ignored() {
        let pool: BufferPool<4> = BufferPool::new();
        let rx: Rx<'_, 4, 2> = ReceivePipeline::new(&pool, MockEngine::new());
        rx.isr();
        assert_eq!(rx.state(), RxState::Idle);
        assert_eq!(rx.stats().snapshot().transfers, 0);
        assert_eq!(rx.with_engine(|e| e.arms), 0);
    }

    #[test]
    fn isr_queues_filled_chunk_and_arms_fresh_one() {
        let pool: BufferPool<4> = BufferPool::new();
        let rx: Rx<'_, 4, 2> = ReceivePipeline::new(&pool, MockEngine::new());
        rx.start().unwrap();
        let first = rx.pending_slot();

        transfer(&rx, 7);

        assert_eq!(rx.state(), RxState::Streaming);
        assert_eq!(rx.queued(), 1);
        assert_ne!(rx.pending_slot(), first);
        assert_eq!(pool.outstanding(), 2);
        assert_eq!(rx.with_engine(|e| e.arms), 2);
    }

    #[test]
    fn get_copies_and_releases() {
        let pool: BufferPool<4> = BufferPool::new();
        let rx: Rx<'_, 4, 2> = ReceivePipeline::new(&pool, MockEngine::new());
        rx.start().unwrap();
        transfer(&rx, -321);

        let mut dest = Chunk::new();
        rx.get(&mut dest, &mut NoWait).unwrap();

        assert_eq!(dest.len(), CHUNK_BYTES);
        assert!(dest.used_samples().iter().all(|&s| s == -321));
        // Only the pending chunk is still out
        assert_eq!(pool.outstanding(), 1);
        assert_eq!(rx.queued(), 0);
    }

    #[test]
    fn get_before_start_fails() {
        let pool: BufferPool<4> = BufferPool::new();
        let rx: Rx<'_, 4, 2> = ReceivePipeline::new(&pool, MockEngine::new());
        let mut dest = Chunk::new();
        assert_eq!(rx.get(&mut dest, &mut NoWait), Err(StreamError::NotStarted));
    }

    #[test]
    fn try_get_on_empty_queue() {
        let pool: BufferPool<4> = BufferPool::new();
        let rx: Rx<'_, 4, 2> = ReceivePipeline::new(&pool, MockEngine::new());
        rx.start().unwrap();
        let mut dest = Chunk::new();
        assert_eq!(rx.try_get(&mut dest), Err(StreamError::QueueEmpty));
    }

    #[test]
    fn get_waits_in_low_power_until_transfer() {
        let pool: BufferPool<4> = BufferPool::new();
        let rx: Rx<'_, 4, 2> = ReceivePipeline::new(&pool, MockEngine::new());
        rx.start().unwrap();

        let mut power = IsrPower::new(|| transfer(&rx, 55));
        let mut dest = Chunk::new();
        rx.get(&mut dest, &mut power).unwrap();

        assert_eq!(power.waits, 1);
        assert_eq!(power.modes, vec![PowerMode::Active, PowerMode::FullOn]);
        assert_eq!(dest.used_samples()[0], 55);
    }

    #[test]
    fn overrun_drops_newest_without_blocking() {
        // Queue of 2, three completions and nobody draining.
        let pool: BufferPool<8> = BufferPool::new();
        let rx: Rx<'_, 8, 2> = ReceivePipeline::new(&pool, MockEngine::new());
        rx.start().unwrap();

        transfer(&rx, 1);
        transfer(&rx, 2);
        let pending_before = rx.pending_slot();
        transfer(&rx, 3);

        // Third completion re-armed the same chunk instead of queueing it
        assert_eq!(rx.pending_slot(), pending_before);
        assert_eq!(rx.queued(), 2);
        assert_eq!(rx.stats().snapshot().overruns, 1);
        assert_eq!(pool.outstanding(), 3);

        let mut dest = Chunk::new();
        rx.try_get(&mut dest).unwrap();
        assert_eq!(dest.used_samples()[0], 1);
        rx.try_get(&mut dest).unwrap();
        assert_eq!(dest.used_samples()[0], 2);
        assert_eq!(rx.try_get(&mut dest), Err(StreamError::QueueEmpty));
    }

    #[test]
    fn starvation_keeps_pending_and_latches_fault() {
        let pool: BufferPool<2> = BufferPool::new();
        let rx: Rx<'_, 2, 4> = ReceivePipeline::new(&pool, MockEngine::new());
        rx.start().unwrap();

        transfer(&rx, 10); // queued, second chunk now pending
        let pending = rx.pending_slot();
        transfer(&rx, 20); // pool empty: dropped

        assert_eq!(rx.pending_slot(), pending);
        assert_eq!(rx.queued(), 1);
        assert!(rx.stats().has_fault());
        assert_eq!(rx.stats().snapshot().starvations, 1);

        // The queued chunk was not overwritten by the dropped transfer
        let mut dest = Chunk::new();
        rx.try_get(&mut dest).unwrap();
        assert_eq!(dest.used_samples()[0], 10);

        // With a chunk released, streaming resumes
        transfer(&rx, 30);
        assert_eq!(rx.queued(), 1);
        rx.try_get(&mut dest).unwrap();
        assert_eq!(dest.used_samples()[0], 30);
    }

    #[test]
    fn pending_chunk_is_in_progress() {
        let pool: BufferPool<4> = BufferPool::new();
        let rx: Rx<'_, 4, 1> = ReceivePipeline::new(&pool, MockEngine::new());
        rx.start().unwrap();
        transfer(&rx, 1);
        transfer(&rx, 2); // overrun path keeps the chunk
        let status = rx.write_pending(|chunk| chunk.status());
        assert_eq!(status, Some(ChunkStatus::InProgress));
    }
}
