use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Counters bumped by the interrupt half of a pipeline.
///
/// Interrupt handlers cannot return errors or log, so these counters are how
/// drops, replays and pool starvation become visible to thread context.
#[derive(Debug, Default)]
pub struct StreamStats {
    transfers: AtomicU32,
    overruns: AtomicU32,
    underruns: AtomicU32,
    starvations: AtomicU32,
    fault: AtomicBool,
}

/// Point-in-time copy of [`StreamStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Completed hardware transfers.
    pub transfers: u32,
    /// Rx chunks dropped because the queue was full.
    pub overruns: u32,
    /// Tx chunks replayed because the queue was empty.
    pub underruns: u32,
    /// Rx chunks dropped because the pool had no replacement.
    pub starvations: u32,
}

impl StatsSnapshot {
    /// Counter increments from `earlier` to `self`.
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            transfers: self.transfers.wrapping_sub(earlier.transfers),
            overruns: self.overruns.wrapping_sub(earlier.overruns),
            underruns: self.underruns.wrapping_sub(earlier.underruns),
            starvations: self.starvations.wrapping_sub(earlier.starvations),
        }
    }
}

impl StreamStats {
    pub const fn new() -> Self {
        StreamStats {
            transfers: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
            underruns: AtomicU32::new(0),
            starvations: AtomicU32::new(0),
            fault: AtomicBool::new(false),
        }
    }

    pub(crate) fn record_transfer(&self) {
        self.transfers.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overrun(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    /// Pool starvation also latches the fault flag.
    pub(crate) fn record_starvation(&self) {
        self.starvations.fetch_add(1, Ordering::Relaxed);
        self.fault.store(true, Ordering::Release);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            transfers: self.transfers.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
            starvations: self.starvations.load(Ordering::Relaxed),
        }
    }

    /// Whether a starvation fault is latched.
    pub fn has_fault(&self) -> bool {
        self.fault.load(Ordering::Acquire)
    }

    /// Read and clear the starvation fault latch.
    pub fn take_fault(&self) -> bool {
        self.fault.swap(false, Ordering::AcqRel)
    }
}
