//! The application loop: receive, filter, transmit.
//!
//! [`AudioPlayer`] borrows both pipelines, so the pipelines themselves stay
//! reachable from the interrupt handlers while the player runs.

use log::{info, warn};

use crate::block::Chunk;
use crate::error::StreamError;
use crate::filter::AudioFilter;
use crate::io::{ReceivePipeline, StatsSnapshot, TransferEngine, TransmitPipeline};
use crate::power::PowerControl;

/// Moves chunks from a [`ReceivePipeline`] through a filter into a
/// [`TransmitPipeline`].
pub struct AudioPlayer<'a, 'p, R, T, F, const N: usize, const K: usize> {
    rx: &'a ReceivePipeline<'p, R, N, K>,
    tx: &'a TransmitPipeline<'p, T, N, K>,
    filter: F,
    /// Working buffer between `get()` and `put()`.
    chunk: Chunk,
    chunks: u32,
    seen_rx: StatsSnapshot,
    seen_tx: StatsSnapshot,
}

impl<'a, 'p, R, T, F, const N: usize, const K: usize> AudioPlayer<'a, 'p, R, T, F, N, K>
where
    R: TransferEngine,
    T: TransferEngine,
    F: AudioFilter,
{
    pub fn new(
        rx: &'a ReceivePipeline<'p, R, N, K>,
        tx: &'a TransmitPipeline<'p, T, N, K>,
        filter: F,
    ) -> Self {
        AudioPlayer {
            rx,
            tx,
            filter,
            chunk: Chunk::new(),
            chunks: 0,
            seen_rx: StatsSnapshot::default(),
            seen_tx: StatsSnapshot::default(),
        }
    }

    /// Start receiving. Transmit starts with the first chunk passed through.
    pub fn start(&mut self) -> Result<(), StreamError> {
        info!("player: startup");
        self.rx.start()
    }

    /// One pass of the loop: wait for a chunk, filter it, queue it for output.
    ///
    /// Blocks through `power` on both ends. Stream faults counted by the
    /// interrupt handlers since the previous step are logged here.
    pub fn step<P: PowerControl>(&mut self, power: &mut P) -> Result<(), StreamError> {
        self.rx.get(&mut self.chunk, power)?;
        self.filter.process(&mut self.chunk);
        let result = self.tx.put(&self.chunk, power);
        if result.is_ok() {
            self.chunks = self.chunks.wrapping_add(1);
        }
        self.report();
        result
    }

    /// Run the loop forever.
    ///
    /// Failed chunks are logged and skipped. If receive is not running it is
    /// (re)started.
    pub fn run<P: PowerControl>(&mut self, power: &mut P) -> ! {
        loop {
            match self.step(power) {
                Ok(()) => {}
                Err(StreamError::NotStarted) => {
                    if let Err(err) = self.start() {
                        warn!("player: receive did not start: {err}");
                        power.wait_for_interrupt();
                    }
                }
                Err(err) => warn!("player: chunk dropped: {err}"),
            }
        }
    }

    /// Chunks handed to the transmit pipeline so far.
    pub fn chunks(&self) -> u32 {
        self.chunks
    }

    fn report(&mut self) {
        let rx = self.rx.stats().snapshot();
        let tx = self.tx.stats().snapshot();
        let rx_new = rx.since(&self.seen_rx);
        let tx_new = tx.since(&self.seen_tx);
        self.seen_rx = rx;
        self.seen_tx = tx;

        if rx_new.overruns > 0 {
            warn!("rx: {} chunk(s) dropped, queue full", rx_new.overruns);
        }
        if rx_new.starvations > 0 {
            warn!("rx: {} chunk(s) dropped, pool empty", rx_new.starvations);
        }
        if self.rx.stats().take_fault() {
            warn!("rx: pool starvation fault cleared");
        }
        if tx_new.underruns > 0 {
            warn!("tx: {} chunk(s) replayed, queue empty", tx_new.underruns);
        }
    }
}
