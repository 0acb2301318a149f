//! Routing of hardware interrupt sources to pipeline handlers.
//!
//! The serial port raises one interrupt per direction. Firmware registers the
//! receive and transmit pipelines once at init; the vector-table entries then
//! just call [`IsrDispatcher::dispatch`] with their source.
//!
//! ```
//! use sport_audio::dispatch::{InterruptHandler, InterruptSource, IsrDispatcher};
//! use core::sync::atomic::{AtomicU32, Ordering};
//!
//! struct Counter(AtomicU32);
//! impl InterruptHandler for Counter {
//!     fn on_interrupt(&self) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//! }
//!
//! let rx = Counter(AtomicU32::new(0));
//! let mut dispatcher = IsrDispatcher::new();
//! dispatcher.register(InterruptSource::SportRx, &rx).unwrap();
//!
//! assert!(dispatcher.dispatch(InterruptSource::SportRx));
//! assert!(!dispatcher.dispatch(InterruptSource::SportTx));
//! assert_eq!(rx.0.load(Ordering::Relaxed), 1);
//! ```

use crate::error::StreamError;
use crate::io::{ReceivePipeline, TransferEngine, TransmitPipeline};

/// Something that services a hardware interrupt.
///
/// Implementations run in interrupt context: they must not block and must
/// return in bounded time. They are shared with thread context, hence `Sync`.
pub trait InterruptHandler: Sync {
    fn on_interrupt(&self);
}

/// Interrupt lines of the serial audio port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptSource {
    /// Receive DMA transfer complete.
    SportRx,
    /// Transmit DMA transfer complete.
    SportTx,
}

impl InterruptSource {
    /// Number of distinct sources.
    pub const COUNT: usize = 2;

    pub const ALL: [InterruptSource; Self::COUNT] =
        [InterruptSource::SportRx, InterruptSource::SportTx];

    const fn index(self) -> usize {
        match self {
            InterruptSource::SportRx => 0,
            InterruptSource::SportTx => 1,
        }
    }
}

/// Fixed table from [`InterruptSource`] to handler.
pub struct IsrDispatcher<'h> {
    handlers: [Option<&'h dyn InterruptHandler>; InterruptSource::COUNT],
}

impl<'h> IsrDispatcher<'h> {
    /// Create a dispatcher with no handlers registered.
    pub const fn new() -> Self {
        IsrDispatcher {
            handlers: [None; InterruptSource::COUNT],
        }
    }

    /// Attach `handler` to `source`.
    ///
    /// Each source takes a single handler; a second registration fails with
    /// [`StreamError::SourceInUse`] and leaves the first in place.
    pub fn register(
        &mut self,
        source: InterruptSource,
        handler: &'h dyn InterruptHandler,
    ) -> Result<(), StreamError> {
        let entry = &mut self.handlers[source.index()];
        if entry.is_some() {
            return Err(StreamError::SourceInUse);
        }
        *entry = Some(handler);
        Ok(())
    }

    /// Run the handler for `source`. Returns `false` if none is registered.
    pub fn dispatch(&self, source: InterruptSource) -> bool {
        match self.handlers[source.index()] {
            Some(handler) => {
                handler.on_interrupt();
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, source: InterruptSource) -> bool {
        self.handlers[source.index()].is_some()
    }
}

impl Default for IsrDispatcher<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: TransferEngine + Send, const N: usize, const K: usize> InterruptHandler
    for ReceivePipeline<'_, E, N, K>
{
    fn on_interrupt(&self) {
        self.isr();
    }
}

impl<E: TransferEngine + Send, const N: usize, const K: usize> InterruptHandler
    for TransmitPipeline<'_, E, N, K>
{
    fn on_interrupt(&self) {
        self.isr();
    }
}
