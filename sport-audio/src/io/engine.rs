use core::ptr::NonNull;

use crate::block::{Chunk, ChunkHandle};

/// One direction of the DMA-driven serial audio port.
///
/// The pipelines own their engine and call it from interrupt context (re-arm
/// after each completion) and once from thread context (the first arm).
pub trait TransferEngine {
    /// Configure the next transfer: `samples` 16-bit words starting at `buffer`.
    ///
    /// The memory stays owned by the pipeline's pending chunk until the next
    /// completion interrupt.
    fn arm(&mut self, buffer: NonNull<i16>, samples: usize);

    /// Start the serial port in this direction.
    fn enable(&mut self);
}

/// The pending chunk and the engine it is armed on.
///
/// Both pipelines keep this pair behind a critical-section mutex: the
/// interrupt handler swaps the pending chunk and re-arms the engine as one
/// step.
pub(crate) struct Engaged<'p, E, const N: usize> {
    pub(crate) pending: Option<ChunkHandle<'p, N>>,
    pub(crate) engine: E,
}

impl<'p, E, const N: usize> Engaged<'p, E, N> {
    pub(crate) const fn new(engine: E) -> Self {
        Engaged {
            pending: None,
            engine,
        }
    }
}

/// Point `engine` at the first `samples` samples of `chunk`.
pub(crate) fn arm<E: TransferEngine>(engine: &mut E, chunk: &mut Chunk, samples: usize) {
    let buffer = NonNull::from(chunk.samples_mut()).cast::<i16>();
    engine.arm(buffer, samples);
}
