/// Power state requested while the thread context waits for the audio clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerMode {
    /// Reduced core clock while idling between interrupts.
    Active,
    /// Full speed, restored before touching audio data.
    FullOn,
}

/// Platform hooks used by the blocking halves of the pipelines.
///
/// Only ever called from thread context. The pipelines rely on the next
/// transfer-complete interrupt to end a [`wait_for_interrupt`](Self::wait_for_interrupt).
pub trait PowerControl {
    /// Switch to `mode`.
    fn request_mode(&mut self, mode: PowerMode);

    /// Sleep until the next interrupt has been serviced.
    fn wait_for_interrupt(&mut self);
}
