//! Test doubles for the hardware collaborators.

use crate::power::{PowerControl, PowerMode};

pub use crate::host::RecordingEngine as MockEngine;

/// Power collaborator whose "interrupt" is a closure run in place of sleeping.
///
/// Lets a single-threaded test play the interrupt handler from inside a
/// blocking `get()` / `put()`.
pub struct IsrPower<F: FnMut()> {
    on_wait: F,
    pub waits: usize,
    pub modes: Vec<PowerMode>,
}

impl<F: FnMut()> IsrPower<F> {
    pub fn new(on_wait: F) -> Self {
        IsrPower {
            on_wait,
            waits: 0,
            modes: Vec::new(),
        }
    }
}

impl<F: FnMut()> PowerControl for IsrPower<F> {
    fn request_mode(&mut self, mode: PowerMode) {
        self.modes.push(mode);
    }

    fn wait_for_interrupt(&mut self) {
        self.waits += 1;
        (self.on_wait)();
    }
}

/// Power collaborator for paths that must never block.
pub struct NoWait;

impl PowerControl for NoWait {
    fn request_mode(&mut self, _mode: PowerMode) {}

    fn wait_for_interrupt(&mut self) {
        panic!("unexpected wait for interrupt");
    }
}
