//! Host-side stand-ins for the hardware collaborators.
//!
//! With the `std` feature the pipelines can run on a desktop: a thread plays
//! the sample clock, moves samples in and out of the pending chunks where DMA
//! would, calls the interrupt handlers, and then raises an [`InterruptLine`]
//! to wake the application thread.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::vec::Vec;

use core::ptr::NonNull;

use crate::constants::WAV_HEADER_BYTES;
use crate::io::TransferEngine;
use crate::power::{PowerControl, PowerMode};

/// Condition-variable backed interrupt line.
///
/// `raise()` latches a pending interrupt and wakes the waiter, like an event
/// register: a raise that lands before `wait_for_interrupt()` is not lost.
#[derive(Debug)]
pub struct InterruptLine {
    state: Mutex<LineState>,
    raised: Condvar,
}

#[derive(Debug)]
struct LineState {
    pending: bool,
    raises: u64,
    mode: PowerMode,
}

impl InterruptLine {
    pub fn new() -> Self {
        InterruptLine {
            state: Mutex::new(LineState {
                pending: false,
                raises: 0,
                mode: PowerMode::FullOn,
            }),
            raised: Condvar::new(),
        }
    }

    /// Signal an interrupt. Call after the handlers have run.
    pub fn raise(&self) {
        let mut state = self.lock();
        state.pending = true;
        state.raises += 1;
        self.raised.notify_all();
    }

    /// Number of interrupts raised so far.
    pub fn raises(&self) -> u64 {
        self.lock().raises
    }

    /// Power mode most recently requested by the application thread.
    pub fn mode(&self) -> PowerMode {
        self.lock().mode
    }

    fn lock(&self) -> MutexGuard<'_, LineState> {
        // The state is a few plain fields; a panicked holder cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InterruptLine {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerControl for &InterruptLine {
    fn request_mode(&mut self, mode: PowerMode) {
        self.lock().mode = mode;
    }

    fn wait_for_interrupt(&mut self) {
        let mut state = self.lock();
        while !state.pending {
            state = self
                .raised
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.pending = false;
    }
}

/// Transfer engine that records what it was armed with.
///
/// Software DMA does the actual data movement through
/// [`ReceivePipeline::write_pending`](crate::io::ReceivePipeline::write_pending)
/// and [`TransmitPipeline::read_pending`](crate::io::TransmitPipeline::read_pending).
#[derive(Debug, Default)]
pub struct RecordingEngine {
    /// Address and sample count of the most recent arm.
    pub last: Option<(usize, usize)>,
    pub arms: usize,
    pub enabled: bool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransferEngine for RecordingEngine {
    fn arm(&mut self, buffer: NonNull<i16>, samples: usize) {
        self.last = Some((buffer.as_ptr() as usize, samples));
        self.arms += 1;
    }

    fn enable(&mut self) {
        self.enabled = true;
    }
}

/// Build a 16-bit mono PCM WAV image of `samples`.
pub fn wav_image(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut image = Vec::with_capacity(WAV_HEADER_BYTES + samples.len() * 2);

    image.extend_from_slice(b"RIFF");
    image.extend_from_slice(&(36 + data_len).to_le_bytes());
    image.extend_from_slice(b"WAVE");
    image.extend_from_slice(b"fmt ");
    image.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    image.extend_from_slice(&1u16.to_le_bytes()); // PCM
    image.extend_from_slice(&1u16.to_le_bytes()); // mono
    image.extend_from_slice(&sample_rate.to_le_bytes());
    image.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    image.extend_from_slice(&2u16.to_le_bytes()); // block align
    image.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    image.extend_from_slice(b"data");
    image.extend_from_slice(&data_len.to_le_bytes());

    for sample in samples {
        image.extend_from_slice(&sample.to_le_bytes());
    }
    image
}
