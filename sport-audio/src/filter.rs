//! In-place processing stages between receive and transmit.
//!
//! A stage sees each chunk once, after [`ReceivePipeline::get`] and before
//! [`TransmitPipeline::put`]. It may rewrite the used samples but keeps the
//! chunk's length.
//!
//! [`ReceivePipeline::get`]: crate::io::ReceivePipeline::get
//! [`TransmitPipeline::put`]: crate::io::TransmitPipeline::put

use crate::block::Chunk;

/// A processing stage applied to every chunk in the loop.
pub trait AudioFilter {
    fn process(&mut self, chunk: &mut Chunk);
}

/// Leaves chunks untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl AudioFilter for Passthrough {
    fn process(&mut self, _chunk: &mut Chunk) {}
}

/// Fixed-point unity gain: 1.0 in Q16.16 format.
const UNITY_GAIN: i32 = 65536;

/// Volume stage. Multiplies every used sample by a Q16.16 gain with 16-bit
/// saturation.
///
/// # Example
/// ```
/// use sport_audio::filter::{AudioFilter, Gain};
/// use sport_audio::block::Chunk;
///
/// let mut chunk = Chunk::new();
/// chunk.samples_mut()[0] = 1000;
/// chunk.set_len(2).unwrap();
///
/// let mut gain = Gain::new(0.5);
/// gain.process(&mut chunk);
/// assert_eq!(chunk.used_samples()[0], 500);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Gain {
    /// Gain in Q16.16 fixed-point. 65536 = unity (1.0).
    multiplier: i32,
}

impl Gain {
    /// Gain at `level`: 0.0 = silence, 1.0 = unity, >1.0 = boost.
    ///
    /// Clamped to ±32767.0.
    pub fn new(level: f32) -> Self {
        let mut gain = Gain::unity();
        gain.set_level(level);
        gain
    }

    pub const fn unity() -> Self {
        Gain {
            multiplier: UNITY_GAIN,
        }
    }

    pub fn set_level(&mut self, level: f32) {
        let clamped = level.clamp(-32767.0, 32767.0);
        self.multiplier = (clamped * 65536.0) as i32;
    }

    /// The raw Q16.16 multiplier.
    pub fn multiplier(&self) -> i32 {
        self.multiplier
    }
}

impl Default for Gain {
    fn default() -> Self {
        Gain::unity()
    }
}

impl AudioFilter for Gain {
    fn process(&mut self, chunk: &mut Chunk) {
        let mult = self.multiplier;
        if mult == UNITY_GAIN {
            return;
        }
        for sample in chunk.used_samples_mut() {
            let val = ((*sample as i64) * (mult as i64)) >> 16;
            *sample = saturate16(val);
        }
    }
}

/// Saturate to `i16` range (`-32768..=32767`).
#[inline(always)]
pub fn saturate16(val: i64) -> i16 {
    val.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}
