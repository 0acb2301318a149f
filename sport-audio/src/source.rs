//! Memory-resident sample source.
//!
//! Stands in for the ADC when there is no codec: a 16-bit mono WAV image
//! linked into the binary is played from just past its header, looping back
//! to the first sample at the end.

use crate::block::Chunk;
use crate::constants::WAV_HEADER_BYTES;

/// Looping reader over the sample data of a WAV image.
#[derive(Debug, Clone)]
pub struct SampleSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SampleSource<'a> {
    /// Play `image`, skipping its 44-byte header.
    ///
    /// An image no longer than the header has no samples; every
    /// [`fill()`](Self::fill) then produces an empty chunk.
    pub fn new(image: &'a [u8]) -> Self {
        let data = image.get(WAV_HEADER_BYTES..).unwrap_or(&[]);
        SampleSource { data, pos: 0 }
    }

    /// Fill the whole of `chunk`, wrapping around the end of the image.
    ///
    /// Sets the used length and returns it.
    pub fn fill(&mut self, chunk: &mut Chunk) -> usize {
        let written = self.read(chunk.as_bytes_mut());
        // `read` never writes more than the chunk holds
        let _ = chunk.set_len(written);
        written
    }

    /// Copy bytes into `out` until it is full, wrapping at the end of the data.
    ///
    /// Returns the number of bytes written: `out.len()`, or 0 for an image
    /// without samples.
    pub fn read(&mut self, out: &mut [u8]) -> usize {
        if self.data.is_empty() {
            return 0;
        }

        let mut written = 0;
        while written < out.len() {
            let remaining = &self.data[self.pos..];
            let n = remaining.len().min(out.len() - written);
            out[written..written + n].copy_from_slice(&remaining[..n]);
            written += n;
            self.pos += n;
            if self.pos == self.data.len() {
                self.pos = 0;
            }
        }
        written
    }

    /// Restart at the first sample.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Byte offset of the next sample within the data section.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Length of the data section in bytes.
    pub fn data_len(&self) -> usize {
        self.data.len()
    }
}
