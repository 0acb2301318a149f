/// Capacity of one chunk in bytes.
pub const CHUNK_BYTES: usize = 1024 * 2;

/// Capacity of one chunk in signed 16-bit samples.
pub const CHUNK_SAMPLES: usize = CHUNK_BYTES / 2;

/// Number of chunks in the default buffer pool.
pub const POOL_SIZE: usize = 32;

/// Depth of the default Rx and Tx hand-off queues.
pub const QUEUE_DEPTH: usize = 7;

/// Size of the canonical WAV header skipped by [`SampleSource`](crate::source::SampleSource).
pub const WAV_HEADER_BYTES: usize = 44;

/// Sample rate the codec is configured for before streaming starts.
pub const SAMPLE_RATE_HZ: u32 = 16_000;
