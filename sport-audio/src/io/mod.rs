//! Streaming between the serial audio port and application code.
//!
//! ## Components
//!
//! | Type | Interrupt side | Thread side | Full / empty policy |
//! |------|----------------|-------------|---------------------|
//! | [`ReceivePipeline`] | produces filled chunks | [`get()`](ReceivePipeline::get) | drop newest / wait |
//! | [`TransmitPipeline`] | consumes queued chunks | [`put()`](TransmitPipeline::put) | wait / replay |
//!
//! ## Utilities
//!
//! - [`queue`]: lock-free single-producer single-consumer bounded FIFO
//! - [`engine`]: the [`TransferEngine`] seam to the DMA hardware
//! - [`stats`]: counters the interrupt handlers bump instead of logging

pub mod engine;
pub mod queue;
pub mod rx;
pub mod stats;
pub mod tx;

pub use engine::TransferEngine;
pub use queue::BoundedQueue;
pub use rx::{ReceivePipeline, RxState};
pub use stats::{StatsSnapshot, StreamStats};
pub use tx::TransmitPipeline;

#[cfg(test)]
mod integration_tests;
