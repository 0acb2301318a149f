//! # sport-audio
//!
//! A `no_std`, zero-allocation streaming core for DMA-driven serial audio
//! ports. Fixed-size chunks cycle between a lock-free pool, two bounded
//! single-producer single-consumer queues, and the transfer engine, so that
//! the sample-clock interrupt never blocks or allocates while application
//! code is free to sleep, filter and retry.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Memory | [`block`] | Chunk pool with move-only handles |
//! | I/O | [`io`] | Bounded queues, receive and transmit pipelines |
//! | Platform | [`power`] / [`io::engine`] | Power-mode and DMA seams |
//! | Routing | [`dispatch`] | Interrupt source to handler table |
//! | Application | [`player`] / [`filter`] / [`source`] | Receive, filter, transmit loop |
//! | Host | `host` | Software DMA and interrupt line (`std` feature) |
//!
//! ## Quick start
//!
//! ```ignore
//! use sport_audio::{Pool, RxPipeline, TxPipeline};
//! use sport_audio::dispatch::{InterruptSource, IsrDispatcher};
//! use sport_audio::filter::Gain;
//! use sport_audio::player::AudioPlayer;
//!
//! static POOL: Pool = Pool::new();
//! static RX: RxPipeline<'static, SportRxDma> = RxPipeline::new(&POOL, SportRxDma::new());
//! static TX: TxPipeline<'static, SportTxDma> = TxPipeline::new(&POOL, SportTxDma::new());
//!
//! // In the DMA ISRs:
//! RX.isr();
//! TX.isr();
//!
//! // In main, once the codec is configured:
//! let mut player = AudioPlayer::new(&RX, &TX, Gain::new(0.5));
//! player.start()?;
//! player.run(&mut power)
//! ```
//!
//! ## Stream policies
//!
//! - **Rx overrun** (queue full): the newest chunk is overwritten in place.
//! - **Rx starvation** (pool empty): same, and a fault is latched.
//! - **Tx backpressure** (queue full): `put()` sleeps until a chunk drains.
//! - **Tx underrun** (queue empty): the last chunk is played again.
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `std` | no | `host` module, `critical-section` std implementation |
//!
//! ## Audio parameters
//!
//! - **Chunk size:** 2048 bytes / 1024 samples ([`constants::CHUNK_BYTES`])
//! - **Sample format:** `i16` (signed 16-bit mono)
//! - **Pool:** 32 chunks ([`constants::POOL_SIZE`])
//! - **Queue depth:** 7 chunks per direction ([`constants::QUEUE_DEPTH`])

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod block;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod io;
pub mod player;
pub mod power;
pub mod source;

#[cfg(any(test, feature = "std"))]
pub mod host;

#[cfg(test)]
mod testing;

pub use error::StreamError;

use constants::{POOL_SIZE, QUEUE_DEPTH};

/// Buffer pool at the default size.
pub type Pool = block::BufferPool<POOL_SIZE>;

/// Receive pipeline over [`Pool`] at the default queue depth.
pub type RxPipeline<'p, E> = io::ReceivePipeline<'p, E, POOL_SIZE, QUEUE_DEPTH>;

/// Transmit pipeline over [`Pool`] at the default queue depth.
pub type TxPipeline<'p, E> = io::TransmitPipeline<'p, E, POOL_SIZE, QUEUE_DEPTH>;
