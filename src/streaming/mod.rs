//! Incoming audio: chunks, decoding, and look-ahead scheduling.
//!
//! Chunks arrive from the session in order. Each one is decoded by an
//! [`AudioDecoder`] and handed to the [`ChunkScheduler`], which keeps
//! consecutive buffers gapless on the output clock and detects underruns.

pub mod chunk;
pub mod decoder;
pub mod error;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use chunk::{AudioChunk, ScheduledBuffer};
pub use decoder::{AudioDecoder, Pcm16Decoder};
pub use error::{StreamError, StreamResult};
pub use scheduler::{ChunkOutcome, ChunkScheduler, ChunkStats};
