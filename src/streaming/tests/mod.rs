//! Tests for chunk decoding and scheduling.

use super::chunk::AudioChunk;


/// Raw PCM16 chunk of `frames` frames, every sample set to `value`.
pub(crate) fn pcm16_chunk(frames: usize, sample_rate: u32, channels: u16, value: i16) -> AudioChunk {
    let data = (0..frames * channels as usize)
        .flat_map(|_| value.to_le_bytes())
        .collect();
    AudioChunk::new(data, sample_rate, channels)
}

/// One second of stereo silence at 48 kHz.
pub(crate) fn one_second_chunk() -> AudioChunk {
    pcm16_chunk(48_000, 48_000, 2, 0)
}
