//! Turning encoded chunks into PCM the output can play.
//!
//! The engine only depends on [`AudioDecoder`]. [`Pcm16Decoder`] handles the
//! raw 16-bit little-endian PCM the generation backend streams, adapting the
//! channel layout and converting the sample rate with rubato when the chunk
//! does not match the output.

use super::chunk::{AudioChunk, ScheduledBuffer};
use super::error::{StreamError, StreamResult};
use rubato::{FftFixedIn, Resampler};

/// Decodes one chunk into a buffer at the output's rate and channel count.
pub trait AudioDecoder: Send {
    /// Decode `chunk`, producing `target_channels` interleaved channels at
    /// `target_rate` Hz.
    fn decode(
        &mut self,
        chunk: &AudioChunk,
        target_rate: u32,
        target_channels: u16,
    ) -> StreamResult<ScheduledBuffer>;

    /// Forget any state carried between chunks. Called when a new stream
    /// begins, such as after a reconnect.
    fn restart(&mut self) {}
}

impl<F> AudioDecoder for F
where
    F: FnMut(&AudioChunk, u32, u16) -> StreamResult<ScheduledBuffer> + Send,
{
    fn decode(
        &mut self,
        chunk: &AudioChunk,
        target_rate: u32,
        target_channels: u16,
    ) -> StreamResult<ScheduledBuffer> {
        self(chunk, target_rate, target_channels)
    }
}

/// Resampler block length, in source frames.
const RESAMPLE_BLOCK: usize = 1024;

/// Decoder for raw signed 16-bit little-endian interleaved PCM.
///
/// When the chunk rate differs from the output rate the chunks are treated
/// as one continuous stream: a single resampler runs across chunk
/// boundaries, so consecutive buffers join without gaps or clicks. Input
/// that does not fill a resampler block is held back and comes out with
/// the next chunk.
#[derive(Default)]
pub struct Pcm16Decoder {
    resampler: Option<StreamResampler>,
}

/// A rubato resampler fed block by block from a running input queue.
struct StreamResampler {
    from: u32,
    to: u32,
    inner: FftFixedIn<f32>,
    pending: Vec<Vec<f32>>,
    /// Output frames still owed to the resampler's delay.
    skip: usize,
}

impl StreamResampler {
    fn new(from: u32, to: u32, channels: usize) -> StreamResult<Self> {
        let inner = FftFixedIn::<f32>::new(from as usize, to as usize, RESAMPLE_BLOCK, 2, channels)
            .map_err(|e| StreamError::resample(from, to, e.to_string()))?;
        let skip = inner.output_delay();
        tracing::debug!(from, to, channels, delay = skip, "resampler created");
        Ok(Self {
            from,
            to,
            inner,
            pending: vec![Vec::new(); channels],
            skip,
        })
    }

    fn matches(&self, from: u32, to: u32, channels: usize) -> bool {
        self.from == from && self.to == to && self.pending.len() == channels
    }

    fn queued(&self) -> usize {
        self.pending.first().map_or(0, Vec::len)
    }

    /// Queue `planar` and return every output frame that is ready.
    fn push(&mut self, planar: Vec<Vec<f32>>) -> StreamResult<Vec<Vec<f32>>> {
        let (from, to) = (self.from, self.to);
        for (queue, input) in self.pending.iter_mut().zip(planar) {
            queue.extend(input);
        }

        let mut output = vec![Vec::new(); self.pending.len()];
        while self.queued() >= self.inner.input_frames_next() {
            let need = self.inner.input_frames_next();
            let block: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|queue| queue.drain(..need).collect())
                .collect();
            let produced = self
                .inner
                .process(&block, None)
                .map_err(|e| StreamError::resample(from, to, e.to_string()))?;

            let skipped = self.skip.min(produced.first().map_or(0, Vec::len));
            self.skip -= skipped;
            for (channel, block_out) in output.iter_mut().zip(&produced) {
                channel.extend_from_slice(&block_out[skipped..]);
            }
        }
        Ok(output)
    }
}

impl Pcm16Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn resample(
        &mut self,
        planar: Vec<Vec<f32>>,
        from: u32,
        to: u32,
    ) -> StreamResult<Vec<Vec<f32>>> {
        let channels = planar.len();
        let mut resampler = match self.resampler.take() {
            Some(resampler) if resampler.matches(from, to, channels) => resampler,
            _ => StreamResampler::new(from, to, channels)?,
        };
        let output = resampler.push(planar);
        self.resampler = Some(resampler);
        output
    }
}

impl AudioDecoder for Pcm16Decoder {
    fn decode(
        &mut self,
        chunk: &AudioChunk,
        target_rate: u32,
        target_channels: u16,
    ) -> StreamResult<ScheduledBuffer> {
        if chunk.channels == 0 || chunk.sample_rate == 0 {
            return Err(StreamError::decode(format!(
                "chunk {} declares {} channels at {} Hz",
                chunk.sequence, chunk.channels, chunk.sample_rate
            )));
        }
        let frame_bytes = 2 * chunk.channels as usize;
        if chunk.data.len() % frame_bytes != 0 {
            return Err(StreamError::decode(format!(
                "chunk {} holds {} bytes, not a whole number of {}-byte frames",
                chunk.sequence,
                chunk.data.len(),
                frame_bytes
            )));
        }

        let interleaved: Vec<f32> = chunk
            .data
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();

        let planar = adapt_channels(
            deinterleave(&interleaved, chunk.channels as usize),
            target_channels as usize,
        )?;

        let planar = if chunk.sample_rate == target_rate {
            self.resampler = None;
            planar
        } else {
            self.resample(planar, chunk.sample_rate, target_rate)?
        };

        Ok(ScheduledBuffer::new(
            interleave(&planar),
            target_rate,
            target_channels,
        ))
    }

    fn restart(&mut self) {
        self.resampler = None;
    }
}

fn deinterleave(samples: &[f32], channels: usize) -> Vec<Vec<f32>> {
    let frames = samples.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (channel, &sample) in planar.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }
    planar
}

fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let frames = planar.first().map_or(0, Vec::len);
    let mut out = Vec::with_capacity(frames * planar.len());
    for i in 0..frames {
        for channel in planar {
            out.push(channel[i]);
        }
    }
    out
}

fn adapt_channels(mut planar: Vec<Vec<f32>>, target: usize) -> StreamResult<Vec<Vec<f32>>> {
    match (planar.len(), target) {
        (from, to) if from == to => Ok(planar),
        (1, 2) => {
            let mono = planar.remove(0);
            Ok(vec![mono.clone(), mono])
        }
        (2, 1) => {
            let mixed = planar[0]
                .iter()
                .zip(&planar[1])
                .map(|(l, r)| 0.5 * (l + r))
                .collect();
            Ok(vec![mixed])
        }
        (from, to) => Err(StreamError::format_mismatch(
            format!("{to} channels"),
            format!("{from} channels"),
        )),
    }
}
