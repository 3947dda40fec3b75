//! In-memory byte source, with PCM generators for testing without hardware.

use crate::format::{encode_sample, MAX_BYTES_PER_SAMPLE};
use crate::source::ByteSource;
use crate::AudioFormat;

/// A byte source that serves bytes from memory.
///
/// Besides wrapping existing data (an encoded file loaded into memory, a
/// captured buffer) it can synthesize PCM in any supported format, which
/// makes it suitable for exercising full pipelines in CI.
///
/// # Example
///
/// ```
/// use stream_transcode::{AudioFormat, ByteSource, MemorySource};
///
/// let format = AudioFormat::new(16000, 1, 16);
///
/// // 100ms of a 440Hz sine wave
/// let mut source = MemorySource::sine(format, 440.0, 100);
/// assert_eq!(source.available(), 3200);
///
/// let mut buffer = [0u8; 512];
/// assert_eq!(source.read_bytes(&mut buffer), 512);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: Vec<u8>,
    position: usize,
    format: AudioFormat,
    read_limit: Option<usize>,
}

impl MemorySource {
    /// Creates a source over raw bytes with an unspecified format.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// Creates a source over bytes of a known format.
    pub fn with_format(data: impl Into<Vec<u8>>, format: AudioFormat) -> Self {
        Self {
            data: data.into(),
            format,
            ..Self::default()
        }
    }

    /// Generates silence for the given duration in milliseconds.
    pub fn silence(format: AudioFormat, duration_ms: u64) -> Self {
        let len = frames_for_duration(format, duration_ms) * format.bytes_per_frame();
        Self::with_format(vec![0u8; len], format)
    }

    /// Generates a full-scale sine wave at `frequency` Hz on every channel.
    pub fn sine(format: AudioFormat, frequency: f64, duration_ms: u64) -> Self {
        let frames = frames_for_duration(format, duration_ms);
        let sample_rate = f64::from(format.sample_rate);
        let bytes_per_sample = format.bytes_per_sample();

        let mut data = Vec::with_capacity(frames * format.bytes_per_frame());
        let mut encoded = [0u8; MAX_BYTES_PER_SAMPLE];
        for i in 0..frames {
            let t = i as f64 / sample_rate;
            let value = (2.0 * std::f64::consts::PI * frequency * t).sin();
            let sample = (value * f64::from(i32::MAX)) as i32;
            encode_sample(sample, format.bits_per_sample, &mut encoded);

            // Write same sample to all channels
            for _ in 0..format.channels {
                data.extend_from_slice(&encoded[..bytes_per_sample]);
            }
        }

        Self::with_format(data, format)
    }

    /// Limits how many bytes a single `read_bytes` call returns.
    ///
    /// Simulates a source that trickles data in small pieces.
    #[must_use]
    pub fn with_read_limit(mut self, limit: usize) -> Self {
        self.read_limit = Some(limit);
        self
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns `true` once every byte has been read.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Starts reading from the beginning again.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// All bytes served by this source, read or not.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl ByteSource for MemorySource {
    fn read_bytes(&mut self, buffer: &mut [u8]) -> usize {
        let mut len = buffer.len().min(self.remaining());
        if let Some(limit) = self.read_limit {
            len = len.min(limit);
        }

        buffer[..len].copy_from_slice(&self.data[self.position..self.position + len]);
        self.position += len;
        len
    }

    fn available(&self) -> usize {
        self.remaining()
    }

    fn format(&self) -> AudioFormat {
        self.format
    }
}

fn frames_for_duration(format: AudioFormat, duration_ms: u64) -> usize {
    (u64::from(format.sample_rate) * duration_ms / 1000) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::decode_sample;

    #[test]
    fn test_memory_source_reads_in_order() {
        let mut source = MemorySource::new(vec![1, 2, 3, 4, 5]);
        let mut buffer = [0u8; 3];

        assert_eq!(source.read_bytes(&mut buffer), 3);
        assert_eq!(buffer, [1, 2, 3]);
        assert_eq!(source.available(), 2);

        assert_eq!(source.read_bytes(&mut buffer), 2);
        assert_eq!(&buffer[..2], &[4, 5]);
        assert!(source.is_exhausted());
        assert_eq!(source.read_bytes(&mut buffer), 0);
    }

    #[test]
    fn test_memory_source_read_limit() {
        let mut source = MemorySource::new(vec![0u8; 100]).with_read_limit(7);
        let mut buffer = [0u8; 64];
        assert_eq!(source.read_bytes(&mut buffer), 7);
        assert_eq!(source.remaining(), 93);
    }

    #[test]
    fn test_memory_source_rewind() {
        let mut source = MemorySource::new(vec![9, 8]);
        let mut buffer = [0u8; 2];
        source.read_bytes(&mut buffer);
        source.rewind();
        assert_eq!(source.available(), 2);
    }

    #[test]
    fn test_memory_source_silence() {
        let format = AudioFormat::new(16000, 1, 16);
        let source = MemorySource::silence(format, 100);
        // 16000 * 0.1 frames * 2 bytes
        assert_eq!(source.remaining(), 3200);
        assert!(source.data().iter().all(|&b| b == 0));
        assert_eq!(source.format(), format);
    }

    #[test]
    fn test_memory_source_sine_stereo() {
        let format = AudioFormat::new(48000, 2, 16);
        let source = MemorySource::sine(format, 440.0, 100);
        assert_eq!(source.remaining(), 4800 * 4);

        // Both channels carry the same sample
        let frame = &source.data()[40..44];
        assert_eq!(frame[..2], frame[2..]);

        let samples: Vec<i32> = source
            .data()
            .chunks_exact(2)
            .map(|b| decode_sample(b, 16))
            .collect();
        assert!(samples.iter().any(|&s| s > 0));
        assert!(samples.iter().any(|&s| s < 0));
    }
}
