//! Audio format description and PCM conversion.
//!
//! This module provides:
//! - [`AudioFormat`]: the sample rate / channel count / bit depth triple that
//!   flows through every stage of a chain
//! - Sample codecs for signed little-endian PCM (8, 16, 24 and 32 bit)
//! - Channel mapping (mono ↔ multi-channel)
//! - Streaming sample rate conversion
//! - [`FormatConverter`]: a stream that applies all of the above

mod convert;
mod converter;
mod resample;

pub use convert::{
    decode_sample, encode_sample, is_supported_bit_depth, map_channels, MAX_BYTES_PER_SAMPLE,
};
pub use converter::FormatConverter;
pub use resample::Resampler;

use std::fmt;

/// Describes raw PCM audio: sample rate, channel count and bits per sample.
///
/// A field value of `0` means "unspecified": the stage receiving this format
/// inherits the value from its upstream. [`AudioFormat::default()`] is fully
/// unspecified.
///
/// # Example
///
/// ```
/// use stream_transcode::AudioFormat;
///
/// let upstream = AudioFormat::new(44100, 2, 16);
/// let wanted = AudioFormat::new(0, 1, 0);
///
/// assert_eq!(wanted.completed_from(upstream), AudioFormat::new(44100, 1, 16));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AudioFormat {
    /// Sample rate in Hz (e.g., 16000, 44100, 48000).
    pub sample_rate: u32,

    /// Number of interleaved channels (1 = mono, 2 = stereo).
    pub channels: u8,

    /// Bits per sample (8, 16, 24 or 32).
    pub bits_per_sample: u8,
}

impl AudioFormat {
    /// CD quality: 44.1kHz, stereo, 16 bit.
    pub const CD: Self = Self::new(44100, 2, 16);

    /// Creates a new format descriptor.
    #[must_use]
    pub const fn new(sample_rate: u32, channels: u8, bits_per_sample: u8) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// Returns `true` if no field is left unspecified.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sample_rate != 0 && self.channels != 0 && self.bits_per_sample != 0
    }

    /// Fills every unspecified field from `upstream`.
    ///
    /// Fields that are already set are kept, so a stage only changes what
    /// it explicitly asked for.
    #[must_use]
    pub fn completed_from(self, upstream: AudioFormat) -> Self {
        Self {
            sample_rate: if self.sample_rate == 0 {
                upstream.sample_rate
            } else {
                self.sample_rate
            },
            channels: if self.channels == 0 {
                upstream.channels
            } else {
                self.channels
            },
            bits_per_sample: if self.bits_per_sample == 0 {
                upstream.bits_per_sample
            } else {
                self.bits_per_sample
            },
        }
    }

    /// Bytes used by one sample of one channel.
    #[must_use]
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample).div_ceil(8)
    }

    /// Bytes used by one frame (one sample per channel).
    #[must_use]
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * usize::from(self.channels)
    }

    /// Bytes produced per second of audio in this format.
    #[must_use]
    pub fn byte_rate(&self) -> usize {
        self.bytes_per_frame() * self.sample_rate as usize
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz/{}ch/{}bit",
            self.sample_rate, self.channels, self.bits_per_sample
        )
    }
}
