//! Error types for stream-transcode.
//!
//! The streaming calls themselves never fail: `write`, `read_bytes` and
//! `copy` report "no progress" through their return values, and faults like
//! a missing codec are logged. [`PipelineError`] covers the configuration
//! steps that can be rejected up front.

use crate::AudioFormat;

/// Configuration errors reported by adapters and converters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// A pull adapter was started without an upstream source.
    #[error("no source attached - set a source before calling begin()")]
    NoSource,

    /// An adapter was started without a decoder or encoder.
    #[error("no decoder or encoder defined")]
    NoCodec,

    /// The internal buffer cannot be replaced while the adapter is running.
    #[error("buffer cannot be resized while active (call end first)")]
    ResizeWhileActive,

    /// A buffer capacity of zero, or one that overflows, was requested.
    #[error("invalid buffer capacity: {capacity}")]
    InvalidCapacity {
        /// The rejected capacity in bytes.
        capacity: usize,
    },

    /// A converter was given a format with unspecified fields.
    #[error("format {format} is incomplete")]
    IncompleteFormat {
        /// The offending format.
        format: AudioFormat,
    },

    /// The bit depth is not one of 8, 16, 24 or 32.
    #[error("unsupported bit depth: {bits}")]
    UnsupportedBitDepth {
        /// The requested bits per sample.
        bits: u8,
    },

    /// A channel count of zero, or one that does not fit a frame.
    #[error("unsupported channel count: {channels}")]
    UnsupportedChannels {
        /// The requested channel count.
        channels: u16,
    },
}

impl PipelineError {
    /// Creates an incomplete format error for the given format.
    pub fn incomplete(format: AudioFormat) -> Self {
        Self::IncompleteFormat { format }
    }

    /// Creates an invalid capacity error.
    pub fn invalid_capacity(capacity: usize) -> Self {
        Self::InvalidCapacity { capacity }
    }
}
