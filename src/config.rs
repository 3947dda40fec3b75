//! Configuration types for adapters.

use std::time::Duration;

/// Default chunk size, in bytes, moved by one copy-engine step.
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 1024;

/// Configuration for a [`DecoderStream`](crate::DecoderStream).
///
/// Use [`DecoderStreamConfig::default()`] for sensible defaults, or customize as needed.
///
/// # Example
///
/// ```
/// use stream_transcode::DecoderStreamConfig;
/// use std::time::Duration;
///
/// let config = DecoderStreamConfig {
///     buffer_count: 4,
///     wait_budget: Duration::ZERO,
///     ..Default::default()
/// };
/// assert_eq!(config.capacity(), Some(2048));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderStreamConfig {
    /// Size of one buffer segment in bytes.
    ///
    /// Default: 512
    pub buffer_size: usize,

    /// Number of segments making up the decoded-data ring.
    ///
    /// The ring holds `buffer_size * buffer_count` bytes.
    /// Default: 20
    pub buffer_count: usize,

    /// How long a decoder write may wait for ring space before giving up.
    ///
    /// Bytes that don't fit when the budget runs out are reported as not
    /// consumed. With a single thread nothing drains the ring while a write
    /// waits, so [`Duration::ZERO`] is a reasonable choice too.
    /// Default: 2000ms
    pub wait_budget: Duration,

    /// Bytes read from the source per copy-engine step.
    ///
    /// Default: [`DEFAULT_COPY_BUFFER_SIZE`]
    pub copy_buffer_size: usize,

    /// Whether reads refill the ring automatically when it runs dry.
    ///
    /// Default: true
    pub auto_reload: bool,
}

impl DecoderStreamConfig {
    /// Total ring capacity in bytes, or `None` if it does not fit a `usize`.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.buffer_size.checked_mul(self.buffer_count)
    }
}

impl Default for DecoderStreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: 512,
            buffer_count: 20,
            wait_budget: Duration::from_millis(2000),
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            auto_reload: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_stream_config_defaults() {
        let config = DecoderStreamConfig::default();
        assert_eq!(config.buffer_size, 512);
        assert_eq!(config.buffer_count, 20);
        assert_eq!(config.wait_budget, Duration::from_millis(2000));
        assert_eq!(config.copy_buffer_size, 1024);
        assert!(config.auto_reload);
    }

    #[test]
    fn test_decoder_stream_config_capacity() {
        assert_eq!(DecoderStreamConfig::default().capacity(), Some(10240));
    }

    #[test]
    fn test_decoder_stream_config_capacity_overflow() {
        let config = DecoderStreamConfig {
            buffer_size: usize::MAX,
            buffer_count: 2,
            ..Default::default()
        };
        assert_eq!(config.capacity(), None);
    }
}
