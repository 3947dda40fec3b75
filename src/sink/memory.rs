//! In-memory sink implementation.

use crate::event::FormatListener;
use crate::sink::ByteSink;
use crate::AudioFormat;

/// A sink that collects everything written to it.
///
/// Useful as the terminal stage of a chain when the application wants the
/// transcoded bytes in memory, and as a test double. An optional limit
/// caps how many bytes are held, which makes it a convenient stand-in for a
/// slow or full device.
///
/// `MemorySink` also implements [`FormatListener`] and records every
/// notification it receives.
///
/// # Example
///
/// ```
/// use stream_transcode::{ByteSink, MemorySink};
///
/// let mut sink = MemorySink::with_limit(4);
/// assert_eq!(sink.write(&[1, 2, 3, 4, 5, 6]), 4);
/// assert_eq!(sink.available_for_write(), 0);
/// assert_eq!(sink.data(), &[1, 2, 3, 4]);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    data: Vec<u8>,
    limit: Option<usize>,
    format: AudioFormat,
    notifications: Vec<AudioFormat>,
    writes: usize,
}

impl MemorySink {
    /// Creates an unbounded memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that holds at most `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            data: Vec::with_capacity(limit),
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Returns the collected bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Takes the collected bytes, leaving the sink empty.
    ///
    /// Frees room again for capacity-limited sinks.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    /// Number of bytes collected.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of non-empty writes received.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// The last format announced via [`ByteSink::set_format`] or a
    /// notification.
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Every format received through [`FormatListener::on_format_change`].
    pub fn notifications(&self) -> &[AudioFormat] {
        &self.notifications
    }
}

impl ByteSink for MemorySink {
    fn write(&mut self, data: &[u8]) -> usize {
        let accepted = data.len().min(self.available_for_write());
        if accepted > 0 {
            self.data.extend_from_slice(&data[..accepted]);
            self.writes += 1;
        }
        accepted
    }

    fn available_for_write(&self) -> usize {
        match self.limit {
            Some(limit) => limit.saturating_sub(self.data.len()),
            None => usize::MAX,
        }
    }

    fn set_format(&mut self, format: AudioFormat) {
        self.format = format;
    }
}

impl FormatListener for MemorySink {
    fn on_format_change(&mut self, format: AudioFormat) {
        self.format = format;
        self.notifications.push(format);
    }
}
