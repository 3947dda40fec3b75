//! Fan-out sink that broadcasts bytes to several sinks.

use crate::sink::{ByteSink, SinkHandle};
use crate::AudioFormat;

/// Broadcasts every write to all registered sinks.
///
/// Each sink sees the same bytes in the same order. The same sink may be
/// registered more than once, in which case it receives each write once per
/// registration.
///
/// A write always reports the full length as consumed; sinks that accept
/// less lose the remainder (logged at warn level). Producers that must not
/// lose data poll [`available_for_write`](ByteSink::available_for_write),
/// which reports the smallest free capacity across all sinks.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<SinkHandle>,
}

impl FanOut {
    /// Creates a fan-out with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers another broadcast target.
    pub fn add(&mut self, sink: SinkHandle) {
        self.sinks.push(sink);
    }

    /// Number of registered targets.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns `true` if no targets are registered.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ByteSink for FanOut {
    fn write(&mut self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }

        for (index, sink) in self.sinks.iter().enumerate() {
            let accepted = sink.lock().write(data);
            if accepted < data.len() {
                tracing::warn!(
                    "fan-out target {}: accepted {} of {} bytes",
                    index,
                    accepted,
                    data.len()
                );
            }
        }

        data.len()
    }

    fn available_for_write(&self) -> usize {
        self.sinks
            .iter()
            .map(|sink| sink.lock().available_for_write())
            .min()
            .unwrap_or(0)
    }

    fn set_format(&mut self, format: AudioFormat) {
        for sink in &self.sinks {
            sink.lock().set_format(format);
        }
    }
}
