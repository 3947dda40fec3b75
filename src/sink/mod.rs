//! Byte sink contract and built-in sinks.
//!
//! A [`ByteSink`] is any destination that accepts bytes: a codec adapter, a
//! format converter, a fan-out, or an application endpoint. The crate
//! provides two built-in sinks:
//!
//! - [`MemorySink`]: Collects bytes in memory, optionally capacity-limited
//! - [`FanOut`]: Broadcasts every write to several sinks
//!
//! Sinks are shared between stages through [`SinkHandle`]s, created with
//! [`shared()`].

mod fan_out;
mod memory;

pub use fan_out::FanOut;
pub use memory::MemorySink;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::AudioFormat;

/// Shared, lockable reference to a sink.
pub type SinkHandle = Arc<Mutex<dyn ByteSink>>;

/// Wraps a value in the shared handle type used to wire stages together.
///
/// The returned `Arc<Mutex<T>>` coerces to [`SinkHandle`], [`SourceHandle`],
/// [`CodecHandle`] or [`ListenerHandle`] depending on what `T` implements, so
/// the same value can be registered in several roles.
///
/// [`SourceHandle`]: crate::SourceHandle
/// [`CodecHandle`]: crate::CodecHandle
/// [`ListenerHandle`]: crate::ListenerHandle
pub fn shared<T>(value: T) -> Arc<Mutex<T>> {
    Arc::new(Mutex::new(value))
}

/// A destination for bytes.
///
/// # Implementation Notes
///
/// - `write` may accept fewer bytes than offered; the return value is what
///   was consumed. Returning 0 means "no progress this call".
/// - `available_for_write` is the backpressure signal: producers poll it
///   before writing
/// - `set_format` is called when the format of the incoming bytes is known
///   or changes; sinks that don't care keep the default no-op
///
/// # Example
///
/// ```
/// use stream_transcode::ByteSink;
///
/// struct CountingSink {
///     bytes: usize,
/// }
///
/// impl ByteSink for CountingSink {
///     fn write(&mut self, data: &[u8]) -> usize {
///         self.bytes += data.len();
///         data.len()
///     }
///
///     fn available_for_write(&self) -> usize {
///         usize::MAX
///     }
/// }
/// ```
pub trait ByteSink: Send {
    /// Writes `data`, returning the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> usize;

    /// Number of bytes the sink can accept right now.
    fn available_for_write(&self) -> usize;

    /// Informs the sink about the format of the bytes that follow.
    ///
    /// Default implementation does nothing.
    fn set_format(&mut self, _format: AudioFormat) {}
}

/// A sink whose output can be rebound after construction.
///
/// Chains use this to defer wiring: the stream is created by the
/// application, and only when the chain starts does it learn which sink it
/// should write to.
pub trait StreamAssignable: ByteSink {
    /// Redirects this stream's output to `output`.
    fn set_output(&mut self, output: SinkHandle);

    /// Starts processing with the given input format.
    ///
    /// Returns `false` if the stream could not be started.
    fn begin(&mut self, format: AudioFormat) -> bool;

    /// Stops processing.
    fn end(&mut self);
}

/// Writes as much of `data` as `sink` accepts, retrying partial writes.
///
/// Stops at the first call that makes no progress and returns the total
/// number of bytes accepted.
pub fn write_all(sink: &SinkHandle, data: &[u8]) -> usize {
    let mut written = 0;
    while written < data.len() {
        let accepted = sink.lock().write(&data[written..]);
        if accepted == 0 {
            break;
        }
        written += accepted;
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowSink {
        received: Vec<u8>,
        per_call: usize,
    }

    impl ByteSink for SlowSink {
        fn write(&mut self, data: &[u8]) -> usize {
            let n = data.len().min(self.per_call);
            self.received.extend_from_slice(&data[..n]);
            n
        }

        fn available_for_write(&self) -> usize {
            self.per_call
        }
    }

    #[test]
    fn test_write_all_retries_partial_writes() {
        let sink = shared(SlowSink {
            received: Vec::new(),
            per_call: 3,
        });
        let handle: SinkHandle = sink.clone();

        assert_eq!(write_all(&handle, &[1, 2, 3, 4, 5, 6, 7]), 7);
        assert_eq!(sink.lock().received, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_write_all_stops_without_progress() {
        let sink = shared(SlowSink {
            received: Vec::new(),
            per_call: 0,
        });
        let handle: SinkHandle = sink;
        assert_eq!(write_all(&handle, &[1, 2, 3]), 0);
    }

    #[test]
    fn test_sink_handle_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SinkHandle>();
    }
}
