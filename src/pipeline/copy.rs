//! Copy engine pumping bytes from a source into a sink.

use crate::config::DEFAULT_COPY_BUFFER_SIZE;
use crate::sink::{write_all, SinkHandle};
use crate::source::SourceHandle;

/// Moves bytes from a [`ByteSource`](crate::ByteSource) to a
/// [`ByteSink`](crate::ByteSink), one chunk per call.
///
/// Each [`copy`](Self::copy) step reads no more than the sink says it can
/// take, so a step never overruns a bounded sink. The chunk buffer is
/// allocated once at construction.
///
/// # Example
///
/// ```
/// use stream_transcode::{shared, MemorySink, MemorySource, StreamCopy};
///
/// let sink = shared(MemorySink::new());
/// let mut copier = StreamCopy::with_buffer_size(4);
/// copier.begin(sink.clone(), shared(MemorySource::new(vec![1, 2, 3, 4, 5])));
///
/// assert_eq!(copier.copy(), 4);
/// assert_eq!(copier.copy(), 1);
/// assert_eq!(copier.copy(), 0);
/// assert_eq!(sink.lock().data(), &[1, 2, 3, 4, 5]);
/// ```
pub struct StreamCopy {
    from: Option<SourceHandle>,
    to: Option<SinkHandle>,
    buffer: Vec<u8>,
}

impl StreamCopy {
    /// Creates a copier moving up to [`DEFAULT_COPY_BUFFER_SIZE`] bytes per step.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_COPY_BUFFER_SIZE)
    }

    /// Creates a copier moving up to `size` bytes per step.
    pub fn with_buffer_size(size: usize) -> Self {
        Self {
            from: None,
            to: None,
            buffer: vec![0; size],
        }
    }

    /// Connects `from` to `to`.
    pub fn begin(&mut self, to: SinkHandle, from: SourceHandle) {
        self.to = Some(to);
        self.from = Some(from);
    }

    /// Disconnects both ends.
    pub fn end(&mut self) {
        self.to = None;
        self.from = None;
    }

    /// Returns `true` while both ends are connected.
    pub fn is_active(&self) -> bool {
        self.from.is_some() && self.to.is_some()
    }

    /// Bytes moved per step at most.
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Performs one step, returning the number of bytes delivered to the sink.
    ///
    /// Returns 0 when not connected, when the sink has no room, or when the
    /// source has nothing to offer.
    pub fn copy(&mut self) -> usize {
        let (Some(from), Some(to)) = (&self.from, &self.to) else {
            return 0;
        };

        let room = to.lock().available_for_write();
        let len = self.buffer.len().min(room);
        if len == 0 {
            return 0;
        }

        let read = from.lock().read_bytes(&mut self.buffer[..len]);
        if read == 0 {
            return 0;
        }

        let written = write_all(to, &self.buffer[..read]);
        if written < read {
            tracing::warn!("stream copy: sink accepted {} of {} bytes", written, read);
        }
        tracing::trace!("stream copy: moved {} bytes", written);
        written
    }
}

impl Default for StreamCopy {
    fn default() -> Self {
        Self::new()
    }
}
