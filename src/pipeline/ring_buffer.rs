//! Ring buffer for decoded bytes, and the blocking sink that fills it.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Observer, Producer};
use ringbuf::HeapRb;

use crate::sink::ByteSink;
use crate::PipelineError;

/// A bounded FIFO of bytes.
///
/// This wraps the low-level ring buffer with the byte-oriented, never
/// blocking read/write calls the pull adapter needs. The fill level always
/// stays between 0 and the capacity chosen at construction.
pub struct ByteRing {
    inner: HeapRb<u8>,
}

impl ByteRing {
    /// Creates a ring holding up to `capacity` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidCapacity`] for a capacity of zero.
    pub fn new(capacity: usize) -> Result<Self, PipelineError> {
        NonZeroUsize::new(capacity)
            .map(Self::with_capacity)
            .ok_or_else(|| PipelineError::invalid_capacity(capacity))
    }

    /// Creates a ring holding up to `capacity` bytes.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            inner: HeapRb::new(capacity.get()),
        }
    }

    /// Appends as much of `data` as fits, returning the number of bytes stored.
    pub fn write(&mut self, data: &[u8]) -> usize {
        self.inner.push_slice(data)
    }

    /// Removes up to `buffer.len()` bytes, returning how many were read.
    pub fn read(&mut self, buffer: &mut [u8]) -> usize {
        self.inner.pop_slice(buffer)
    }

    /// Number of bytes buffered.
    pub fn available(&self) -> usize {
        self.inner.occupied_len()
    }

    /// Number of bytes that can still be written.
    pub fn available_for_write(&self) -> usize {
        self.inner.vacant_len()
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }

    /// Returns `true` if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns `true` if no more bytes fit.
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Discards everything buffered.
    pub fn reset(&mut self) {
        let buffered = self.inner.occupied_len();
        self.inner.skip(buffered);
    }
}

impl std::fmt::Debug for ByteRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteRing")
            .field("available", &self.available())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// A sink that writes into a shared [`ByteRing`], waiting for room.
///
/// When the ring is full, a write keeps re-checking for free space,
/// yielding the thread between checks, until the wait budget runs out. It
/// then reports how much it managed to store. A zero budget makes every
/// write a single non-blocking attempt.
pub struct BlockingSink {
    ring: Arc<Mutex<ByteRing>>,
    wait_budget: Duration,
}

impl BlockingSink {
    /// Creates a sink over `ring` that waits at most `wait_budget` per write.
    pub fn new(ring: Arc<Mutex<ByteRing>>, wait_budget: Duration) -> Self {
        Self { ring, wait_budget }
    }

    /// The maximum time a single write waits for room.
    pub fn wait_budget(&self) -> Duration {
        self.wait_budget
    }
}

impl ByteSink for BlockingSink {
    fn write(&mut self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }

        let start = Instant::now();
        let mut written = self.ring.lock().write(data);
        while written < data.len() && start.elapsed() < self.wait_budget {
            std::thread::yield_now();
            written += self.ring.lock().write(&data[written..]);
        }

        if written < data.len() {
            tracing::debug!(
                "blocking sink: wait budget of {:?} elapsed, stored {} of {} bytes",
                self.wait_budget,
                written,
                data.len()
            );
        }
        written
    }

    fn available_for_write(&self) -> usize {
        self.ring.lock().available_for_write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_ring_rejects_zero_capacity() {
        assert_eq!(
            ByteRing::new(0).unwrap_err(),
            PipelineError::InvalidCapacity { capacity: 0 }
        );
    }

    #[test]
    fn test_byte_ring_fifo() {
        let mut ring = ByteRing::new(8).unwrap();
        assert_eq!(ring.write(&[1, 2, 3]), 3);
        assert_eq!(ring.available(), 3);
        assert_eq!(ring.available_for_write(), 5);

        let mut buffer = [0u8; 2];
        assert_eq!(ring.read(&mut buffer), 2);
        assert_eq!(buffer, [1, 2]);
        assert_eq!(ring.available(), 1);
    }

    #[test]
    fn test_byte_ring_bounded() {
        let mut ring = ByteRing::new(4).unwrap();
        assert_eq!(ring.write(&[1, 2, 3, 4, 5, 6]), 4);
        assert!(ring.is_full());
        assert_eq!(ring.write(&[7]), 0);
        assert_eq!(ring.capacity(), 4);
    }

    #[test]
    fn test_byte_ring_wraps_around() {
        let mut ring = ByteRing::new(4).unwrap();
        let mut buffer = [0u8; 4];

        ring.write(&[1, 2, 3]);
        ring.read(&mut buffer[..3]);
        assert_eq!(ring.write(&[4, 5, 6, 7]), 4);
        assert_eq!(ring.read(&mut buffer), 4);
        assert_eq!(buffer, [4, 5, 6, 7]);
    }

    #[test]
    fn test_byte_ring_reset() {
        let mut ring = ByteRing::new(4).unwrap();
        ring.write(&[1, 2, 3]);
        ring.reset();
        assert!(ring.is_empty());
        assert_eq!(ring.available_for_write(), 4);
    }

    #[test]
    fn test_blocking_sink_writes_when_room() {
        let ring = Arc::new(Mutex::new(ByteRing::new(16).unwrap()));
        let mut sink = BlockingSink::new(Arc::clone(&ring), Duration::from_secs(5));

        assert_eq!(sink.write(&[1, 2, 3]), 3);
        assert_eq!(sink.write(&[]), 0);
        assert_eq!(ring.lock().available(), 3);
        assert_eq!(sink.available_for_write(), 13);
    }

    #[test]
    fn test_blocking_sink_zero_budget_is_partial() {
        let ring = Arc::new(Mutex::new(ByteRing::new(2).unwrap()));
        let mut sink = BlockingSink::new(Arc::clone(&ring), Duration::ZERO);
        assert_eq!(sink.write(&[1, 2, 3, 4]), 2);
        assert_eq!(sink.write(&[5]), 0);
    }

    #[test]
    fn test_blocking_sink_waits_for_budget() {
        let ring = Arc::new(Mutex::new(ByteRing::new(2).unwrap()));
        let budget = Duration::from_millis(20);
        let mut sink = BlockingSink::new(Arc::clone(&ring), budget);

        let start = Instant::now();
        assert_eq!(sink.write(&[1, 2, 3]), 2);
        assert!(start.elapsed() >= budget);
    }

    #[test]
    fn test_blocking_sink_completes_when_drained() {
        let ring = Arc::new(Mutex::new(ByteRing::new(2).unwrap()));
        let mut sink = BlockingSink::new(Arc::clone(&ring), Duration::from_secs(5));

        let reader = {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || {
                let mut received = Vec::new();
                let mut buffer = [0u8; 2];
                while received.len() < 6 {
                    let n = ring.lock().read(&mut buffer);
                    received.extend_from_slice(&buffer[..n]);
                    std::thread::yield_now();
                }
                received
            })
        };

        assert_eq!(sink.write(&[1, 2, 3, 4, 5, 6]), 6);
        assert_eq!(reader.join().unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }
}
