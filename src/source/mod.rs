//! Byte source contract and the in-memory source.
//!
//! A [`ByteSource`] is the upstream end of a pull adapter or a chain: the
//! copy engine reads from it whenever the downstream side has room.

mod memory;

pub use memory::MemorySource;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::AudioFormat;

/// Shared, lockable reference to a source.
pub type SourceHandle = Arc<Mutex<dyn ByteSource>>;

/// An origin of bytes.
///
/// `read_bytes` never blocks: it returns whatever is ready (possibly 0).
pub trait ByteSource: Send {
    /// Reads up to `buffer.len()` bytes, returning how many were read.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> usize;

    /// Number of bytes that can be read right now.
    fn available(&self) -> usize;

    /// Format of the bytes this source produces, if known.
    ///
    /// Default implementation reports an unspecified format.
    fn format(&self) -> AudioFormat {
        AudioFormat::default()
    }
}
