//! Streaming adapters and chain plumbing.
//!
//! Push and pull adapters around a codec, plus the pieces they and the
//! chain are built from:
//!
//! ```text
//! push:  write → EncodedStream → codec → sink
//! pull:  source → StreamCopy → EncodedStream → codec → BlockingSink → ByteRing → read_bytes
//! chain: write/copy → stage → stage → … → FanOut → sinks
//! ```
//!
//! - **EncodedStream**: Hands every write to its codec, never buffers
//! - **DecoderStream**: Buffers decoded data so consumers can pull
//! - **StreamCopy**: Moves one chunk from a source to a sink per call
//! - **ByteRing / BlockingSink**: Bounded byte queue and its waiting writer
//! - **Stages**: Format change, re-bindable stream and fan-out chain nodes

mod copy;
mod decoder_stream;
mod encoded;
mod ring_buffer;
mod stage;

pub use copy::StreamCopy;
pub use decoder_stream::DecoderStream;
pub use encoded::EncodedStream;
pub use ring_buffer::{BlockingSink, ByteRing};
pub use stage::AssignableHandle;
pub(crate) use stage::{Stage, StageSpec};
