//! # stream-transcode
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Single-threaded streaming audio transcoding with composable adapters.
//!
//! `stream-transcode` moves bytes between an encoded domain (compressed or
//! containerized audio) and raw PCM through pluggable [`Codec`]s. Adapters
//! can be pushed into ([`EncodedStream`]) or pulled from
//! ([`DecoderStream`]), and [`ChainBuilder`] assembles format changes,
//! application streams and fan-out to several sinks into one pipeline,
//! passing the negotiated [`AudioFormat`] from stage to stage.
//!
//! ## Quick Start
//!
//! ```rust
//! use stream_transcode::{
//!     shared, AudioFormat, ChainBuilder, DecoderStream, MemorySink, MemorySource, WavDecoder,
//!     WavEncoder, Codec,
//! };
//!
//! // A WAV stream in memory
//! let format = AudioFormat::new(16000, 2, 16);
//! let wav = shared(MemorySink::new());
//! let mut encoder = WavEncoder::new();
//! encoder.set_output(wav.clone());
//! encoder.set_format(format);
//! encoder.begin();
//! encoder.write(&[0u8; 6400]);
//! let wav = wav.lock().take();
//!
//! // Pull PCM out of it...
//! let mut decoded = DecoderStream::new(
//!     shared(MemorySource::new(wav)),
//!     shared(WavDecoder::new()),
//! );
//! decoded.begin();
//!
//! // ...and push it through a chain that downmixes to mono
//! let mono = shared(MemorySink::new());
//! let mut chain = ChainBuilder::new()
//!     .with_format(format)
//!     .reformat(AudioFormat::new(0, 1, 0))
//!     .output(mono.clone())
//!     .begin();
//!
//! let mut buffer = [0u8; 512];
//! loop {
//!     let n = decoded.read_bytes(&mut buffer);
//!     if n == 0 {
//!         break;
//!     }
//!     chain.write(&buffer[..n]);
//! }
//! assert_eq!(mono.lock().len(), 3200);
//! ```
//!
//! ## Architecture
//!
//! Everything runs on the caller's thread. Progress happens only inside
//! `write`, `read_bytes`, `available` and `copy` calls:
//!
//! - **Push**: [`EncodedStream`] hands each write to its codec, which writes
//!   to the next sink
//! - **Pull**: [`DecoderStream`] pumps its source through a decoder into a
//!   ring buffer and serves reads from there
//! - **Chains**: [`OutputChain`] wires stages at start time; format changes
//!   complete unspecified fields from upstream
//!
//! Components are shared as `Arc<Mutex<_>>` handles created with
//! [`shared()`]. Logging goes through `tracing`; install a subscriber to see it.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

mod builder;
mod chain;
pub mod codec;
mod config;
mod error;
mod event;
pub mod format;
mod pipeline;
mod sink;
pub mod source;

pub use builder::ChainBuilder;
pub use chain::OutputChain;
pub use codec::{Codec, CodecHandle, CodecRole, CopyCodec, NullCodec, WavDecoder, WavEncoder};
pub use config::{DecoderStreamConfig, DEFAULT_COPY_BUFFER_SIZE};
pub use error::PipelineError;
pub use event::{format_listener, FormatListener, ListenerHandle};
pub use format::{AudioFormat, FormatConverter};
pub use pipeline::{
    AssignableHandle, BlockingSink, ByteRing, DecoderStream, EncodedStream, StreamCopy,
};
pub use sink::{shared, write_all, ByteSink, FanOut, MemorySink, SinkHandle, StreamAssignable};
pub use source::{ByteSource, MemorySource, SourceHandle};
