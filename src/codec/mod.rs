//! Codec plugin contract.
//!
//! A [`Codec`] turns bytes in one domain into bytes in another and pushes
//! the result to its output sink. Decoders go from encoded data to PCM,
//! encoders from PCM to encoded data; the adapters only care which role a
//! codec plays, which is recorded by [`CodecRole`].
//!
//! Built-in codecs:
//!
//! - [`NullCodec`]: placeholder used before a real codec is configured
//! - [`CopyCodec`]: pass-through with a declared format
//! - [`WavDecoder`] / [`WavEncoder`]: RIFF/WAVE PCM container

mod copy;
mod wav;

pub use copy::CopyCodec;
pub use wav::{WavDecoder, WavEncoder, WAV_HEADER_SIZE};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::ListenerHandle;
use crate::sink::SinkHandle;
use crate::AudioFormat;

/// Shared, lockable reference to a codec.
pub type CodecHandle = Arc<Mutex<dyn Codec>>;

/// A streaming byte-in/byte-out transform.
///
/// # Implementation Notes
///
/// - `write` consumes input and pushes any produced output to the sink set
///   with `set_output`. It returns the number of input bytes consumed.
/// - A zero-length write must return 0 and have no side effect
/// - `begin` may be called again after `end`
/// - Decoders that discover the format from the stream announce it to the
///   listener registered with `set_format_listener`
///
/// # Example
///
/// ```
/// use stream_transcode::{ByteSink, Codec, SinkHandle};
///
/// /// Inverts every byte.
/// #[derive(Default)]
/// struct Invert {
///     output: Option<SinkHandle>,
///     scratch: [u8; 32],
/// }
///
/// impl Codec for Invert {
///     fn set_output(&mut self, output: SinkHandle) {
///         self.output = Some(output);
///     }
///
///     fn write(&mut self, data: &[u8]) -> usize {
///         let Some(output) = &self.output else { return 0 };
///         let len = data.len().min(self.scratch.len());
///         for (out, byte) in self.scratch.iter_mut().zip(&data[..len]) {
///             *out = !byte;
///         }
///         output.lock().write(&self.scratch[..len])
///     }
/// }
/// ```
pub trait Codec: Send {
    /// Allocates resources; may announce an initial format.
    fn begin(&mut self) {}

    /// Releases resources.
    fn end(&mut self) {}

    /// Stores the desired format.
    ///
    /// Encoders use this to configure themselves; decoders that learn the
    /// format from the stream may ignore it.
    fn set_format(&mut self, _format: AudioFormat) {}

    /// The format this codec currently produces or expects.
    fn format(&self) -> AudioFormat {
        AudioFormat::default()
    }

    /// Defines where produced bytes go.
    fn set_output(&mut self, output: SinkHandle);

    /// Registers a listener for format discoveries.
    ///
    /// Default implementation ignores the listener.
    fn set_format_listener(&mut self, _listener: ListenerHandle) {}

    /// Transforms `data`, returning the number of input bytes consumed.
    fn write(&mut self, data: &[u8]) -> usize;

    /// MIME type of the encoded side, if any.
    fn mime(&self) -> Option<&'static str> {
        None
    }

    /// Returns `false` for placeholder codecs.
    fn is_valid(&self) -> bool {
        true
    }
}

/// Placeholder codec used wherever no real codec is configured yet.
///
/// It accepts everything and produces nothing, has no MIME type, and
/// reports itself as invalid. [`write_silence`](Self::write_silence) fills a
/// caller buffer with silence for callers that need PCM out of an
/// unconfigured decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCodec;

impl NullCodec {
    /// Zero-fills `buffer` and reports its whole length.
    pub fn write_silence(&mut self, buffer: &mut [u8]) -> usize {
        buffer.fill(0);
        buffer.len()
    }
}

impl Codec for NullCodec {
    fn set_output(&mut self, _output: SinkHandle) {}

    fn write(&mut self, data: &[u8]) -> usize {
        data.len()
    }

    fn is_valid(&self) -> bool {
        false
    }
}

/// The role a codec plays inside an adapter.
///
/// `Null` is the default until a decoder or encoder is attached, so an
/// adapter always has something to call into and can test
/// [`is_configured`](Self::is_configured) instead of checking for a
/// missing codec.
#[derive(Clone, Default)]
pub enum CodecRole {
    /// No codec configured.
    #[default]
    Null,
    /// Turns encoded data into PCM.
    Decoder(CodecHandle),
    /// Turns PCM into encoded data.
    Encoder(CodecHandle),
}

impl CodecRole {
    /// Returns `true` if a decoder or encoder is attached.
    pub fn is_configured(&self) -> bool {
        !matches!(self, Self::Null)
    }

    /// Returns `true` for the decoder role.
    pub fn is_decoder(&self) -> bool {
        matches!(self, Self::Decoder(_))
    }

    /// Returns `true` for the encoder role.
    pub fn is_encoder(&self) -> bool {
        matches!(self, Self::Encoder(_))
    }

    /// The attached codec, if any.
    pub fn handle(&self) -> Option<&CodecHandle> {
        match self {
            Self::Null => None,
            Self::Decoder(codec) | Self::Encoder(codec) => Some(codec),
        }
    }

    /// Runs `f` against the attached codec, or a [`NullCodec`].
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Codec) -> R) -> R {
        match self.handle() {
            Some(codec) => f(&mut *codec.lock()),
            None => f(&mut NullCodec),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Decoder(_) => "decoder",
            Self::Encoder(_) => "encoder",
        }
    }
}

impl std::fmt::Debug for CodecRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CodecRole::{}", self.name())
    }
}
