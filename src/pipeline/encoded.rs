//! Push adapter: every write goes straight through a codec.

use crate::codec::{CodecHandle, CodecRole};
use crate::event::ListenerHandle;
use crate::sink::{ByteSink, SinkHandle, StreamAssignable};
use crate::{AudioFormat, PipelineError};

/// A sink that decodes or encodes whatever is written to it.
///
/// The stream pairs one codec with one output sink. Bytes written to the
/// stream are handed to the codec, which pushes its results to the output;
/// nothing is buffered here. A stream without a codec cannot be started.
///
/// # Example
///
/// ```
/// use stream_transcode::{shared, AudioFormat, ByteSink, EncodedStream, MemorySink, WavEncoder};
///
/// let file = shared(MemorySink::new());
/// let mut stream = EncodedStream::new_encoder(file.clone(), shared(WavEncoder::new()));
/// assert!(stream.begin_with_format(AudioFormat::new(16000, 1, 16)));
///
/// stream.write(&[0, 0, 1, 0]);
/// assert_eq!(file.lock().len(), 44 + 4);
/// ```
#[derive(Default)]
pub struct EncodedStream {
    role: CodecRole,
    output: Option<SinkHandle>,
    format: AudioFormat,
    listener: Option<ListenerHandle>,
    active: bool,
}

impl EncodedStream {
    /// Creates a stream decoding into `output`.
    pub fn new_decoder(output: SinkHandle, decoder: CodecHandle) -> Self {
        let mut stream = Self::default();
        stream.bind(output, CodecRole::Decoder(decoder));
        stream
    }

    /// Creates a stream encoding into `output`.
    pub fn new_encoder(output: SinkHandle, encoder: CodecHandle) -> Self {
        let mut stream = Self::default();
        stream.bind(output, CodecRole::Encoder(encoder));
        stream
    }

    /// Attaches `output` and `decoder`, then starts.
    pub fn begin_decoder(&mut self, output: SinkHandle, decoder: CodecHandle) -> bool {
        self.bind(output, CodecRole::Decoder(decoder));
        self.begin()
    }

    /// Attaches `output` and `encoder`, then starts.
    pub fn begin_encoder(&mut self, output: SinkHandle, encoder: CodecHandle) -> bool {
        self.bind(output, CodecRole::Encoder(encoder));
        self.begin()
    }

    fn bind(&mut self, output: SinkHandle, role: CodecRole) {
        self.role = role;
        self.set_output(output);
        if let Some(listener) = self.listener.clone() {
            self.role.with(|codec| codec.set_format_listener(listener));
        }
    }

    /// The format used when none is given: CD quality.
    pub fn default_config() -> AudioFormat {
        AudioFormat::CD
    }

    /// Starts the codec.
    ///
    /// Returns `false`, and stays inactive, when no codec is attached.
    pub fn begin(&mut self) -> bool {
        tracing::debug!("encoded stream: begin ({:?})", self.role);
        if !self.role.is_configured() {
            tracing::warn!("encoded stream: {}", PipelineError::NoCodec);
            return false;
        }
        self.role.with(|codec| codec.begin());
        self.active = true;
        true
    }

    /// Pushes `format` into the codec, then starts it.
    pub fn begin_with_format(&mut self, format: AudioFormat) -> bool {
        if !self.role.is_configured() {
            tracing::warn!("encoded stream: {}", PipelineError::NoCodec);
            return false;
        }
        self.format = format;
        self.role.with(|codec| codec.set_format(format));
        self.begin()
    }

    /// Stops the codec. Safe to call repeatedly.
    pub fn end(&mut self) {
        tracing::debug!("encoded stream: end");
        self.role.with(|codec| codec.end());
        self.active = false;
    }

    /// Returns `true` between `begin` and `end`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The attached codec and its role.
    pub fn role(&self) -> &CodecRole {
        &self.role
    }

    /// The format most recently pushed into the codec.
    pub fn configured_format(&self) -> AudioFormat {
        self.format
    }

    /// The format reported by the codec.
    pub fn codec_format(&self) -> AudioFormat {
        self.role.with(|codec| codec.format())
    }

    /// Registers a listener for format discoveries made by the codec.
    pub fn set_format_listener(&mut self, listener: ListenerHandle) {
        self.listener = Some(listener.clone());
        self.role.with(|codec| codec.set_format_listener(listener));
    }

    /// Rebinds the output sink of this stream and its codec.
    pub fn set_output(&mut self, output: SinkHandle) {
        self.role.with(|codec| codec.set_output(output.clone()));
        self.output = Some(output);
    }
}

impl ByteSink for EncodedStream {
    fn write(&mut self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }
        let Some(codec) = self.role.handle() else {
            tracing::error!("encoded stream: write without a codec");
            return 0;
        };
        if !self.active {
            return 0;
        }

        let consumed = codec.lock().write(data);
        tracing::trace!("encoded stream: {} of {} bytes consumed", consumed, data.len());
        consumed
    }

    fn available_for_write(&self) -> usize {
        self.output
            .as_ref()
            .map_or(0, |output| output.lock().available_for_write())
    }

    /// Records `format` and hands it to the codec.
    fn set_format(&mut self, format: AudioFormat) {
        self.format = format;
        self.role.with(|codec| codec.set_format(format));
    }
}

impl StreamAssignable for EncodedStream {
    fn set_output(&mut self, output: SinkHandle) {
        EncodedStream::set_output(self, output);
    }

    fn begin(&mut self, format: AudioFormat) -> bool {
        self.begin_with_format(format)
    }

    fn end(&mut self) {
        EncodedStream::end(self);
    }
}
