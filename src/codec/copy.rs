//! Pass-through codec.

use crate::codec::Codec;
use crate::event::{notify, ListenerHandle};
use crate::sink::SinkHandle;
use crate::AudioFormat;

/// A codec that forwards bytes unchanged.
///
/// Useful when the data on both sides is already PCM but a stage still
/// needs a codec, e.g. to announce a known format to a listener when the
/// adapter starts.
pub struct CopyCodec {
    format: AudioFormat,
    output: Option<SinkHandle>,
    listener: Option<ListenerHandle>,
}

impl CopyCodec {
    /// Creates a pass-through codec declaring `format`.
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            output: None,
            listener: None,
        }
    }
}

impl Codec for CopyCodec {
    fn begin(&mut self) {
        if self.format.is_complete() {
            notify(self.listener.as_ref(), self.format);
        }
        if let Some(output) = &self.output {
            output.lock().set_format(self.format);
        }
    }

    fn set_format(&mut self, format: AudioFormat) {
        self.format = format;
    }

    fn format(&self) -> AudioFormat {
        self.format
    }

    fn set_output(&mut self, output: SinkHandle) {
        self.output = Some(output);
    }

    fn set_format_listener(&mut self, listener: ListenerHandle) {
        self.listener = Some(listener);
    }

    fn write(&mut self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }
        match &self.output {
            Some(output) => output.lock().write(data),
            None => 0,
        }
    }

    fn mime(&self) -> Option<&'static str> {
        Some("audio/pcm")
    }
}
