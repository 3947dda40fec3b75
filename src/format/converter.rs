//! Streaming PCM format converter.

use crate::format::{
    decode_sample, encode_sample, is_supported_bit_depth, map_channels, Resampler,
};
use crate::sink::{write_all, ByteSink, SinkHandle, StreamAssignable};
use crate::{AudioFormat, PipelineError};

/// Size of the staging buffer for converted output.
const OUTPUT_BUFFER_SIZE: usize = 1024;

/// Converted bytes waiting to be handed to the output sink.
struct Staging {
    output: Option<SinkHandle>,
    bytes: Vec<u8>,
    len: usize,
    bits: u8,
    dropped: u64,
}

impl Staging {
    fn push(&mut self, frame: &[i32]) {
        let frame_len = frame.len() * usize::from(self.bits).div_ceil(8);
        if self.len + frame_len > self.bytes.len() {
            self.flush();
        }
        for &sample in frame {
            self.len += encode_sample(sample, self.bits, &mut self.bytes[self.len..]);
        }
    }

    fn flush(&mut self) {
        if self.len == 0 {
            return;
        }
        let written = match &self.output {
            Some(output) => write_all(output, &self.bytes[..self.len]),
            None => 0,
        };
        if written < self.len {
            let lost = (self.len - written) as u64;
            self.dropped += lost;
            tracing::warn!("format converter: output accepted {} of {} bytes", written, self.len);
        }
        self.len = 0;
    }
}

/// Converts PCM between bit depths, channel counts and sample rates.
///
/// The converter is a [`ByteSink`]: bytes written in the input format come
/// out of the bound output sink in the target format. Writes may split
/// frames anywhere; an incomplete trailing frame is held until the rest
/// arrives. All buffers are sized in [`begin`](Self::begin), so steady-state
/// writes do not allocate.
///
/// The target format may leave fields unspecified (0). They are completed
/// from the input format when the converter starts, which is how chain
/// `reformat` stages inherit whatever they don't change.
///
/// # Example
///
/// ```
/// use stream_transcode::{shared, AudioFormat, ByteSink, FormatConverter, MemorySink};
///
/// let sink = shared(MemorySink::new());
/// let mut converter = FormatConverter::new(AudioFormat::new(0, 1, 0));
/// converter.set_output(sink.clone());
/// converter.begin(AudioFormat::new(8000, 2, 16), AudioFormat::new(8000, 1, 16)).unwrap();
///
/// // One stereo frame in, one mono frame out
/// converter.write(&[0x10, 0x00, 0x30, 0x00]);
/// assert_eq!(sink.lock().data(), &[0x20, 0x00]);
/// ```
pub struct FormatConverter {
    target: AudioFormat,
    from: AudioFormat,
    to: AudioFormat,
    active: bool,
    /// Started with an incomplete input format; starts on the next `set_format`.
    awaiting_format: bool,
    pending: Vec<u8>,
    frame_in: Vec<i32>,
    frame_out: Vec<i32>,
    resampler: Resampler,
    staging: Staging,
}

impl FormatConverter {
    /// Creates a converter towards `target`; zero fields are wildcards.
    pub fn new(target: AudioFormat) -> Self {
        Self {
            target,
            from: AudioFormat::default(),
            to: AudioFormat::default(),
            active: false,
            awaiting_format: false,
            pending: Vec::new(),
            frame_in: Vec::new(),
            frame_out: Vec::new(),
            resampler: Resampler::new(0, 0, 0),
            staging: Staging {
                output: None,
                bytes: Vec::new(),
                len: 0,
                bits: 0,
                dropped: 0,
            },
        }
    }

    /// The requested target, possibly with unspecified fields.
    pub fn target(&self) -> AudioFormat {
        self.target
    }

    /// The input format in use since the last `begin`.
    pub fn input_format(&self) -> AudioFormat {
        self.from
    }

    /// The resolved output format in use since the last `begin`.
    pub fn output_format(&self) -> AudioFormat {
        self.to
    }

    /// Returns `true` while the converter is started.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns `true` if the converter was started before its input format
    /// was known and is waiting for it.
    pub fn is_awaiting_format(&self) -> bool {
        self.awaiting_format
    }

    /// Total bytes the output sink refused.
    pub fn dropped_bytes(&self) -> u64 {
        self.staging.dropped
    }

    /// Binds the sink receiving converted bytes.
    pub fn set_output(&mut self, output: SinkHandle) {
        self.staging.output = Some(output);
    }

    /// Starts converting from `from` to `to`.
    ///
    /// Both formats must be complete and use a supported bit depth. The
    /// output sink, if bound, is told about `to`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteFormat`] or
    /// [`PipelineError::UnsupportedBitDepth`]; the converter stays inactive.
    pub fn begin(&mut self, from: AudioFormat, to: AudioFormat) -> Result<(), PipelineError> {
        self.active = false;
        for format in [from, to] {
            if !format.is_complete() {
                return Err(PipelineError::incomplete(format));
            }
            if !is_supported_bit_depth(format.bits_per_sample) {
                return Err(PipelineError::UnsupportedBitDepth {
                    bits: format.bits_per_sample,
                });
            }
        }

        tracing::debug!("format converter: {} -> {}", from, to);

        self.from = from;
        self.to = to;
        self.pending = Vec::with_capacity(from.bytes_per_frame());
        self.frame_in = vec![0; usize::from(from.channels)];
        self.frame_out = vec![0; usize::from(to.channels)];
        self.resampler = Resampler::new(from.sample_rate, to.sample_rate, usize::from(to.channels));
        self.staging.bits = to.bits_per_sample;
        self.staging.len = 0;
        self.staging.bytes = vec![0; OUTPUT_BUFFER_SIZE.max(to.bytes_per_frame())];

        if let Some(output) = &self.staging.output {
            output.lock().set_format(to);
        }

        self.awaiting_format = false;
        self.active = true;
        Ok(())
    }

    /// Flushes buffered output and stops.
    ///
    /// A held partial input frame is discarded.
    pub fn end(&mut self) {
        if self.active {
            self.staging.flush();
        }
        self.pending.clear();
        self.resampler.reset();
        self.awaiting_format = false;
        self.active = false;
    }

    fn convert_frame(&mut self) {
        let bytes_per_sample = self.from.bytes_per_sample();
        for (sample, bytes) in self
            .frame_in
            .iter_mut()
            .zip(self.pending.chunks_exact(bytes_per_sample))
        {
            *sample = decode_sample(bytes, self.from.bits_per_sample);
        }
        map_channels(&self.frame_in, &mut self.frame_out);

        let staging = &mut self.staging;
        self.resampler
            .push_frame(&self.frame_out, |frame| staging.push(frame));
        self.pending.clear();
    }
}

impl ByteSink for FormatConverter {
    fn write(&mut self, data: &[u8]) -> usize {
        if data.is_empty() || !self.active {
            return 0;
        }
        let Some(output) = &self.staging.output else {
            tracing::error!("format converter: no output bound");
            return 0;
        };

        if self.from == self.to {
            return output.lock().write(data);
        }

        let frame_len = self.from.bytes_per_frame();
        let mut rest = data;
        while !rest.is_empty() {
            let needed = frame_len - self.pending.len();
            let take = needed.min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if self.pending.len() == frame_len {
                self.convert_frame();
            }
        }
        self.staging.flush();

        tracing::trace!("format converter: consumed {} bytes", data.len());
        data.len()
    }

    fn available_for_write(&self) -> usize {
        self.staging
            .output
            .as_ref()
            .map_or(0, |output| output.lock().available_for_write())
    }

    /// Renegotiates the input format; a running converter restarts with it.
    ///
    /// A converter still waiting for its input format starts now.
    fn set_format(&mut self, format: AudioFormat) {
        if !self.active {
            self.from = format;
            if self.awaiting_format {
                StreamAssignable::begin(self, format);
            }
            return;
        }
        if format == self.from {
            return;
        }

        self.staging.flush();
        self.pending.clear();
        let to = self.target.completed_from(format);
        if let Err(e) = self.begin(format, to) {
            tracing::error!("format converter: cannot switch to {}: {}", format, e);
        }
    }
}

impl StreamAssignable for FormatConverter {
    fn set_output(&mut self, output: SinkHandle) {
        FormatConverter::set_output(self, output);
    }

    /// Starts with `format` as input.
    ///
    /// An incomplete `format` is not an error here: the converter waits and
    /// starts as soon as `set_format` delivers the complete one.
    fn begin(&mut self, format: AudioFormat) -> bool {
        let to = self.target.completed_from(format);
        match FormatConverter::begin(self, format, to) {
            Ok(()) => true,
            Err(PipelineError::IncompleteFormat { .. }) if !format.is_complete() => {
                tracing::debug!("format converter: waiting for the input format, got {}", format);
                self.from = format;
                self.awaiting_format = true;
                false
            }
            Err(e) => {
                tracing::error!("format converter: {}", e);
                false
            }
        }
    }

    fn end(&mut self) {
        FormatConverter::end(self);
    }
}
