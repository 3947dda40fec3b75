//! Builder for output chains.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::chain::OutputChain;
use crate::config::DEFAULT_COPY_BUFFER_SIZE;
use crate::format::FormatConverter;
use crate::pipeline::StageSpec;
use crate::sink::{FanOut, SinkHandle, StreamAssignable};
use crate::source::SourceHandle;
use crate::AudioFormat;

/// Builder for configuring an [`OutputChain`].
///
/// Stages are appended in the order the methods are called. Nothing is
/// wired until the chain starts, at which point each stage is connected to
/// the input of the next and the audio format is passed along.
///
/// All sinks registered with [`output`](Self::output) share one fan-out
/// stage, appended where the first `output` call happens.
///
/// # Example
///
/// ```
/// use stream_transcode::{shared, AudioFormat, ByteSink, ChainBuilder, MemorySink};
///
/// let speaker = shared(MemorySink::new());
/// let recorder = shared(MemorySink::new());
///
/// let mut chain = ChainBuilder::new()
///     .with_format(AudioFormat::new(48000, 2, 16))
///     .reformat(AudioFormat::new(0, 1, 0))
///     .output(speaker.clone())
///     .output(recorder.clone())
///     .begin();
///
/// assert_eq!(chain.format(), AudioFormat::new(48000, 1, 16));
///
/// // One stereo frame in, one mono frame out on both sinks
/// chain.write(&[0x10, 0x00, 0x30, 0x00]);
/// assert_eq!(speaker.lock().data(), &[0x20, 0x00]);
/// assert_eq!(recorder.lock().data(), &[0x20, 0x00]);
/// ```
#[must_use]
pub struct ChainBuilder {
    /// Upstream source pumped by [`OutputChain::copy`].
    source: Option<SourceHandle>,
    /// Format entering the first stage.
    format: AudioFormat,
    /// Stage descriptors, in order.
    stages: Vec<StageSpec>,
    /// Sinks registered with `output`.
    fan_out: Arc<Mutex<FanOut>>,
    /// Whether the fan-out stage has been appended.
    fan_out_added: bool,
    /// Chunk size for the copy engine.
    copy_buffer_size: usize,
}

impl Default for ChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainBuilder {
    /// Creates a builder for a chain without an upstream source.
    ///
    /// Data enters such a chain through [`OutputChain::write`].
    pub fn new() -> Self {
        Self {
            source: None,
            format: AudioFormat::default(),
            stages: Vec::new(),
            fan_out: Arc::new(Mutex::new(FanOut::new())),
            fan_out_added: false,
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
        }
    }

    /// Creates a builder reading from `source`, in the format it reports.
    #[allow(clippy::should_implement_trait)]
    pub fn from(source: SourceHandle) -> Self {
        let format = source.lock().format();
        Self::from_with_format(source, format)
    }

    /// Creates a builder reading from `source`, in an explicitly given format.
    pub fn from_with_format(source: SourceHandle, format: AudioFormat) -> Self {
        let mut builder = Self::new();
        builder.source = Some(source);
        builder.format = format;
        builder
    }

    /// Sets the format of the data entering the chain.
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the chunk size used when copying from the source.
    ///
    /// Default: [`DEFAULT_COPY_BUFFER_SIZE`]
    pub fn copy_buffer_size(mut self, size: usize) -> Self {
        self.copy_buffer_size = size;
        self
    }

    /// Appends a stage converting to `target`.
    ///
    /// Fields left at 0 keep the value arriving from upstream.
    pub fn reformat(mut self, target: AudioFormat) -> Self {
        self.stages.push(StageSpec::Reformat(target));
        self
    }

    /// Appends a stage using `converter`, which the chain takes over.
    pub fn convert_format(mut self, converter: FormatConverter) -> Self {
        self.stages.push(StageSpec::Convert(converter));
        self
    }

    /// Appends an application stream whose output is rebound to the next stage.
    ///
    /// The stream receives the current format when the chain starts and
    /// passes it on unchanged.
    pub fn convert<S>(mut self, stream: Arc<Mutex<S>>) -> Self
    where
        S: StreamAssignable + 'static,
    {
        let input: SinkHandle = stream.clone();
        self.stages.push(StageSpec::Assignable { input, stream });
        self
    }

    /// Registers `sink` with the chain's fan-out.
    ///
    /// The fan-out stage is appended on the first call only; later calls
    /// add more targets to it.
    pub fn output(mut self, sink: SinkHandle) -> Self {
        self.fan_out.lock().add(sink);
        if !self.fan_out_added {
            self.fan_out_added = true;
            self.stages.push(StageSpec::FanOut);
        }
        self
    }

    /// Number of stages appended so far.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Resolves the descriptors into an unstarted chain.
    pub fn build(self) -> OutputChain {
        let stages = self
            .stages
            .into_iter()
            .map(|spec| spec.resolve(&self.fan_out))
            .collect();

        OutputChain::new(stages, self.source, self.format, self.copy_buffer_size)
    }

    /// Builds the chain and starts it.
    pub fn begin(self) -> OutputChain {
        let mut chain = self.build();
        chain.begin();
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{shared, MemorySink};
    use crate::source::MemorySource;

    #[test]
    fn test_output_appends_fan_out_once() {
        let a = shared(MemorySink::new());
        let b = shared(MemorySink::new());

        let builder = ChainBuilder::new()
            .output(a.clone())
            .output(a.clone())
            .output(b.clone());

        assert_eq!(builder.stage_count(), 1);
        assert_eq!(builder.fan_out.lock().len(), 3);
    }

    #[test]
    fn test_stages_in_call_order() {
        let builder = ChainBuilder::new()
            .reformat(AudioFormat::new(16000, 0, 0))
            .convert_format(FormatConverter::new(AudioFormat::new(0, 1, 0)))
            .output(shared(MemorySink::new()));

        assert_eq!(builder.stage_count(), 3);
        assert!(matches!(builder.stages[0], StageSpec::Reformat(_)));
        assert!(matches!(builder.stages[1], StageSpec::Convert(_)));
        assert!(matches!(builder.stages[2], StageSpec::FanOut));
    }

    #[test]
    fn test_from_seeds_format() {
        let format = AudioFormat::new(22050, 1, 16);
        let source = shared(MemorySource::silence(format, 10));
        let chain = ChainBuilder::from(source).build();
        assert_eq!(chain.format(), format);
    }

    #[test]
    fn test_from_with_format_overrides() {
        let source = shared(MemorySource::new(vec![0u8; 4]));
        let chain = ChainBuilder::from_with_format(source, AudioFormat::CD).build();
        assert_eq!(chain.format(), AudioFormat::CD);
    }

    #[test]
    fn test_convert_registers_assignable() {
        let converter = shared(FormatConverter::new(AudioFormat::default()));
        let builder = ChainBuilder::new().convert(converter);
        assert!(matches!(builder.stages[0], StageSpec::Assignable { .. }));
    }
}
