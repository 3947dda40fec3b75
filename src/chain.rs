//! A built output chain.

use crate::pipeline::{Stage, StreamCopy};
use crate::sink::ByteSink;
use crate::source::SourceHandle;
use crate::AudioFormat;

/// An ordered pipeline of stages, created by [`ChainBuilder`].
///
/// Data written to the chain enters the first stage; each stage writes
/// into the next. A chain built with a source can instead be driven with
/// [`copy`](Self::copy), provided it has a single stage.
///
/// # Lifecycle
///
/// 1. Created by [`ChainBuilder::build()`] (idle) or
///    [`ChainBuilder::begin()`] (started)
/// 2. [`begin()`](Self::begin) wires and starts every stage
/// 3. [`write()`](Self::write) or [`copy()`](Self::copy) moves data
/// 4. [`end()`](Self::end) stops every stage; `begin()` may follow again
///
/// [`ChainBuilder`]: crate::ChainBuilder
/// [`ChainBuilder::build()`]: crate::ChainBuilder::build
/// [`ChainBuilder::begin()`]: crate::ChainBuilder::begin
pub struct OutputChain {
    stages: Vec<Stage>,
    source: Option<SourceHandle>,
    input_format: AudioFormat,
    format: AudioFormat,
    copier: StreamCopy,
    active: bool,
}

impl OutputChain {
    pub(crate) fn new(
        stages: Vec<Stage>,
        source: Option<SourceHandle>,
        input_format: AudioFormat,
        copy_buffer_size: usize,
    ) -> Self {
        Self {
            stages,
            source,
            input_format,
            format: input_format,
            copier: StreamCopy::with_buffer_size(copy_buffer_size),
            active: false,
        }
    }

    /// Wires the stages together and starts them in order.
    ///
    /// Each stage starts with the format produced by the stage before it.
    /// Returns `false` for a chain without stages.
    pub fn begin(&mut self) -> bool {
        if self.stages.is_empty() {
            tracing::warn!("output chain: no stages to start");
            return false;
        }

        let mut format = self.input_format;
        for (index, stage) in self.stages.iter().enumerate() {
            let next = self.stages.get(index + 1).map(Stage::input);
            let resolved = stage.begin(format, next);
            tracing::debug!(
                "output chain: stage {} ({}) {} -> {}",
                index,
                stage.name(),
                format,
                resolved
            );
            format = resolved;
        }
        self.format = format;

        self.copier.end();
        if let Some(source) = &self.source {
            if self.stages.len() == 1 {
                self.copier.begin(self.stages[0].input(), source.clone());
            } else {
                tracing::warn!(
                    "output chain: source is only copied into single-stage chains, use write() with {} stages",
                    self.stages.len()
                );
            }
        }

        tracing::info!(
            "output chain: started {} stage(s), {} -> {}",
            self.stages.len(),
            self.input_format,
            self.format
        );
        self.active = true;
        true
    }

    /// Stops every stage.
    pub fn end(&mut self) {
        for stage in &self.stages {
            stage.end();
        }
        self.copier.end();
        self.active = false;
        tracing::debug!("output chain: ended");
    }

    /// Returns `true` between `begin` and `end`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Writes into the first stage.
    ///
    /// Returns 0 for a chain without stages or one that is not started.
    pub fn write(&mut self, data: &[u8]) -> usize {
        if !self.active || data.is_empty() {
            return 0;
        }
        self.stages.first().map_or(0, |stage| stage.write(data))
    }

    /// Copies one chunk from the source into the chain.
    ///
    /// Returns the number of bytes moved, or 0 if no source is wired.
    pub fn copy(&mut self) -> usize {
        if !self.active {
            return 0;
        }
        self.copier.copy()
    }

    /// The format leaving the last stage.
    ///
    /// Before the first `begin` this is the format entering the chain.
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if the chain has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl ByteSink for OutputChain {
    fn write(&mut self, data: &[u8]) -> usize {
        OutputChain::write(self, data)
    }

    fn available_for_write(&self) -> usize {
        if !self.active {
            return 0;
        }
        self.stages.first().map_or(0, Stage::available_for_write)
    }

    /// Sets the format entering the chain; a started chain passes it to the first stage.
    ///
    /// Stages that were waiting for a complete format start here, e.g. when
    /// a decoder upstream has just read a container header.
    fn set_format(&mut self, format: AudioFormat) {
        self.input_format = format;
        if !self.active {
            return;
        }
        if let Some(stage) = self.stages.first() {
            stage.set_format(format);
        }
        self.format = self
            .stages
            .iter()
            .fold(format, |upstream, stage| stage.output_format(upstream));
        tracing::debug!("output chain: renegotiated {} -> {}", format, self.format);
    }
}
