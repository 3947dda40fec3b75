//! Chain stage descriptors and their resolved, wirable form.
//!
//! A chain is described as an ordered list of [`StageSpec`]s while it is
//! being built. Building resolves each descriptor into a [`Stage`] that owns
//! or shares the actual stream. Stages are wired only when the chain
//! starts: each one learns the format arriving from upstream and the input
//! of the stage after it.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::format::FormatConverter;
use crate::sink::{ByteSink, FanOut, SinkHandle, StreamAssignable};
use crate::AudioFormat;

/// Shared, lockable reference to a re-bindable stream.
pub type AssignableHandle = Arc<Mutex<dyn StreamAssignable>>;

/// Describes one stage of a chain before it is built.
pub(crate) enum StageSpec {
    /// Convert to this format; unspecified fields are inherited.
    Reformat(AudioFormat),

    /// Convert with a caller-configured converter.
    Convert(FormatConverter),

    /// A stream whose output is rebound to the next stage.
    ///
    /// The same stream is held both as a sink (the previous stage's
    /// target) and as an assignable (for rebinding and starting).
    Assignable {
        input: SinkHandle,
        stream: AssignableHandle,
    },

    /// The shared fan-out holding every registered output sink.
    FanOut,
}

impl StageSpec {
    /// Resolves the descriptor; `fan_out` backs the fan-out stage.
    pub(crate) fn resolve(self, fan_out: &Arc<Mutex<FanOut>>) -> Stage {
        match self {
            Self::Reformat(target) => Stage::format_change(FormatConverter::new(target)),
            Self::Convert(converter) => Stage::format_change(converter),
            Self::Assignable { input, stream } => Stage::Assignable { input, stream },
            Self::FanOut => Stage::FanOut(Arc::clone(fan_out)),
        }
    }
}

/// A resolved chain stage.
pub(crate) enum Stage {
    /// A format converter owned by the chain.
    FormatChange(Arc<Mutex<FormatConverter>>),

    /// An application stream rebound at start.
    Assignable {
        input: SinkHandle,
        stream: AssignableHandle,
    },

    /// Broadcast to the registered sinks.
    FanOut(Arc<Mutex<FanOut>>),
}

impl Stage {
    fn format_change(converter: FormatConverter) -> Self {
        Self::FormatChange(Arc::new(Mutex::new(converter)))
    }

    /// Short name used in logs.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::FormatChange(_) => "format change",
            Self::Assignable { .. } => "stream",
            Self::FanOut(_) => "fan-out",
        }
    }

    /// The sink the previous stage writes into.
    pub(crate) fn input(&self) -> SinkHandle {
        match self {
            Self::FormatChange(converter) => converter.clone(),
            Self::Assignable { input, .. } => Arc::clone(input),
            Self::FanOut(fan_out) => fan_out.clone(),
        }
    }

    /// Wires this stage to `next` and starts it with the upstream `format`.
    ///
    /// Returns the format leaving this stage.
    pub(crate) fn begin(&self, format: AudioFormat, next: Option<SinkHandle>) -> AudioFormat {
        match self {
            Self::FormatChange(converter) => {
                let mut converter = converter.lock();
                if let Some(next) = next {
                    converter.set_output(next);
                }
                let resolved = converter.target().completed_from(format);
                if !StreamAssignable::begin(&mut *converter, format) {
                    if format.is_complete() {
                        tracing::warn!(
                            "chain: format change {} -> {} not started",
                            format,
                            resolved
                        );
                    } else {
                        tracing::debug!("chain: format change waits for the input format");
                    }
                }
                resolved
            }
            Self::Assignable { stream, .. } => {
                let mut stream = stream.lock();
                if let Some(next) = next {
                    stream.set_output(next);
                }
                if !stream.begin(format) {
                    tracing::warn!("chain: stream stage did not start with {}", format);
                }
                format
            }
            Self::FanOut(fan_out) => {
                if next.is_some() {
                    tracing::warn!("chain: stages after the fan-out receive no data");
                }
                fan_out.lock().set_format(format);
                format
            }
        }
    }

    /// The format leaving this stage when `upstream` enters it.
    pub(crate) fn output_format(&self, upstream: AudioFormat) -> AudioFormat {
        match self {
            Self::FormatChange(converter) => converter.lock().target().completed_from(upstream),
            Self::Assignable { .. } | Self::FanOut(_) => upstream,
        }
    }

    /// Writes into this stage.
    pub(crate) fn write(&self, data: &[u8]) -> usize {
        match self {
            Self::FormatChange(converter) => converter.lock().write(data),
            Self::Assignable { input, .. } => input.lock().write(data),
            Self::FanOut(fan_out) => fan_out.lock().write(data),
        }
    }

    /// Free capacity of this stage.
    pub(crate) fn available_for_write(&self) -> usize {
        match self {
            Self::FormatChange(converter) => converter.lock().available_for_write(),
            Self::Assignable { input, .. } => input.lock().available_for_write(),
            Self::FanOut(fan_out) => fan_out.lock().available_for_write(),
        }
    }

    /// Announces a new upstream format to this stage.
    pub(crate) fn set_format(&self, format: AudioFormat) {
        match self {
            Self::FormatChange(converter) => converter.lock().set_format(format),
            Self::Assignable { input, .. } => input.lock().set_format(format),
            Self::FanOut(fan_out) => fan_out.lock().set_format(format),
        }
    }

    /// Stops this stage.
    pub(crate) fn end(&self) {
        match self {
            Self::FormatChange(converter) => converter.lock().end(),
            Self::Assignable { stream, .. } => stream.lock().end(),
            Self::FanOut(_) => {}
        }
    }
}
