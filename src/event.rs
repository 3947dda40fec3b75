//! Format change notifications.
//!
//! Codecs often learn the real format of a stream only after they have
//! started, e.g. when a container header arrives. They report it to a
//! registered [`FormatListener`] so downstream stages can reconfigure.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::AudioFormat;

/// Receives notifications when a stream's audio format is discovered or
/// renegotiated.
///
/// # Example
///
/// ```
/// use stream_transcode::{AudioFormat, FormatListener};
///
/// struct LogListener;
///
/// impl FormatListener for LogListener {
///     fn on_format_change(&mut self, format: AudioFormat) {
///         println!("now playing {format}");
///     }
/// }
/// ```
pub trait FormatListener: Send {
    /// Called with the new format.
    fn on_format_change(&mut self, format: AudioFormat);
}

/// Shared, lockable reference to a listener.
pub type ListenerHandle = Arc<Mutex<dyn FormatListener>>;

/// Adapts a closure into a [`FormatListener`].
struct ClosureListener<F>(F);

impl<F> FormatListener for ClosureListener<F>
where
    F: FnMut(AudioFormat) + Send,
{
    fn on_format_change(&mut self, format: AudioFormat) {
        (self.0)(format);
    }
}

/// Creates a [`ListenerHandle`] from a closure.
///
/// # Example
///
/// ```
/// use stream_transcode::{format_listener, AudioFormat};
///
/// let listener = format_listener(|format: AudioFormat| {
///     println!("format changed: {format}");
/// });
/// listener.lock().on_format_change(AudioFormat::CD);
/// ```
pub fn format_listener<F>(f: F) -> ListenerHandle
where
    F: FnMut(AudioFormat) + Send + 'static,
{
    Arc::new(Mutex::new(ClosureListener(f)))
}

/// Forwards `format` to `listener`, if one is registered.
pub(crate) fn notify(listener: Option<&ListenerHandle>, format: AudioFormat) {
    if let Some(listener) = listener {
        tracing::debug!("format change: {}", format);
        listener.lock().on_format_change(format);
    }
}
