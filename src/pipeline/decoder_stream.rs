//! Pull adapter: read decoded PCM out of an encoded source.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::codec::CodecHandle;
use crate::config::DecoderStreamConfig;
use crate::event::ListenerHandle;
use crate::pipeline::{BlockingSink, ByteRing, EncodedStream, StreamCopy};
use crate::sink::SinkHandle;
use crate::source::SourceHandle;
use crate::{AudioFormat, PipelineError};

/// Ring capacity of a default-configured stream: 20 segments of 512 bytes.
const DEFAULT_RING_CAPACITY: NonZeroUsize = match NonZeroUsize::new(512 * 20) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Reads decoded audio from an encoded byte source.
///
/// Internally the stream pumps encoded bytes from the source into an
/// [`EncodedStream`], whose decoder writes PCM into a ring buffer. Reads
/// are served from that ring and, with auto-reload on, refill it whenever
/// it runs dry. This costs the ring's memory compared to pushing through
/// an [`EncodedStream`] directly, but lets a consumer pull at its own pace.
///
/// # Example
///
/// ```
/// use stream_transcode::{shared, CopyCodec, AudioFormat, DecoderStream, MemorySource};
///
/// let source = shared(MemorySource::new(vec![7u8; 3000]));
/// let mut stream = DecoderStream::new(source, shared(CopyCodec::new(AudioFormat::CD)));
/// assert!(stream.begin());
///
/// let mut pcm = Vec::new();
/// let mut buffer = [0u8; 256];
/// loop {
///     let n = stream.read_bytes(&mut buffer);
///     if n == 0 {
///         break;
///     }
///     pcm.extend_from_slice(&buffer[..n]);
/// }
/// assert_eq!(pcm.len(), 3000);
/// ```
pub struct DecoderStream {
    source: Option<SourceHandle>,
    decoder: Option<CodecHandle>,
    ring: Arc<Mutex<ByteRing>>,
    sink: SinkHandle,
    stream: Arc<Mutex<EncodedStream>>,
    copier: StreamCopy,
    listener: Option<ListenerHandle>,
    wait_budget: Duration,
    auto_reload: bool,
    active: bool,
}

impl DecoderStream {
    /// Creates a stream decoding `source` with `decoder`, using the default configuration.
    pub fn new(source: SourceHandle, decoder: CodecHandle) -> Self {
        let mut stream = Self::default();
        stream.source = Some(source);
        stream.decoder = Some(decoder);
        stream
    }

    /// Creates an unconnected stream with a custom configuration.
    ///
    /// Attach the source and decoder with [`begin_with`](Self::begin_with).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidCapacity`] if the configured ring
    /// capacity is zero or overflows a `usize`.
    pub fn with_config(config: &DecoderStreamConfig) -> Result<Self, PipelineError> {
        let capacity = config.capacity().and_then(NonZeroUsize::new).ok_or_else(|| {
            PipelineError::invalid_capacity(config.buffer_size.saturating_mul(config.buffer_count))
        })?;
        Ok(Self::build(config, capacity))
    }

    fn build(config: &DecoderStreamConfig, capacity: NonZeroUsize) -> Self {
        let ring = Arc::new(Mutex::new(ByteRing::with_capacity(capacity)));
        let sink: SinkHandle = Arc::new(Mutex::new(BlockingSink::new(
            Arc::clone(&ring),
            config.wait_budget,
        )));

        Self {
            source: None,
            decoder: None,
            ring,
            sink,
            stream: Arc::new(Mutex::new(EncodedStream::default())),
            copier: StreamCopy::with_buffer_size(config.copy_buffer_size),
            listener: None,
            wait_budget: config.wait_budget,
            auto_reload: config.auto_reload,
            active: false,
        }
    }

    /// Attaches `source` and `decoder`, then starts.
    pub fn begin_with(&mut self, source: SourceHandle, decoder: CodecHandle) -> bool {
        self.source = Some(source);
        self.decoder = Some(decoder);
        self.begin()
    }

    /// Starts decoding.
    ///
    /// With auto-reload on, the ring is filled right away. Returns `false`
    /// if no source or no decoder is attached.
    pub fn begin(&mut self) -> bool {
        tracing::debug!("decoder stream: begin");
        let Some(source) = self.source.clone() else {
            tracing::error!("decoder stream: {}", PipelineError::NoSource);
            return false;
        };
        let Some(decoder) = self.decoder.clone() else {
            tracing::error!("decoder stream: {}", PipelineError::NoCodec);
            return false;
        };

        {
            let mut stream = self.stream.lock();
            if let Some(listener) = &self.listener {
                stream.set_format_listener(listener.clone());
            }
            if !stream.begin_decoder(self.sink.clone(), decoder) {
                return false;
            }
        }
        self.copier.begin(self.stream.clone(), source);
        self.ring.lock().reset();

        if self.auto_reload {
            self.refill();
        }
        self.active = true;
        true
    }

    /// Stops decoding and discards buffered data.
    pub fn end(&mut self) {
        tracing::debug!("decoder stream: end");
        self.ring.lock().reset();
        self.stream.lock().end();
        self.copier.end();
        self.active = false;
    }

    /// Returns `true` between `begin` and `end`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Pumps the source until decoded data is buffered.
    ///
    /// Stops as soon as the ring holds something, or when the source has
    /// nothing more to give. Returns the number of encoded bytes pumped.
    pub fn refill(&mut self) -> usize {
        let mut pumped = 0;
        loop {
            let needs_data = {
                let ring = self.ring.lock();
                ring.is_empty() && !ring.is_full()
            };
            if !needs_data {
                break;
            }

            let moved = self.copier.copy();
            if moved == 0 {
                break;
            }
            pumped += moved;
        }
        tracing::trace!("decoder stream: refill pumped {} bytes", pumped);
        pumped
    }

    /// Reads already-decoded bytes only; never touches the source.
    pub fn try_read(&mut self, buffer: &mut [u8]) -> usize {
        self.ring.lock().read(buffer)
    }

    /// Reads decoded bytes, refilling once if nothing is buffered.
    pub fn read_bytes(&mut self, buffer: &mut [u8]) -> usize {
        if !self.active || buffer.is_empty() {
            return 0;
        }

        let mut read = self.try_read(buffer);
        if read == 0 && self.auto_reload {
            self.refill();
            read = self.try_read(buffer);
        }

        if read == 0 {
            tracing::debug!("decoder stream: no data available");
        }
        read
    }

    /// Number of decoded bytes ready to read, refilling once if none are.
    ///
    /// Buffered bytes are not consumed.
    pub fn available(&mut self) -> usize {
        let mut available = self.ring.lock().available();
        if available == 0 && self.auto_reload {
            self.refill();
            available = self.ring.lock().available();
        }
        available
    }

    /// Returns `true` if the stream is active and has data to read.
    pub fn is_readable(&mut self) -> bool {
        self.active && self.available() > 0
    }

    /// Returns `true` if no decoded data is buffered.
    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }

    /// Performs one cooperative copy step.
    ///
    /// If the ring has room, pumps one chunk from the source and reports
    /// whether decoded data is now buffered. Otherwise yields the thread and
    /// returns `false`.
    pub fn copy(&mut self) -> bool {
        let has_room = self.ring.lock().available_for_write() > 0;
        if !has_room {
            std::thread::yield_now();
            return false;
        }

        self.copier.copy();
        let buffered = self.ring.lock().available();
        tracing::debug!("decoder stream: {} bytes buffered", buffered);
        buffered > 0
    }

    /// Turns automatic refilling on reads on or off.
    pub fn set_auto_reload(&mut self, auto_reload: bool) {
        self.auto_reload = auto_reload;
    }

    /// Registers a listener for formats discovered by the decoder.
    pub fn set_format_listener(&mut self, listener: ListenerHandle) {
        self.listener = Some(listener.clone());
        self.stream.lock().set_format_listener(listener);
    }

    /// The format reported by the decoder.
    pub fn format(&self) -> AudioFormat {
        self.decoder
            .as_ref()
            .map_or_else(AudioFormat::default, |decoder| decoder.lock().format())
    }

    /// Ring capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    /// Replaces the ring with one of `capacity` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ResizeWhileActive`] while the stream is
    /// started, or [`PipelineError::InvalidCapacity`] for zero.
    pub fn resize(&mut self, capacity: usize) -> Result<(), PipelineError> {
        if self.active {
            return Err(PipelineError::ResizeWhileActive);
        }
        let ring = ByteRing::new(capacity)?;
        tracing::debug!("decoder stream: ring resized to {} bytes", capacity);
        *self.ring.lock() = ring;
        Ok(())
    }

    /// How long a decoder write waits for ring space.
    pub fn wait_budget(&self) -> Duration {
        self.wait_budget
    }
}

impl Default for DecoderStream {
    /// An unconnected stream with the default configuration.
    fn default() -> Self {
        Self::build(&DecoderStreamConfig::default(), DEFAULT_RING_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CopyCodec, WavDecoder, WavEncoder, WAV_HEADER_SIZE};
    use crate::sink::{shared, MemorySink};
    use crate::source::MemorySource;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn copy_stream(data: Vec<u8>) -> DecoderStream {
        DecoderStream::new(
            shared(MemorySource::new(data)),
            shared(CopyCodec::new(AudioFormat::CD)),
        )
    }

    fn read_all(stream: &mut DecoderStream) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buffer = [0u8; 300];
        loop {
            let n = stream.read_bytes(&mut buffer);
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buffer[..n]);
        }
    }

    #[test]
    fn test_default_capacity_matches_config() {
        assert_eq!(
            Some(DEFAULT_RING_CAPACITY.get()),
            DecoderStreamConfig::default().capacity()
        );
        assert_eq!(DecoderStream::default().capacity(), 10240);
    }

    #[test]
    fn test_default_wait_budget() {
        assert_eq!(DecoderStream::default().wait_budget(), Duration::from_millis(2000));
    }

    #[test]
    fn test_begin_without_source_fails() {
        let mut stream = DecoderStream::default();
        assert!(!stream.begin());
        assert!(!stream.is_active());
    }

    #[test]
    fn test_begin_fills_ring() {
        let mut stream = copy_stream(pattern(5000));
        assert!(stream.begin());
        assert!(!stream.is_empty());
        assert_eq!(stream.available(), 1024);
    }

    #[test]
    fn test_available_is_non_destructive() {
        let mut stream = copy_stream(pattern(5000));
        stream.begin();
        assert_eq!(stream.available(), stream.available());

        let mut buffer = [0u8; 100];
        let before = stream.available();
        assert_eq!(stream.read_bytes(&mut buffer), 100);
        assert_eq!(stream.available(), before - 100);
    }

    #[test]
    fn test_reads_everything_in_order() {
        let data = pattern(25_000);
        let mut stream = copy_stream(data.clone());
        stream.begin();
        assert_eq!(read_all(&mut stream), data);
        assert!(!stream.is_readable());
    }

    #[test]
    fn test_zero_length_read() {
        let mut stream = copy_stream(pattern(10));
        stream.begin();
        assert_eq!(stream.read_bytes(&mut []), 0);
        assert_eq!(stream.available(), 10);
    }

    #[test]
    fn test_inactive_read_returns_zero() {
        let mut stream = copy_stream(pattern(10));
        let mut buffer = [0u8; 4];
        assert_eq!(stream.read_bytes(&mut buffer), 0);
    }

    #[test]
    fn test_end_then_begin() {
        let mut stream = copy_stream(pattern(4000));
        stream.begin();
        stream.end();

        let mut buffer = [0u8; 16];
        assert_eq!(stream.read_bytes(&mut buffer), 0);
        assert!(!stream.is_readable());

        assert!(stream.begin());
        assert_eq!(stream.read_bytes(&mut buffer), 16);
    }

    #[test]
    fn test_manual_copy_without_auto_reload() {
        let mut stream = copy_stream(pattern(100));
        stream.set_auto_reload(false);
        stream.begin();

        let mut buffer = [0u8; 100];
        assert!(stream.is_empty());
        assert_eq!(stream.read_bytes(&mut buffer), 0);

        assert!(stream.copy());
        assert_eq!(stream.try_read(&mut buffer), 100);
        assert!(!stream.copy());
    }

    #[test]
    fn test_copy_yields_when_full() {
        let config = DecoderStreamConfig {
            buffer_size: 8,
            buffer_count: 1,
            wait_budget: Duration::ZERO,
            auto_reload: false,
            ..Default::default()
        };
        let mut stream = DecoderStream::with_config(&config).unwrap();
        stream.begin_with(
            shared(MemorySource::new(pattern(100))),
            shared(CopyCodec::new(AudioFormat::CD)),
        );

        assert!(stream.copy());
        assert_eq!(stream.available(), 8);
        assert!(!stream.copy());
    }

    #[test]
    fn test_refill_stops_when_source_exhausted() {
        let mut stream = copy_stream(Vec::new());
        stream.begin();
        assert_eq!(stream.refill(), 0);
        assert_eq!(stream.available(), 0);
    }

    #[test]
    fn test_resize() {
        let mut stream = copy_stream(pattern(10));
        assert_eq!(stream.resize(0), Err(PipelineError::InvalidCapacity { capacity: 0 }));
        assert_eq!(stream.resize(64), Ok(()));
        assert_eq!(stream.capacity(), 64);

        stream.begin();
        assert_eq!(stream.resize(128), Err(PipelineError::ResizeWhileActive));
        assert_eq!(stream.capacity(), 64);
    }

    #[test]
    fn test_with_config_rejects_zero_capacity() {
        let config = DecoderStreamConfig {
            buffer_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            DecoderStream::with_config(&config),
            Err(PipelineError::InvalidCapacity { capacity: 0 })
        ));
    }

    #[test]
    fn test_with_config_rejects_overflowing_capacity() {
        let config = DecoderStreamConfig {
            buffer_size: usize::MAX,
            buffer_count: 2,
            ..Default::default()
        };
        assert!(matches!(
            DecoderStream::with_config(&config),
            Err(PipelineError::InvalidCapacity { capacity: usize::MAX })
        ));
    }

    #[test]
    fn test_wav_format_discovery() {
        let format = AudioFormat::new(16000, 1, 16);
        let pcm = pattern(2000);
        let mut header = [0u8; WAV_HEADER_SIZE];
        WavEncoder::write_header(format, pcm.len() as u32, &mut header);
        let mut wav = header.to_vec();
        wav.extend_from_slice(&pcm);

        let listener = shared(MemorySink::new());
        let mut stream = DecoderStream::default();
        stream.set_format_listener(listener.clone());
        assert!(stream.begin_with(shared(MemorySource::new(wav)), shared(WavDecoder::new())));

        assert_eq!(stream.format(), format);
        assert_eq!(listener.lock().notifications(), &[format]);
        assert_eq!(read_all(&mut stream), pcm);
    }
}
