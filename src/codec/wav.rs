//! RIFF/WAVE PCM container codec.
//!
//! See: <http://soundfile.sapp.org/doc/WaveFormat/>

use crate::codec::Codec;
use crate::event::{notify, ListenerHandle};
use crate::sink::{write_all, SinkHandle};
use crate::{AudioFormat, PipelineError};

/// Size of the canonical WAV header in bytes (RIFF + fmt + data chunk headers).
pub const WAV_HEADER_SIZE: usize = 44;

/// Size of the RIFF container header ("RIFF", size, "WAVE").
const RIFF_HEADER_SIZE: usize = 12;

/// Size of a chunk header (id + size).
const CHUNK_HEADER_SIZE: usize = 8;

/// Size of the fmt chunk data (16 bytes for PCM).
const WAV_FMT_CHUNK_SIZE: u32 = 16;

/// Audio format code for PCM (uncompressed).
const WAV_FORMAT_PCM: u16 = 1;

/// Audio format code for WAVE_FORMAT_EXTENSIBLE.
const WAV_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Data size written when the final length is unknown.
///
/// A stream cannot seek back to patch the header, so the encoder claims the
/// largest size that still keeps the RIFF size field in range.
const STREAMING_DATA_SIZE: u32 = u32::MAX - (WAV_HEADER_SIZE as u32 - 8);

/// Where the decoder is within the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Riff,
    ChunkHeader,
    Fmt { size: u32 },
    Skip { remaining: u64 },
    /// Inside the data chunk; `remaining` is `None` for a streaming header.
    Data { remaining: Option<u64>, pad: bool },
    Invalid,
}

/// Decodes a WAV stream into raw PCM.
///
/// The header is parsed incrementally, so the stream may arrive in pieces
/// of any size. Once the fmt chunk is read the discovered format is
/// announced to the format listener and the output sink; everything inside
/// the data chunk is forwarded unchanged. Unknown chunks are skipped.
///
/// # Example
///
/// ```
/// use stream_transcode::{shared, AudioFormat, Codec, MemorySink, WavDecoder, WavEncoder};
///
/// // Produce a tiny WAV stream...
/// let wav = shared(MemorySink::new());
/// let mut encoder = WavEncoder::new();
/// encoder.set_output(wav.clone());
/// encoder.set_format(AudioFormat::new(8000, 1, 16));
/// encoder.begin();
/// encoder.write(&[1, 0, 2, 0]);
///
/// // ...and decode it again.
/// let pcm = shared(MemorySink::new());
/// let mut decoder = WavDecoder::new();
/// decoder.set_output(pcm.clone());
/// decoder.begin();
/// decoder.write(wav.lock().data());
///
/// assert_eq!(decoder.format(), AudioFormat::new(8000, 1, 16));
/// assert_eq!(pcm.lock().data(), &[1, 0, 2, 0]);
/// ```
pub struct WavDecoder {
    state: ParseState,
    header: [u8; WAV_FMT_CHUNK_SIZE as usize],
    filled: usize,
    format: AudioFormat,
    output: Option<SinkHandle>,
    listener: Option<ListenerHandle>,
}

impl WavDecoder {
    /// Creates a decoder waiting for a RIFF header.
    pub fn new() -> Self {
        Self {
            state: ParseState::Riff,
            header: [0; WAV_FMT_CHUNK_SIZE as usize],
            filled: 0,
            format: AudioFormat::default(),
            output: None,
            listener: None,
        }
    }

    /// Returns `true` once the data chunk has been reached.
    pub fn is_in_data(&self) -> bool {
        matches!(self.state, ParseState::Data { .. })
    }

    /// Collects header bytes from `rest` until `need` bytes are buffered.
    fn fill(&mut self, rest: &mut &[u8], need: usize) -> bool {
        let take = (need - self.filled).min(rest.len());
        self.header[self.filled..self.filled + take].copy_from_slice(&rest[..take]);
        self.filled += take;
        *rest = &rest[take..];

        if self.filled == need {
            self.filled = 0;
            true
        } else {
            false
        }
    }

    fn parse_riff(&mut self) -> ParseState {
        if &self.header[0..4] == b"RIFF" && &self.header[8..12] == b"WAVE" {
            ParseState::ChunkHeader
        } else {
            tracing::warn!("wav decoder: stream does not start with a RIFF/WAVE header");
            ParseState::Invalid
        }
    }

    fn parse_chunk_header(&self) -> ParseState {
        let size = u32::from_le_bytes([
            self.header[4],
            self.header[5],
            self.header[6],
            self.header[7],
        ]);

        match &self.header[0..4] {
            b"fmt " if size >= WAV_FMT_CHUNK_SIZE => ParseState::Fmt { size },
            b"fmt " => {
                tracing::warn!("wav decoder: fmt chunk too short ({} bytes)", size);
                ParseState::Invalid
            }
            b"data" if size == STREAMING_DATA_SIZE || size == u32::MAX => ParseState::Data {
                remaining: None,
                pad: false,
            },
            b"data" if size == 0 => ParseState::ChunkHeader,
            b"data" => ParseState::Data {
                remaining: Some(u64::from(size)),
                pad: size & 1 == 1,
            },
            id => {
                tracing::debug!(
                    "wav decoder: skipping chunk {:?} ({} bytes)",
                    String::from_utf8_lossy(id),
                    size
                );
                // Chunks are padded to an even size
                ParseState::Skip {
                    remaining: u64::from(size) + u64::from(size & 1),
                }
            }
        }
    }

    fn parse_fmt(&mut self, size: u32) -> ParseState {
        let h = &self.header;
        let code = u16::from_le_bytes([h[0], h[1]]);
        let channels = u16::from_le_bytes([h[2], h[3]]);
        let sample_rate = u32::from_le_bytes([h[4], h[5], h[6], h[7]]);
        let bits = u16::from_le_bytes([h[14], h[15]]);

        if code != WAV_FORMAT_PCM && code != WAV_FORMAT_EXTENSIBLE {
            tracing::warn!("wav decoder: unsupported format code {:#06x}", code);
            return ParseState::Invalid;
        }
        let channels = match u8::try_from(channels) {
            Ok(channels) if channels > 0 => channels,
            _ => {
                tracing::warn!("wav decoder: {}", PipelineError::UnsupportedChannels { channels });
                return ParseState::Invalid;
            }
        };
        let Ok(bits) = u8::try_from(bits) else {
            tracing::warn!("wav decoder: unsupported bits per sample: {}", bits);
            return ParseState::Invalid;
        };

        self.format = AudioFormat::new(sample_rate, channels, bits);
        tracing::debug!("wav decoder: discovered {}", self.format);
        notify(self.listener.as_ref(), self.format);
        if let Some(output) = &self.output {
            output.lock().set_format(self.format);
        }

        let extra = size - WAV_FMT_CHUNK_SIZE;
        if extra == 0 {
            ParseState::ChunkHeader
        } else {
            ParseState::Skip {
                remaining: u64::from(extra) + u64::from(size & 1),
            }
        }
    }
}

impl Default for WavDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for WavDecoder {
    /// Restarts parsing at the RIFF header.
    fn begin(&mut self) {
        self.state = ParseState::Riff;
        self.filled = 0;
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
        let mut rest = data;
        while !rest.is_empty() {
            self.state = match self.state {
                ParseState::Riff => {
                    if !self.fill(&mut rest, RIFF_HEADER_SIZE) {
                        break;
                    }
                    self.parse_riff()
                }
                ParseState::ChunkHeader => {
                    if !self.fill(&mut rest, CHUNK_HEADER_SIZE) {
                        break;
                    }
                    self.parse_chunk_header()
                }
                ParseState::Fmt { size } => {
                    if !self.fill(&mut rest, WAV_FMT_CHUNK_SIZE as usize) {
                        break;
                    }
                    self.parse_fmt(size)
                }
                ParseState::Skip { remaining } => {
                    let skip = usize::try_from(remaining).unwrap_or(usize::MAX).min(rest.len());
                    rest = &rest[skip..];
                    match remaining - skip as u64 {
                        0 => ParseState::ChunkHeader,
                        remaining => ParseState::Skip { remaining },
                    }
                }
                ParseState::Data { remaining, pad } => {
                    let len = remaining.map_or(rest.len(), |remaining| {
                        usize::try_from(remaining).unwrap_or(usize::MAX).min(rest.len())
                    });
                    let accepted = match &self.output {
                        Some(output) => output.lock().write(&rest[..len]),
                        None => 0,
                    };
                    let left = remaining.map(|remaining| remaining - accepted as u64);
                    rest = &rest[accepted..];

                    if accepted < len {
                        // Output is full: the rest is not consumed
                        self.state = ParseState::Data { remaining: left, pad };
                        return data.len() - rest.len();
                    }
                    match left {
                        Some(0) if pad => ParseState::Skip { remaining: 1 },
                        Some(0) => ParseState::ChunkHeader,
                        remaining => ParseState::Data { remaining, pad },
                    }
                }
                ParseState::Invalid => {
                    // Not a stream we can decode: drop it
                    return data.len();
                }
            };
        }
        data.len() - rest.len()
    }

    fn mime(&self) -> Option<&'static str> {
        Some("audio/wav")
    }
}

/// Wraps raw PCM into a WAV stream.
///
/// The header is emitted in front of the first PCM bytes after each
/// `begin`. Since the total length is unknown while streaming, the size
/// fields claim the maximum, which players treat as "read until the end".
pub struct WavEncoder {
    format: AudioFormat,
    output: Option<SinkHandle>,
    header: [u8; WAV_HEADER_SIZE],
    header_sent: usize,
}

impl WavEncoder {
    /// Creates an encoder; set the PCM format before the first write.
    pub fn new() -> Self {
        Self {
            format: AudioFormat::default(),
            output: None,
            header: [0; WAV_HEADER_SIZE],
            header_sent: WAV_HEADER_SIZE,
        }
    }

    /// Returns `true` once the header has been fully handed to the output.
    pub fn is_header_sent(&self) -> bool {
        self.header_sent == WAV_HEADER_SIZE
    }

    /// Writes a complete WAV header for `format` into `out`.
    ///
    /// The header includes RIFF, fmt, and data chunk headers (44 bytes total).
    pub fn write_header(format: AudioFormat, data_size: u32, out: &mut [u8; WAV_HEADER_SIZE]) {
        let channels = u16::from(format.channels);
        let bits_per_sample = u16::from(format.bits_per_sample);
        let block_align = channels * bits_per_sample.div_ceil(8);
        let byte_rate = format
            .sample_rate
            .checked_mul(u32::from(block_align))
            .unwrap_or_else(|| {
                tracing::warn!("wav encoder: byte rate of {} overflows the header", format);
                u32::MAX
            });
        // Total size minus RIFF header
        let file_size = (WAV_HEADER_SIZE as u32 - 8).saturating_add(data_size);

        // RIFF container header
        out[0..4].copy_from_slice(b"RIFF");
        out[4..8].copy_from_slice(&file_size.to_le_bytes());
        out[8..12].copy_from_slice(b"WAVE");

        // fmt subchunk
        out[12..16].copy_from_slice(b"fmt ");
        out[16..20].copy_from_slice(&WAV_FMT_CHUNK_SIZE.to_le_bytes());
        out[20..22].copy_from_slice(&WAV_FORMAT_PCM.to_le_bytes());
        out[22..24].copy_from_slice(&channels.to_le_bytes());
        out[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
        out[28..32].copy_from_slice(&byte_rate.to_le_bytes());
        out[32..34].copy_from_slice(&block_align.to_le_bytes());
        out[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());

        // data subchunk header
        out[36..40].copy_from_slice(b"data");
        out[40..44].copy_from_slice(&data_size.to_le_bytes());
    }

    /// Hands any unsent header bytes to the output.
    fn send_header(&mut self, output: &SinkHandle) -> bool {
        if !self.is_header_sent() {
            self.header_sent += write_all(output, &self.header[self.header_sent..]);
        }
        self.is_header_sent()
    }
}

impl Default for WavEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for WavEncoder {
    /// Prepares a fresh header for the configured format.
    fn begin(&mut self) {
        if !self.format.is_complete() {
            tracing::warn!("wav encoder: format {} is incomplete", self.format);
        }
        Self::write_header(self.format, STREAMING_DATA_SIZE, &mut self.header);
        self.header_sent = 0;
    }

    fn end(&mut self) {
        if !self.is_header_sent() {
            tracing::debug!("wav encoder: ended before any audio was written");
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

    fn write(&mut self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }
        let Some(output) = self.output.clone() else {
            tracing::error!("wav encoder: no output bound");
            return 0;
        };
        if !self.send_header(&output) {
            return 0;
        }
        let accepted = output.lock().write(data);
        accepted
    }

    fn mime(&self) -> Option<&'static str> {
        Some("audio/wav")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{shared, MemorySink};

    fn wav_bytes(format: AudioFormat, pcm: &[u8]) -> Vec<u8> {
        let mut header = [0u8; WAV_HEADER_SIZE];
        WavEncoder::write_header(format, pcm.len() as u32, &mut header);
        let mut bytes = header.to_vec();
        bytes.extend_from_slice(pcm);
        bytes
    }

    #[test]
    fn test_header_layout() {
        let mut header = [0u8; WAV_HEADER_SIZE];
        WavEncoder::write_header(AudioFormat::new(16000, 1, 16), 32000, &mut header);

        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[4..8], &(36u32 + 32000).to_le_bytes());
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[22..24], &1u16.to_le_bytes());
        assert_eq!(&header[24..28], &16000u32.to_le_bytes());
        assert_eq!(&header[28..32], &32000u32.to_le_bytes());
        assert_eq!(&header[32..34], &2u16.to_le_bytes());
        assert_eq!(&header[36..40], b"data");
        assert_eq!(&header[40..44], &32000u32.to_le_bytes());
    }

    #[test]
    fn test_encoder_emits_header_once() {
        let sink = shared(MemorySink::new());
        let mut encoder = WavEncoder::new();
        encoder.set_output(sink.clone());
        encoder.set_format(AudioFormat::CD);
        encoder.begin();

        assert_eq!(encoder.write(&[1, 2, 3, 4]), 4);
        assert_eq!(encoder.write(&[5, 6]), 2);

        let sink = sink.lock();
        assert_eq!(sink.len(), WAV_HEADER_SIZE + 6);
        assert_eq!(&sink.data()[0..4], b"RIFF");
        assert_eq!(&sink.data()[40..44], &STREAMING_DATA_SIZE.to_le_bytes());
        assert_eq!(&sink.data()[44..], &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_encoder_header_waits_for_room() {
        let sink = shared(MemorySink::with_limit(20));
        let mut encoder = WavEncoder::new();
        encoder.set_output(sink.clone());
        encoder.set_format(AudioFormat::CD);
        encoder.begin();

        // Header does not fit yet: nothing of the PCM is consumed
        assert_eq!(encoder.write(&[1, 2]), 0);
        assert!(!encoder.is_header_sent());

        let mut received = sink.lock().take();
        *sink.lock() = MemorySink::new();
        assert_eq!(encoder.write(&[1, 2]), 2);
        received.extend_from_slice(sink.lock().data());

        assert_eq!(received.len(), WAV_HEADER_SIZE + 2);
        assert_eq!(&received[36..40], b"data");
    }

    #[test]
    fn test_encoder_empty_write() {
        let sink = shared(MemorySink::new());
        let mut encoder = WavEncoder::new();
        encoder.set_output(sink.clone());
        encoder.begin();
        assert_eq!(encoder.write(&[]), 0);
        assert!(sink.lock().is_empty());
    }

    #[test]
    fn test_decoder_discovers_format() {
        let listener = shared(MemorySink::new());
        let sink = shared(MemorySink::new());
        let mut decoder = WavDecoder::new();
        decoder.set_output(sink.clone());
        decoder.set_format_listener(listener.clone());
        decoder.begin();

        let bytes = wav_bytes(AudioFormat::new(22050, 2, 16), &[9, 8, 7, 6]);
        assert_eq!(decoder.write(&bytes), bytes.len());

        assert_eq!(decoder.format(), AudioFormat::new(22050, 2, 16));
        assert_eq!(listener.lock().notifications(), &[AudioFormat::new(22050, 2, 16)]);
        assert_eq!(sink.lock().format(), AudioFormat::new(22050, 2, 16));
        assert_eq!(sink.lock().data(), &[9, 8, 7, 6]);
    }

    #[test]
    fn test_decoder_byte_by_byte() {
        let sink = shared(MemorySink::new());
        let mut decoder = WavDecoder::new();
        decoder.set_output(sink.clone());
        decoder.begin();

        let bytes = wav_bytes(AudioFormat::new(8000, 1, 8), &[1, 2, 3, 4]);
        for byte in &bytes[..WAV_HEADER_SIZE] {
            assert_eq!(decoder.write(std::slice::from_ref(byte)), 1);
        }
        assert!(decoder.is_in_data());
        for byte in &bytes[WAV_HEADER_SIZE..] {
            assert_eq!(decoder.write(std::slice::from_ref(byte)), 1);
        }
        assert!(!decoder.is_in_data());
        assert_eq!(sink.lock().data(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_decoder_skips_unknown_chunks() {
        let sink = shared(MemorySink::new());
        let mut decoder = WavDecoder::new();
        decoder.set_output(sink.clone());
        decoder.begin();

        let wav = wav_bytes(AudioFormat::new(8000, 1, 16), &[5, 5]);
        let mut bytes = wav[..36].to_vec();
        // Odd-sized LIST chunk plus its pad byte
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0x00]);
        bytes.extend_from_slice(&wav[36..]);

        decoder.write(&bytes);
        assert_eq!(sink.lock().data(), &[5, 5]);
    }

    #[test]
    fn test_decoder_stops_at_end_of_data_chunk() {
        let sink = shared(MemorySink::new());
        let mut decoder = WavDecoder::new();
        decoder.set_output(sink.clone());
        decoder.begin();

        let mut bytes = wav_bytes(AudioFormat::new(8000, 1, 16), &[1, 0, 2, 0]);
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(b"INFO");

        assert_eq!(decoder.write(&bytes), bytes.len());
        assert_eq!(sink.lock().data(), &[1, 0, 2, 0]);
    }

    #[test]
    fn test_decoder_skips_data_pad_byte() {
        let sink = shared(MemorySink::new());
        let mut decoder = WavDecoder::new();
        decoder.set_output(sink.clone());
        decoder.begin();

        let mut bytes = wav_bytes(AudioFormat::new(8000, 1, 8), &[7, 8, 9]);
        bytes.push(0);
        bytes.extend_from_slice(b"junk");
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[0xEE, 0xEE]);

        decoder.write(&bytes);
        assert_eq!(sink.lock().data(), &[7, 8, 9]);
    }

    #[test]
    fn test_decoder_streaming_size_is_unbounded() {
        let sink = shared(MemorySink::new());
        let mut decoder = WavDecoder::new();
        decoder.set_output(sink.clone());
        decoder.begin();

        let mut header = [0u8; WAV_HEADER_SIZE];
        WavEncoder::write_header(AudioFormat::new(8000, 1, 8), STREAMING_DATA_SIZE, &mut header);
        decoder.write(&header);
        decoder.write(&[1; 300]);
        decoder.write(&[2; 300]);

        assert!(decoder.is_in_data());
        assert_eq!(sink.lock().len(), 600);
    }

    #[test]
    fn test_header_byte_rate_saturates() {
        let mut header = [0u8; WAV_HEADER_SIZE];
        WavEncoder::write_header(AudioFormat::new(3_000_000_000, 2, 16), 0, &mut header);
        assert_eq!(&header[24..28], &3_000_000_000u32.to_le_bytes());
        assert_eq!(&header[28..32], &u32::MAX.to_le_bytes());
    }

    #[test]
    fn test_decoder_rejects_non_wav() {
        let sink = shared(MemorySink::new());
        let mut decoder = WavDecoder::new();
        decoder.set_output(sink.clone());
        decoder.begin();

        assert_eq!(decoder.write(b"ID3\x04\x00\x00\x00\x00\x00\x00\x00\x00more"), 16);
        assert!(sink.lock().is_empty());
        assert_eq!(decoder.format(), AudioFormat::default());
    }

    #[test]
    fn test_decoder_reports_partial_output() {
        let sink = shared(MemorySink::with_limit(1));
        let mut decoder = WavDecoder::new();
        decoder.set_output(sink.clone());
        decoder.begin();

        let bytes = wav_bytes(AudioFormat::new(8000, 1, 8), &[1, 2, 3]);
        assert_eq!(decoder.write(&bytes), WAV_HEADER_SIZE + 1);
        assert_eq!(decoder.write(&bytes[WAV_HEADER_SIZE + 1..]), 0);
    }

    #[test]
    fn test_decoder_begin_restarts_parsing() {
        let sink = shared(MemorySink::new());
        let mut decoder = WavDecoder::new();
        decoder.set_output(sink.clone());

        let bytes = wav_bytes(AudioFormat::new(8000, 1, 8), &[1]);
        decoder.begin();
        decoder.write(&bytes);
        decoder.begin();
        decoder.write(&bytes);

        assert_eq!(sink.lock().data(), &[1, 1]);
    }
}
