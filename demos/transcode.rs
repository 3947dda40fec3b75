//! Transcoding example.
//!
//! Encodes a generated tone as WAV, pulls the PCM back out through a
//! `DecoderStream` and pushes it through a chain that converts it to
//! 16kHz mono and fans it out to a raw sink and a WAV sink.
//!
//! Run with: cargo run --example transcode
//! Set RUST_LOG=stream_transcode=debug to watch the pipeline.

use std::sync::Arc;

use parking_lot::Mutex;
use stream_transcode::{
    format_listener, shared, AudioFormat, ByteSource, ChainBuilder, DecoderStream,
    DecoderStreamConfig, EncodedStream, MemorySink, MemorySource, WavDecoder, WavEncoder,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let studio = AudioFormat::new(48000, 2, 16);
    let mut tone = MemorySource::sine(studio, 440.0, 1000);
    println!("Source: {} bytes of {}", tone.available(), studio);

    // 1. Encode the tone as WAV
    let wav_file = shared(MemorySink::new());
    let encoder = Arc::new(Mutex::new(EncodedStream::new_encoder(
        shared(MemorySink::new()),
        shared(WavEncoder::new()),
    )));
    let mut encode = ChainBuilder::new()
        .with_format(studio)
        .convert(encoder)
        .output(wav_file.clone())
        .begin();

    let mut buffer = [0u8; 1024];
    loop {
        let n = tone.read_bytes(&mut buffer);
        if n == 0 {
            break;
        }
        encode.write(&buffer[..n]);
    }
    encode.end();
    let wav = wav_file.lock().take();
    println!("Encoded: {} bytes of WAV", wav.len());

    // 2. Decode it again
    let mut decoded = DecoderStream::with_config(&DecoderStreamConfig::default())?;
    decoded.set_format_listener(format_listener(|format| {
        println!("Decoder found {format}");
    }));
    decoded.begin_with(shared(MemorySource::new(wav)), shared(WavDecoder::new()));

    // 3. Downmix and resample into two sinks
    let raw = shared(MemorySink::new());
    let speech_wav = shared(MemorySink::new());
    let speech_encoder = Arc::new(Mutex::new(EncodedStream::new_encoder(
        shared(MemorySink::new()),
        shared(WavEncoder::new()),
    )));

    let mut speech = ChainBuilder::new()
        .with_format(studio)
        .reformat(AudioFormat::new(16000, 1, 0))
        .output(raw.clone())
        .build();
    let mut speech_file = ChainBuilder::new()
        .with_format(AudioFormat::new(16000, 1, 16))
        .convert(speech_encoder)
        .output(speech_wav.clone())
        .build();
    speech.begin();
    speech_file.begin();

    loop {
        let n = decoded.read_bytes(&mut buffer);
        if n == 0 {
            break;
        }
        speech.write(&buffer[..n]);
    }
    speech.end();
    decoded.end();

    let pcm = raw.lock().take();
    speech_file.write(&pcm);
    speech_file.end();

    println!("Converted: {} bytes of {}", pcm.len(), speech.format());
    println!("Speech WAV: {} bytes", speech_wav.lock().len());

    Ok(())
}
