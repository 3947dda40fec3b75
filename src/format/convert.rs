//! Sample format and channel conversion.
//!
//! Samples are carried between the decode and encode steps as `i32` values
//! scaled to the full 32-bit range, so converting between bit depths is a
//! shift and never overflows.

/// Widest supported sample, in bytes.
pub const MAX_BYTES_PER_SAMPLE: usize = 4;

/// Returns `true` for the bit depths the converter understands.
#[inline]
pub fn is_supported_bit_depth(bits: u8) -> bool {
    matches!(bits, 8 | 16 | 24 | 32)
}

/// Decodes one signed little-endian sample into full-scale `i32`.
///
/// `bytes` must hold at least `bits / 8` bytes. Unsupported bit depths
/// decode as silence.
#[inline]
pub fn decode_sample(bytes: &[u8], bits: u8) -> i32 {
    match bits {
        8 => i32::from(bytes[0] as i8) << 24,
        16 => i32::from(i16::from_le_bytes([bytes[0], bytes[1]])) << 16,
        24 => i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]),
        32 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        _ => 0,
    }
}

/// Encodes a full-scale `i32` sample as signed little-endian PCM.
///
/// Returns the number of bytes written into `out` (0 for unsupported depths).
#[inline]
pub fn encode_sample(sample: i32, bits: u8, out: &mut [u8]) -> usize {
    match bits {
        8 => {
            out[0] = (sample >> 24) as i8 as u8;
            1
        }
        16 => {
            out[..2].copy_from_slice(&((sample >> 16) as i16).to_le_bytes());
            2
        }
        24 => {
            out[..3].copy_from_slice(&sample.to_le_bytes()[1..]);
            3
        }
        32 => {
            out[..4].copy_from_slice(&sample.to_le_bytes());
            4
        }
        _ => 0,
    }
}

/// Maps one frame from `input.len()` channels to `output.len()` channels.
///
/// - Down to mono: channels are averaged
/// - Up from mono: the sample is duplicated into every channel
/// - Otherwise: channels are taken by position, the last input channel
///   filling any extra outputs
pub fn map_channels(input: &[i32], output: &mut [i32]) {
    if input.is_empty() || output.is_empty() {
        return;
    }

    if input.len() == output.len() {
        output.copy_from_slice(input);
    } else if output.len() == 1 {
        // Average in i64 to avoid overflow
        let sum: i64 = input.iter().map(|&s| i64::from(s)).sum();
        output[0] = (sum / input.len() as i64) as i32;
    } else if input.len() == 1 {
        output.fill(input[0]);
    } else {
        let last = input.len() - 1;
        for (channel, sample) in output.iter_mut().enumerate() {
            *sample = input[channel.min(last)];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_16_bit() {
        assert_eq!(decode_sample(&1000i16.to_le_bytes(), 16), 1000 << 16);
        assert_eq!(decode_sample(&(-1i16).to_le_bytes(), 16), -1 << 16);
    }

    #[test]
    fn test_decode_24_bit_sign_extension() {
        // -1 in 24-bit two's complement
        assert_eq!(decode_sample(&[0xFF, 0xFF, 0xFF], 24), -256);
        assert_eq!(decode_sample(&[0x01, 0x00, 0x00], 24), 256);
    }

    #[test]
    fn test_decode_unsupported_is_silence() {
        assert_eq!(decode_sample(&[0xFF, 0xFF], 12), 0);
    }

    #[test]
    fn test_depth_conversion_16_to_8() {
        let wide = decode_sample(&0x4000i16.to_le_bytes(), 16);
        let mut out = [0u8; 1];
        assert_eq!(encode_sample(wide, 8, &mut out), 1);
        assert_eq!(out[0] as i8, 0x40);
    }

    #[test]
    fn test_depth_conversion_16_to_24() {
        let wide = decode_sample(&(-2i16).to_le_bytes(), 16);
        let mut out = [0u8; 3];
        assert_eq!(encode_sample(wide, 24, &mut out), 3);
        assert_eq!(decode_sample(&out, 24), -2 << 16);
    }

    #[test]
    fn test_encode_32_bit() {
        let mut out = [0u8; 4];
        assert_eq!(encode_sample(-5, 32, &mut out), 4);
        assert_eq!(i32::from_le_bytes(out), -5);
    }

    #[test]
    fn test_stereo_to_mono_averages() {
        let mut out = [0i32; 1];
        map_channels(&[100, 300], &mut out);
        assert_eq!(out, [200]);
    }

    #[test]
    fn test_stereo_to_mono_cancellation() {
        let mut out = [7i32; 1];
        map_channels(&[i32::MAX, -i32::MAX], &mut out);
        assert_eq!(out, [0]);
    }

    #[test]
    fn test_mono_to_stereo_duplicates() {
        let mut out = [0i32; 2];
        map_channels(&[42], &mut out);
        assert_eq!(out, [42, 42]);
    }

    #[test]
    fn test_positional_mapping() {
        let mut out = [0i32; 4];
        map_channels(&[1, 2, 3], &mut out);
        assert_eq!(out, [1, 2, 3, 3]);

        let mut narrow = [0i32; 2];
        map_channels(&[1, 2, 3], &mut narrow);
        assert_eq!(narrow, [1, 2]);
    }

    #[test]
    fn test_supported_depths() {
        assert!(is_supported_bit_depth(16));
        assert!(is_supported_bit_depth(24));
        assert!(!is_supported_bit_depth(0));
        assert!(!is_supported_bit_depth(20));
    }
}
