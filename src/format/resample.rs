//! Sample rate conversion.
//!
//! Streaming resampler using linear interpolation. Frames are pushed one at a
//! time, so the resampler carries its interpolation state across writes and
//! never needs to see the whole signal. Fast, and good enough for speech or
//! monitoring paths; large rate changes will alias.

/// Streaming linear-interpolation resampler for interleaved frames.
#[derive(Debug, Clone)]
pub struct Resampler {
    /// Input frames consumed per output frame (`from_rate / to_rate`).
    step: f64,
    /// Position of the next output frame, in input frames after `previous`.
    position: f64,
    previous: Vec<i32>,
    output: Vec<i32>,
    primed: bool,
}

impl Resampler {
    /// Creates a resampler for frames of `channels` samples.
    ///
    /// A zero rate on either side is treated as "no conversion".
    pub fn new(from_rate: u32, to_rate: u32, channels: usize) -> Self {
        let step = if from_rate == 0 || to_rate == 0 {
            1.0
        } else {
            f64::from(from_rate) / f64::from(to_rate)
        };

        Self {
            step,
            position: 0.0,
            previous: vec![0; channels],
            output: vec![0; channels],
            primed: false,
        }
    }

    /// Returns `true` if input and output rates are equal.
    #[allow(clippy::float_cmp)] // step is exactly 1.0 when rates match
    pub fn is_passthrough(&self) -> bool {
        self.step == 1.0
    }

    /// Forgets interpolation state, e.g. after a discontinuity.
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.primed = false;
    }

    /// Pushes one input frame, calling `emit` once per completed output frame.
    ///
    /// Output lags the input by one frame: a new output can only be
    /// interpolated once the frame after it has arrived.
    pub fn push_frame(&mut self, frame: &[i32], mut emit: impl FnMut(&[i32])) {
        if self.is_passthrough() {
            emit(frame);
            return;
        }

        if !self.primed {
            self.previous.copy_from_slice(frame);
            self.position = 0.0;
            self.primed = true;
            return;
        }

        while self.position < 1.0 {
            let frac = self.position;
            for ((out, &prev), &cur) in self.output.iter_mut().zip(&self.previous).zip(frame) {
                let delta = (i64::from(cur) - i64::from(prev)) as f64;
                *out = (i64::from(prev) + (delta * frac) as i64) as i32;
            }
            emit(&self.output);
            self.position += self.step;
        }

        self.position -= 1.0;
        self.previous.copy_from_slice(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(resampler: &mut Resampler, input: &[i32]) -> Vec<i32> {
        let mut output = Vec::new();
        for &sample in input {
            resampler.push_frame(&[sample], |frame| output.extend_from_slice(frame));
        }
        output
    }

    #[test]
    fn test_same_rate_passthrough() {
        let mut resampler = Resampler::new(16000, 16000, 1);
        assert!(resampler.is_passthrough());
        assert_eq!(run(&mut resampler, &[100, 200, 300]), vec![100, 200, 300]);
    }

    #[test]
    fn test_zero_rate_is_passthrough() {
        let resampler = Resampler::new(0, 16000, 1);
        assert!(resampler.is_passthrough());
    }

    #[test]
    fn test_downsample_ratio() {
        // 48kHz to 16kHz = 3:1 ratio
        let mut resampler = Resampler::new(48000, 16000, 1);
        let input: Vec<i32> = (0..481).map(|i| i * 10).collect();
        let output = run(&mut resampler, &input);
        assert_eq!(output.len(), 160);
        assert_eq!(output[0], 0);
        assert_eq!(output[1], 30);
    }

    #[test]
    fn test_upsample_interpolates() {
        let mut resampler = Resampler::new(1, 2, 1);
        let output = run(&mut resampler, &[0, 1000, 2000]);
        assert_eq!(output, vec![0, 500, 1000, 1500]);
    }

    #[test]
    fn test_state_carries_across_calls() {
        let mut split = Resampler::new(1, 2, 1);
        let mut first = run(&mut split, &[0, 1000]);
        first.extend(run(&mut split, &[2000]));

        let mut whole = Resampler::new(1, 2, 1);
        assert_eq!(first, run(&mut whole, &[0, 1000, 2000]));
    }

    #[test]
    fn test_stereo_frames() {
        let mut resampler = Resampler::new(1, 2, 2);
        let mut output = Vec::new();
        for frame in [[0, 100], [1000, 300]] {
            resampler.push_frame(&frame, |f| output.extend_from_slice(f));
        }
        assert_eq!(output, vec![0, 100, 500, 200]);
    }

    #[test]
    fn test_reset_restarts_priming() {
        let mut resampler = Resampler::new(1, 2, 1);
        run(&mut resampler, &[0, 1000]);
        resampler.reset();
        // First frame after reset only primes
        assert!(run(&mut resampler, &[5]).is_empty());
    }
}
