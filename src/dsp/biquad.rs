//! Second-order IIR section
//!
//! Shared by the sidechain high-pass and the heat sink DC blocker. Each
//! filter owns one coefficient set and one delay line per channel.

use crate::engine::AudioBuffer;
use std::f64::consts::PI;

/// Q giving a maximally flat (Butterworth) 2nd-order response
pub const BUTTERWORTH_Q: f64 = 0.707;

/// Channels allocated at `prepare()`; more are added on first use
const PREPARED_CHANNELS: usize = 2;

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// High-pass coefficients from the Audio EQ Cookbook
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    pub fn high_pass(sample_rate: f64, frequency: f64, q: f64) -> Self {
        // Keep the corner below Nyquist
        let freq = frequency.clamp(1.0, sample_rate / 2.0 - 1.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let a0 = 1.0 + alpha;
        BiquadCoeffs {
            b0: ((1.0 + cos_w0) / 2.0) / a0,
            b1: (-(1.0 + cos_w0)) / a0,
            b2: ((1.0 + cos_w0) / 2.0) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Unity pass-through
    pub fn identity() -> Self {
        BiquadCoeffs {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

/// Delay memory for one channel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// Process a single sample (Direct Form I)
    #[inline]
    pub fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True when no history is held
    pub fn is_cleared(&self) -> bool {
        *self == Self::default()
    }
}

/// Multichannel high-pass section with its own coefficients and memory
#[derive(Debug, Clone)]
pub struct HighPassFilter {
    coeffs: BiquadCoeffs,
    states: Vec<BiquadState>,
    sample_rate: f64,
    frequency: f64,
    q: f64,
    num_channels: usize,
}

impl HighPassFilter {
    pub fn new(sample_rate: f64, frequency: f64, q: f64) -> Self {
        Self {
            coeffs: BiquadCoeffs::high_pass(sample_rate, frequency, q),
            states: vec![BiquadState::default(); PREPARED_CHANNELS],
            sample_rate,
            frequency,
            q,
            num_channels: PREPARED_CHANNELS,
        }
    }

    /// Recompute coefficients for a new rate and clear the delay lines
    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.coeffs = BiquadCoeffs::high_pass(sample_rate, self.frequency, self.q);
        self.states.clear();
        self.states.resize(self.num_channels, BiquadState::default());
    }

    /// Allocate delay lines for `num_channels` channels (at least one)
    pub fn set_num_channels(&mut self, num_channels: usize) {
        self.num_channels = num_channels.max(1);
        self.states.resize(self.num_channels, BiquadState::default());
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Move the corner frequency; the delay lines are kept
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
        self.coeffs = BiquadCoeffs::high_pass(self.sample_rate, frequency, self.q);
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    pub fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
    }

    /// True when every channel's delay line is zero
    pub fn is_cleared(&self) -> bool {
        self.states.iter().all(BiquadState::is_cleared)
    }

    /// Filter `buffer` in place
    ///
    /// Never allocates. Channels beyond the prepared count pass through.
    pub fn process_buffer(&mut self, buffer: &mut AudioBuffer) {
        for (channel, state) in buffer.samples.iter_mut().zip(self.states.iter_mut()) {
            for sample in channel.iter_mut() {
                *sample = state.process(*sample as f64, &self.coeffs) as f32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(freq: f64, sample_rate: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin() as f32)
            .collect()
    }

    fn steady_state_gain(filter: &mut HighPassFilter, freq: f64, sample_rate: f64) -> f32 {
        let len = sample_rate as usize;
        let mut buffer =
            AudioBuffer::from_channels(vec![sine(freq, sample_rate, len)], sample_rate as u32)
                .unwrap();
        filter.process_buffer(&mut buffer);
        // Skip the transient
        buffer.channel(0)[len / 2..]
            .iter()
            .fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    #[test]
    fn test_high_pass_blocks_dc() {
        let mut filter = HighPassFilter::new(48000.0, 100.0, BUTTERWORTH_Q);
        let mut buffer = AudioBuffer::from_channels(vec![vec![1.0; 48000]], 48000).unwrap();
        filter.process_buffer(&mut buffer);
        assert!(buffer.channel(0)[47999].abs() < 1e-4);
    }

    #[test]
    fn test_high_pass_corner_is_minus_3db() {
        let mut filter = HighPassFilter::new(48000.0, 200.0, BUTTERWORTH_Q);
        let gain = steady_state_gain(&mut filter, 200.0, 48000.0);
        assert_relative_eq!(gain, std::f32::consts::FRAC_1_SQRT_2, epsilon = 0.02);
    }

    #[test]
    fn test_high_pass_passes_high_frequencies() {
        let mut filter = HighPassFilter::new(48000.0, 100.0, BUTTERWORTH_Q);
        let gain = steady_state_gain(&mut filter, 5000.0, 48000.0);
        assert_relative_eq!(gain, 1.0, epsilon = 0.01);
    }

    #[test]
    fn test_channels_have_independent_memory() {
        let mut filter = HighPassFilter::new(48000.0, 100.0, BUTTERWORTH_Q);
        let mut buffer =
            AudioBuffer::from_channels(vec![vec![1.0; 32], vec![0.0; 32]], 48000).unwrap();
        filter.process_buffer(&mut buffer);
        assert!(buffer.channel(1).iter().all(|&s| s == 0.0));
        assert!(buffer.channel(0)[0] > 0.9);
    }

    #[test]
    fn test_extra_channels_are_filtered_once_prepared() {
        let mut filter = HighPassFilter::new(48000.0, 100.0, BUTTERWORTH_Q);
        filter.set_num_channels(4);
        filter.prepare(48000.0);
        assert_eq!(filter.num_channels(), 4);

        let mut buffer = AudioBuffer::from_channels(vec![vec![1.0; 4800]; 4], 48000).unwrap();
        filter.process_buffer(&mut buffer);
        for ch in 0..4 {
            assert!(buffer.channel(ch)[4799].abs() < 0.1);
        }
    }

    #[test]
    fn test_processing_does_not_grow_channel_state() {
        let mut filter = HighPassFilter::new(48000.0, 100.0, BUTTERWORTH_Q);
        let mut buffer = AudioBuffer::from_channels(vec![vec![1.0; 480]; 3], 48000).unwrap();
        filter.process_buffer(&mut buffer);

        assert_eq!(filter.states.len(), 2);
        assert!(buffer.channel(0)[479].abs() < 1.0);
        assert!(buffer.channel(2).iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_reset_and_prepare_clear_memory() {
        let mut filter = HighPassFilter::new(44100.0, 100.0, BUTTERWORTH_Q);
        let mut buffer = AudioBuffer::from_channels(vec![vec![0.5; 16]], 44100).unwrap();
        filter.process_buffer(&mut buffer);
        assert!(!filter.is_cleared());

        filter.reset();
        assert!(filter.is_cleared());

        filter.process_buffer(&mut buffer);
        let before = *filter.coeffs();
        filter.prepare(96000.0);
        assert!(filter.is_cleared());
        assert_ne!(before, *filter.coeffs());
    }

    #[test]
    fn test_identity_coeffs_pass_through() {
        let mut state = BiquadState::default();
        let coeffs = BiquadCoeffs::identity();
        for x in [0.1, -0.7, 0.3] {
            assert_eq!(state.process(x, &coeffs), x);
        }
    }
}
