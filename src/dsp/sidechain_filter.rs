//! Sidechain high-pass filter
//!
//! Removes low end from the detection copy so bass content does not pump
//! the compressor. The audible signal is never filtered.

use serde_json::{json, Value};

use super::biquad::{HighPassFilter, BUTTERWORTH_Q};
use super::effect::{expect_bool, expect_number, Effect};
use crate::engine::AudioBuffer;
use crate::error::{ReactorError, Result};
use crate::impl_effect_common;

/// Lowest corner frequency in Hz
pub const MIN_FREQUENCY_HZ: f32 = 20.0;

/// Highest corner frequency in Hz
pub const MAX_FREQUENCY_HZ: f32 = 500.0;

/// Default corner frequency in Hz
pub const DEFAULT_FREQUENCY_HZ: f32 = 100.0;

/// 2nd-order Butterworth high-pass for the detection path
///
/// Disabled by default.
#[derive(Debug, Clone)]
pub struct SidechainFilter {
    enabled: bool,
    frequency_hz: f32,
    filter: HighPassFilter,
}

impl SidechainFilter {
    pub fn new() -> Self {
        Self {
            enabled: false,
            frequency_hz: DEFAULT_FREQUENCY_HZ,
            filter: HighPassFilter::new(44100.0, DEFAULT_FREQUENCY_HZ as f64, BUTTERWORTH_Q),
        }
    }

    /// Set the corner frequency, clamped to 20..500 Hz
    pub fn set_frequency(&mut self, frequency_hz: f32) {
        let clamped = frequency_hz.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ);
        if clamped != self.frequency_hz {
            self.frequency_hz = clamped;
            self.filter.set_frequency(clamped as f64);
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency_hz
    }

    /// Size the filter memory for `num_channels`; call before processing
    pub fn set_num_channels(&mut self, num_channels: usize) {
        self.filter.set_num_channels(num_channels);
    }

    /// True when no filter history is held
    pub fn is_cleared(&self) -> bool {
        self.filter.is_cleared()
    }

    /// Return a filtered duplicate of `input`, leaving `input` untouched
    pub fn process_and_copy(&mut self, input: &AudioBuffer) -> AudioBuffer {
        let mut copy = input.clone();
        self.process(&mut copy);
        copy
    }

    /// Filter `input` into a caller-owned `scratch` buffer
    ///
    /// Reuses `scratch`'s allocations; once it has held the largest block no
    /// further allocation occurs.
    pub fn process_into(&mut self, input: &AudioBuffer, scratch: &mut AudioBuffer) {
        scratch.copy_from(input);
        self.process(scratch);
    }
}

impl Default for SidechainFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for SidechainFilter {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.enabled {
            return;
        }
        self.filter.process_buffer(buffer);
    }

    fn prepare(&mut self, sample_rate: f64, _max_block_size: usize) {
        self.filter.prepare(sample_rate);
    }

    fn reset(&mut self) {
        self.filter.reset();
    }

    impl_effect_common!("sidechain_filter", "Sidechain HPF");

    fn get_params(&self) -> Value {
        json!({
            "frequency_hz": self.frequency_hz,
            "enabled": self.enabled,
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "frequency" | "frequency_hz" => self.set_frequency(expect_number(name, value)?),
            "enabled" => self.enabled = expect_bool(name, value)?,
            _ => {
                return Err(ReactorError::UnknownParameter {
                    param: name.to_string(),
                })
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{generate_stereo_test_tone, generate_test_tone};

    fn enabled_filter(frequency: f32) -> SidechainFilter {
        let mut filter = SidechainFilter::new();
        filter.prepare(48000.0, 512);
        filter.set_frequency(frequency);
        filter.set_enabled(true);
        filter
    }

    #[test]
    fn test_disabled_by_default_and_passes_through() {
        let mut filter = SidechainFilter::new();
        filter.prepare(48000.0, 512);
        assert!(!filter.is_enabled());

        let input = generate_stereo_test_tone(50.0, 80.0, 0.8, 0.1, 48000);
        let mut buffer = input.clone();
        filter.process(&mut buffer);
        assert!(buffer.is_identical_to(&input));
        assert!(filter.is_cleared());
    }

    #[test]
    fn test_frequency_is_clamped() {
        let mut filter = SidechainFilter::new();
        assert_eq!(filter.frequency(), 100.0);
        filter.set_frequency(5.0);
        assert_eq!(filter.frequency(), 20.0);
        filter.set_frequency(2000.0);
        assert_eq!(filter.frequency(), 500.0);
    }

    #[test]
    fn test_attenuates_low_frequencies() {
        let mut filter = enabled_filter(200.0);
        let input = generate_test_tone(30.0, 1.0, 1.0, 48000);
        let filtered = filter.process_and_copy(&input);

        let tail = &filtered.channel(0)[24000..];
        let peak = tail.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
        // 30 Hz sits well over two octaves below a 200 Hz corner
        assert!(peak < 0.05, "peak {}", peak);
    }

    #[test]
    fn test_process_and_copy_leaves_input_untouched() {
        let mut filter = enabled_filter(100.0);
        let input = generate_test_tone(40.0, 0.5, 0.1, 48000);
        let original = input.clone();

        let filtered = filter.process_and_copy(&input);
        assert!(input.is_identical_to(&original));
        assert!(!filtered.is_identical_to(&original));
    }

    #[test]
    fn test_process_into_matches_process_and_copy() {
        let input = generate_stereo_test_tone(60.0, 2000.0, 0.7, 0.05, 48000);

        let mut a = enabled_filter(150.0);
        let expected = a.process_and_copy(&input);

        let mut b = enabled_filter(150.0);
        let mut scratch = AudioBuffer::new(2, 4096, 48000);
        b.process_into(&input, &mut scratch);
        assert!(scratch.is_identical_to(&expected));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut filter = enabled_filter(100.0);
        let mut buffer = generate_test_tone(100.0, 0.5, 0.01, 48000);
        filter.process(&mut buffer);
        assert!(!filter.is_cleared());
        filter.reset();
        assert!(filter.is_cleared());
    }

    #[test]
    fn test_set_param() {
        let mut filter = SidechainFilter::new();
        filter.set_param("frequency", &json!(250.0)).unwrap();
        filter.set_param("enabled", &json!(true)).unwrap();
        assert_eq!(filter.frequency(), 250.0);
        assert!(filter.is_enabled());
        assert!(filter.set_param("q", &json!(1.0)).is_err());
    }
}
