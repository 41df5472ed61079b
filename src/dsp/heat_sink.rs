//! Heat Sink soft clipper
//!
//! Post-compression saturation stage. A cubic soft clip (tanh outside the
//! unit range) is blended with the dry signal, level-compensated, and the
//! result is DC-blocked with a 10 Hz high-pass.

use serde_json::{json, Value};

use super::biquad::{HighPassFilter, BUTTERWORTH_Q};
use super::effect::{expect_bool, expect_number, Effect};
use crate::engine::AudioBuffer;
use crate::error::{ReactorError, Result};
use crate::impl_effect_common;

// ============================================================================
// Constants
// ============================================================================

/// Amounts below this (normalized) leave the signal bit-exact
const BYPASS_THRESHOLD: f32 = 0.001;

/// DC blocker corner in Hz
const DC_BLOCKER_HZ: f64 = 10.0;

const MIN_AMOUNT_PERCENT: f32 = 0.0;
const MAX_AMOUNT_PERCENT: f32 = 100.0;

// ============================================================================
// Waveshaping
// ============================================================================

/// Cubic soft clip inside the unit range, tanh outside it
///
/// The pieces do not meet at |x| = 1: the cubic reaches 1.0 while tanh(1) is
/// about 0.762, a step of about 0.238.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    if x.abs() < 1.0 {
        x * (1.5 - 0.5 * x * x)
    } else {
        x.tanh()
    }
}

/// Soft clipper with dry/wet blend and DC blocker
#[derive(Debug, Clone)]
pub struct HeatSink {
    enabled: bool,
    /// Normalized amount, 0..1
    amount: f32,
    dc_blocker: HighPassFilter,
}

impl HeatSink {
    pub fn new() -> Self {
        Self {
            enabled: true,
            amount: 0.0,
            dc_blocker: HighPassFilter::new(44100.0, DC_BLOCKER_HZ, BUTTERWORTH_Q),
        }
    }

    /// Set the amount in percent (clamped to 0..100)
    pub fn set_amount(&mut self, percent: f32) {
        self.amount = percent.clamp(MIN_AMOUNT_PERCENT, MAX_AMOUNT_PERCENT) / 100.0;
    }

    /// Amount in percent
    pub fn amount(&self) -> f32 {
        self.amount * 100.0
    }

    /// True when processing leaves the signal untouched
    pub fn is_bypassed(&self) -> bool {
        !self.enabled || self.amount < BYPASS_THRESHOLD
    }

    /// Saturate one sample (no DC blocking)
    #[inline]
    pub fn process_sample(&self, input: f32) -> f32 {
        let a = self.amount;
        let drive = 1.0 + 4.0 * a;
        let clipped = soft_clip(input * drive);
        let wet = 0.3 + 0.7 * a;
        (input * (1.0 - wet) + clipped * wet) / (1.0 + 0.5 * a)
    }

    /// Size the DC blocker for `num_channels`; call before processing
    pub fn set_num_channels(&mut self, num_channels: usize) {
        self.dc_blocker.set_num_channels(num_channels);
    }

    pub fn num_channels(&self) -> usize {
        self.dc_blocker.num_channels()
    }

    /// True when no DC-blocker history is held
    pub fn is_cleared(&self) -> bool {
        self.dc_blocker.is_cleared()
    }
}

impl Default for HeatSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for HeatSink {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if self.is_bypassed() {
            return;
        }

        for channel in buffer.samples.iter_mut() {
            for sample in channel.iter_mut() {
                *sample = self.process_sample(*sample);
            }
        }

        self.dc_blocker.process_buffer(buffer);
    }

    fn prepare(&mut self, sample_rate: f64, _max_block_size: usize) {
        self.dc_blocker.prepare(sample_rate);
    }

    fn reset(&mut self) {
        self.dc_blocker.reset();
    }

    impl_effect_common!("heat_sink", "Heat Sink");

    fn get_params(&self) -> Value {
        json!({
            "amount": self.amount(),
            "enabled": self.enabled,
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "amount" => self.set_amount(expect_number(name, value)?),
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
