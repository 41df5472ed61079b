//! Level detector for the compressor sidechain
//!
//! Converts raw amplitude into a smoothed level in dB using an asymmetric
//! one-pole envelope follower. Peak and true-peak share the rectifier and
//! only differ through the timing scale the compressor applies; RMS uses a
//! fixed 10 ms block average.

use serde::{Deserialize, Serialize};

/// Level reported when the envelope is effectively silent
pub const LEVEL_FLOOR_DB: f32 = -100.0;

/// Envelope values below this report `LEVEL_FLOOR_DB`
const ENVELOPE_FLOOR: f32 = 1e-10;

/// Length of one RMS accumulation block in seconds
const RMS_WINDOW_SECS: f64 = 0.01;

const DEFAULT_ATTACK_COEFF: f32 = 0.01;
const DEFAULT_RELEASE_COEFF: f32 = 0.001;

/// Detection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorMode {
    /// Absolute sample value
    #[default]
    Peak,
    /// Absolute sample value (no oversampling; paired with unscaled timing)
    TruePeak,
    /// Block RMS over a 10 ms window
    Rms,
}

/// Convert a time constant to a one-pole coefficient in (0, 1]
///
/// `c = 1 - exp(-1 / (sample_rate * seconds))`. A zero or negative time
/// gives an instantaneous follower (c = 1).
#[inline]
pub fn time_to_coeff(time_ms: f32, sample_rate: f64) -> f32 {
    let seconds = time_ms as f64 / 1000.0;
    if seconds <= 0.0 || sample_rate <= 0.0 {
        return 1.0;
    }
    (1.0 - (-1.0 / (sample_rate * seconds)).exp()) as f32
}

/// Envelope follower with peak / true-peak / RMS detection
#[derive(Debug, Clone)]
pub struct LevelDetector {
    sample_rate: f64,
    mode: DetectorMode,
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    attack_ms: Option<f32>,
    release_ms: Option<f32>,
    rms_sum: f32,
    rms_count: usize,
    rms_window: usize,
}

impl LevelDetector {
    pub fn new() -> Self {
        let sample_rate = 44100.0;
        Self {
            sample_rate,
            mode: DetectorMode::Peak,
            envelope: 0.0,
            attack_coeff: DEFAULT_ATTACK_COEFF,
            release_coeff: DEFAULT_RELEASE_COEFF,
            attack_ms: None,
            release_ms: None,
            rms_sum: 0.0,
            rms_count: 0,
            rms_window: rms_window_len(sample_rate),
        }
    }

    /// Adopt a new sample rate, recompute coefficients and clear state
    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.rms_window = rms_window_len(sample_rate);
        if let Some(ms) = self.attack_ms {
            self.attack_coeff = time_to_coeff(ms, sample_rate);
        }
        if let Some(ms) = self.release_ms {
            self.release_coeff = time_to_coeff(ms, sample_rate);
        }
        self.reset();
    }

    /// Zero the envelope and the RMS accumulator
    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.rms_sum = 0.0;
        self.rms_count = 0;
    }

    pub fn set_mode(&mut self, mode: DetectorMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> DetectorMode {
        self.mode
    }

    pub fn set_attack_time(&mut self, attack_ms: f32) {
        self.attack_ms = Some(attack_ms);
        self.attack_coeff = time_to_coeff(attack_ms, self.sample_rate);
    }

    pub fn set_release_time(&mut self, release_ms: f32) {
        self.release_ms = Some(release_ms);
        self.release_coeff = time_to_coeff(release_ms, self.sample_rate);
    }

    pub fn attack_coeff(&self) -> f32 {
        self.attack_coeff
    }

    pub fn release_coeff(&self) -> f32 {
        self.release_coeff
    }

    /// Current linear envelope value
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Samples accumulated toward the next RMS block
    pub fn rms_pending(&self) -> usize {
        self.rms_count
    }

    /// Samples per RMS block at the current rate
    pub fn rms_window(&self) -> usize {
        self.rms_window
    }

    /// Process one mono sample and return the detected level in dB
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let level = match self.mode {
            DetectorMode::Peak | DetectorMode::TruePeak => input.abs(),
            DetectorMode::Rms => self.accumulate_rms(input * input),
        };
        self.follow(level)
    }

    /// Process a stereo pair and return the detected level in dB
    ///
    /// Peak modes follow the louder channel; RMS averages both squares.
    #[inline]
    pub fn process_stereo(&mut self, left: f32, right: f32) -> f32 {
        let level = match self.mode {
            DetectorMode::Peak | DetectorMode::TruePeak => left.abs().max(right.abs()),
            DetectorMode::Rms => self.accumulate_rms((left * left + right * right) * 0.5),
        };
        self.follow(level)
    }

    /// Add one squared value; returns the block RMS when a block completes,
    /// otherwise the held envelope
    #[inline]
    fn accumulate_rms(&mut self, squared: f32) -> f32 {
        self.rms_sum += squared;
        self.rms_count += 1;

        if self.rms_count >= self.rms_window {
            let rms = (self.rms_sum / self.rms_count as f32).sqrt();
            self.rms_sum = 0.0;
            self.rms_count = 0;
            rms
        } else {
            self.envelope
        }
    }

    #[inline]
    fn follow(&mut self, level: f32) -> f32 {
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope += coeff * (level - self.envelope);

        if self.envelope > ENVELOPE_FLOOR {
            20.0 * self.envelope.log10()
        } else {
            LEVEL_FLOOR_DB
        }
    }
}

impl Default for LevelDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn rms_window_len(sample_rate: f64) -> usize {
    ((sample_rate * RMS_WINDOW_SECS).round() as usize).max(1)
}
