//! Character compressor
//!
//! Feed-forward compressor whose detector, timing, gain-reduction shape and
//! output colour all follow the selected `Character`. Detection and gain are
//! computed once per sample and shared by every channel.

use std::sync::Arc;

use log::debug;
use serde_json::{json, Value};

use super::character::Character;
use super::effect::{expect_bool, expect_number, Effect};
use super::gain_computer::GainComputer;
use super::level_detector::LevelDetector;
use super::smoothing::{SmoothedValue, GAIN_SMOOTHING_SECS};
use crate::engine::{db_to_linear, AudioBuffer};
use crate::error::{ReactorError, Result};
use crate::impl_effect_common;
use crate::params::GainReductionMeter;

const DEFAULT_ATTACK_MS: f32 = 10.0;
const DEFAULT_RELEASE_MS: f32 = 100.0;
const DEFAULT_SAMPLE_RATE: f64 = 44100.0;
const DEFAULT_BLOCK_SIZE: usize = 512;

/// Compressor with selectable VCA / FET / Opto character
///
/// Call `prepare()` (from `Effect`) before processing.
#[derive(Debug, Clone)]
pub struct CompressorCore {
    enabled: bool,
    sample_rate: f64,
    max_block_size: usize,
    character: Character,
    /// User attack before the character scale
    attack_ms: f32,
    /// User release before the character scale
    release_ms: f32,
    detector: LevelDetector,
    computer: GainComputer,
    smoother: SmoothedValue,
    /// Latest smoothed gain reduction (dB, <= 0)
    gain_reduction_db: f32,
    meter: Arc<GainReductionMeter>,
}

impl CompressorCore {
    pub fn new() -> Self {
        let mut core = Self {
            enabled: true,
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_size: DEFAULT_BLOCK_SIZE,
            character: Character::default(),
            attack_ms: DEFAULT_ATTACK_MS,
            release_ms: DEFAULT_RELEASE_MS,
            detector: LevelDetector::new(),
            computer: GainComputer::new(),
            smoother: SmoothedValue::default(),
            gain_reduction_db: 0.0,
            meter: Arc::new(GainReductionMeter::new()),
        };
        core.set_character(Character::default());
        core.smoother.reset(DEFAULT_SAMPLE_RATE, GAIN_SMOOTHING_SECS);
        core
    }

    /// Select the character; detector mode and scaled timing follow
    pub fn set_character(&mut self, character: Character) {
        self.character = character;
        self.detector.set_mode(character.detector_mode());
        self.update_timing();
    }

    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.computer.set_threshold(threshold_db);
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.computer.set_ratio(ratio);
    }

    pub fn set_knee(&mut self, knee_db: f32) {
        self.computer.set_knee(knee_db);
    }

    pub fn set_attack(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.max(0.0);
        self.update_timing();
    }

    pub fn set_release(&mut self, release_ms: f32) {
        self.release_ms = release_ms.max(0.0);
        self.update_timing();
    }

    pub fn character(&self) -> Character {
        self.character
    }

    pub fn threshold(&self) -> f32 {
        self.computer.threshold()
    }

    pub fn ratio(&self) -> f32 {
        self.computer.ratio()
    }

    pub fn knee(&self) -> f32 {
        self.computer.knee()
    }

    pub fn attack(&self) -> f32 {
        self.attack_ms
    }

    pub fn release(&self) -> f32 {
        self.release_ms
    }

    /// Attack time the detector runs with after the character scale
    pub fn effective_attack_ms(&self) -> f32 {
        self.attack_ms * self.character.attack_scale()
    }

    /// Release time the detector runs with after the character scale
    pub fn effective_release_ms(&self) -> f32 {
        self.release_ms * self.character.release_scale()
    }

    pub fn gain_computer(&self) -> &GainComputer {
        &self.computer
    }

    pub fn detector(&self) -> &LevelDetector {
        &self.detector
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// Latest smoothed gain reduction in dB (0 when idle or bypassed)
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    /// Handle for polling gain reduction from another thread
    pub fn meter(&self) -> Arc<GainReductionMeter> {
        Arc::clone(&self.meter)
    }

    /// Compress `buffer` in place
    ///
    /// Detection reads `sidechain` when it has a sample at the current index
    /// and falls back to the main signal otherwise. Only channels 0 and 1
    /// feed the detector; gain and saturation apply to every channel.
    pub fn process(&mut self, buffer: &mut AudioBuffer, sidechain: Option<&AudioBuffer>) {
        if !self.enabled {
            self.clear_meter();
            return;
        }
        if buffer.num_channels() == 0 {
            return;
        }

        for i in 0..buffer.num_samples() {
            let (left, right) = detection_pair(buffer, sidechain, i);
            let gain = self.next_gain(left, right);

            for channel in buffer.samples.iter_mut() {
                if let Some(sample) = channel.get_mut(i) {
                    *sample = self.character.saturate(*sample * gain);
                }
            }
        }
    }

    /// Compress an interleaved buffer in place
    ///
    /// `sidechain`, when given, is interleaved with the same channel count.
    /// `data.len()` must be a whole number of frames; a trailing partial
    /// frame is left untouched.
    pub fn process_interleaved(
        &mut self,
        data: &mut [f32],
        num_channels: usize,
        sidechain: Option<&[f32]>,
    ) {
        if !self.enabled {
            self.clear_meter();
            return;
        }
        if num_channels == 0 {
            return;
        }
        debug_assert!(
            data.len() % num_channels == 0,
            "interleaved length {} is not a multiple of {} channels",
            data.len(),
            num_channels
        );

        for (i, frame) in data.chunks_exact_mut(num_channels).enumerate() {
            let source = match sidechain {
                Some(sc) if sc.len() >= (i + 1) * num_channels => {
                    &sc[i * num_channels..(i + 1) * num_channels]
                }
                _ => &*frame,
            };
            let left = source[0];
            let right = if num_channels > 1 { source[1] } else { left };
            let gain = self.next_gain(left, right);

            for sample in frame.iter_mut() {
                *sample = self.character.saturate(*sample * gain);
            }
        }
    }

    /// Detect, compute, shape and smooth; returns the linear gain
    #[inline]
    fn next_gain(&mut self, left: f32, right: f32) -> f32 {
        let level_db = self.detector.process_stereo(left, right);
        let raw = self.computer.compute_gain_reduction(level_db);
        let shaped = self
            .character
            .shape_gain_reduction(raw, level_db, self.computer.threshold());

        self.smoother.set_target(shaped);
        let smoothed = self.smoother.next_value();
        self.gain_reduction_db = smoothed;
        self.meter.set(smoothed);

        db_to_linear(smoothed)
    }

    fn update_timing(&mut self) {
        self.detector.set_attack_time(self.effective_attack_ms());
        self.detector.set_release_time(self.effective_release_ms());
    }

    fn clear_meter(&mut self) {
        self.gain_reduction_db = 0.0;
        self.meter.reset();
    }
}

impl Default for CompressorCore {
    fn default() -> Self {
        Self::new()
    }
}

/// Left/right detection input for sample `index`
#[inline]
fn detection_pair(main: &AudioBuffer, sidechain: Option<&AudioBuffer>, index: usize) -> (f32, f32) {
    let source = match sidechain {
        Some(sc) if sc.samples.first().map_or(false, |ch| index < ch.len()) => sc,
        _ => main,
    };
    let left = source.samples[0].get(index).copied().unwrap_or(0.0);
    let right = source
        .samples
        .get(1)
        .and_then(|ch| ch.get(index))
        .copied()
        .unwrap_or(left);
    (left, right)
}

impl Effect for CompressorCore {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        CompressorCore::process(self, buffer, None);
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: usize) {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.detector.prepare(sample_rate);
        self.update_timing();
        self.smoother.reset(sample_rate, GAIN_SMOOTHING_SECS);
        self.reset();
        debug!(
            "Compressor prepared: {} Hz, block {}, {} character",
            sample_rate, max_block_size, self.character
        );
    }

    fn reset(&mut self) {
        self.detector.reset();
        self.smoother.set_current_and_target(0.0);
        self.clear_meter();
    }

    impl_effect_common!("compressor", "Compressor");

    fn get_params(&self) -> Value {
        json!({
            "character": self.character.as_str(),
            "threshold_db": self.threshold(),
            "ratio": self.ratio(),
            "knee_db": self.knee(),
            "attack_ms": self.attack_ms,
            "release_ms": self.release_ms,
            "enabled": self.enabled,
        })
    }

    fn set_param(&mut self, name: &str, value: &Value) -> Result<()> {
        match name {
            "threshold" | "threshold_db" => self.set_threshold(expect_number(name, value)?),
            "ratio" => self.set_ratio(expect_number(name, value)?),
            "knee" | "knee_db" => self.set_knee(expect_number(name, value)?),
            "attack" | "attack_ms" => self.set_attack(expect_number(name, value)?),
            "release" | "release_ms" => self.set_release(expect_number(name, value)?),
            "enabled" => self.enabled = expect_bool(name, value)?,
            "character" => {
                let text = value.as_str().ok_or_else(|| ReactorError::InvalidParameter {
                    param: name.to_string(),
                    value: value.to_string(),
                    expected: "vca, fet or opto".to_string(),
                })?;
                self.set_character(text.parse()?);
            }
            _ => {
                return Err(ReactorError::UnknownParameter {
                    param: name.to_string(),
                })
            }
        }
        Ok(())
    }
}
