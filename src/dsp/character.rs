//! Compressor character models
//!
//! Each character picks a detector mode, scales the user's attack and
//! release, reshapes the raw gain reduction and colours the output with its
//! own waveshaper. Dispatch is a plain `match` so the per-sample path stays
//! free of indirection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dsp::level_detector::DetectorMode;
use crate::error::ReactorError;

// ============================================================================
// Constants
// ============================================================================

/// VCA clipper onset
const VCA_CLIP_START: f32 = 0.9;

/// VCA slope above the onset
const VCA_CLIP_SLOPE: f32 = 0.1;

/// FET extra reduction per dB above threshold
const FET_OVERSHOOT_PER_DB: f32 = 0.02;

/// Half-width of the Opto program-dependence window in dB
const OPTO_WINDOW_DB: f32 = 20.0;

/// Opto gain-reduction scale at the bottom of the window
const OPTO_MIN_SCALE: f32 = 0.7;

// ============================================================================
// Character
// ============================================================================

/// Analog-modelled compressor character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Character {
    /// Clean and fast, true-peak detection
    #[default]
    Vca,
    /// Aggressive peak detection with overshoot on loud transients
    Fet,
    /// Slow RMS detection with program-dependent reduction
    Opto,
}

impl Character {
    pub const ALL: [Character; 3] = [Character::Vca, Character::Fet, Character::Opto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Character::Vca => "vca",
            Character::Fet => "fet",
            Character::Opto => "opto",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Character::Vca => "VCA",
            Character::Fet => "FET",
            Character::Opto => "Opto",
        }
    }

    /// Position in the selector (0 = VCA, 1 = FET, 2 = Opto)
    pub fn index(&self) -> u8 {
        match self {
            Character::Vca => 0,
            Character::Fet => 1,
            Character::Opto => 2,
        }
    }

    /// Inverse of `index`; out-of-range values fall back to VCA
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Character::Fet,
            2 => Character::Opto,
            _ => Character::Vca,
        }
    }

    pub fn detector_mode(&self) -> DetectorMode {
        match self {
            Character::Vca => DetectorMode::TruePeak,
            Character::Fet => DetectorMode::Peak,
            Character::Opto => DetectorMode::Rms,
        }
    }

    pub fn attack_scale(&self) -> f32 {
        match self {
            Character::Vca => 1.0,
            Character::Fet => 0.7,
            Character::Opto => 2.0,
        }
    }

    pub fn release_scale(&self) -> f32 {
        match self {
            Character::Vca => 1.0,
            Character::Fet => 0.8,
            Character::Opto => 1.5,
        }
    }

    /// Reshape raw gain reduction given the detected level and threshold
    #[inline]
    pub fn shape_gain_reduction(&self, gain_reduction_db: f32, input_db: f32, threshold_db: f32) -> f32 {
        match self {
            Character::Vca => gain_reduction_db,
            Character::Fet => {
                let over = (input_db - threshold_db).max(0.0);
                gain_reduction_db * (1.0 + over * FET_OVERSHOOT_PER_DB)
            }
            Character::Opto => {
                let low = threshold_db - OPTO_WINDOW_DB;
                let span = 2.0 * OPTO_WINDOW_DB;
                let position = (input_db - low) / span;
                let scale = OPTO_MIN_SCALE + position * (1.0 - OPTO_MIN_SCALE);
                gain_reduction_db * scale.clamp(OPTO_MIN_SCALE, 1.0)
            }
        }
    }

    /// Character waveshaper applied after the gain stage
    #[inline]
    pub fn saturate(&self, x: f32) -> f32 {
        match self {
            Character::Vca => vca_clip(x),
            Character::Fet => fet_shape(x),
            Character::Opto => opto_shape(x),
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Character {
    type Err = ReactorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vca" => Ok(Character::Vca),
            "fet" => Ok(Character::Fet),
            "opto" | "optical" => Ok(Character::Opto),
            _ => Err(ReactorError::InvalidParameter {
                param: "character".to_string(),
                value: s.to_string(),
                expected: "vca, fet or opto".to_string(),
            }),
        }
    }
}

// ============================================================================
// Waveshapers
// ============================================================================

/// Linear below 0.9, a 10% slope above it
#[inline]
fn vca_clip(x: f32) -> f32 {
    let magnitude = x.abs();
    if magnitude > VCA_CLIP_START {
        x.signum() * (VCA_CLIP_START + (magnitude - VCA_CLIP_START) * VCA_CLIP_SLOPE)
    } else {
        x
    }
}

/// Rational soft clip with a slight positive/negative asymmetry
#[inline]
fn fet_shape(x: f32) -> f32 {
    let driven = x * 1.2;
    let shaped = driven / (1.0 + 0.3 * driven.abs());
    let skewed = if driven > 0.0 { shaped * 1.02 } else { shaped * 0.98 };
    skewed * 0.9
}

/// tanh with a small even-order term
#[inline]
fn opto_shape(x: f32) -> f32 {
    (0.8 * x).tanh() * 1.1 + 0.05 * x * x * x.signum()
}
