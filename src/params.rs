//! Parameter store and configuration
//!
//! `SharedParams` is the lock-free bridge between a control thread and the
//! audio thread: every value is an independently updated atomic scalar.
//! `ParamSnapshot` is the plain serde view used for JSON configuration files
//! and for handing a consistent set of values to the CLI.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::dsp::Character;
use crate::error::{ReactorError, Result};

// ============================================================================
// Ranges
// ============================================================================

/// Documented range of a continuous parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamRange {
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// `Ok(())` when in range, otherwise an `InvalidParameter` error
    pub fn check(&self, value: f32) -> Result<()> {
        if self.contains(value) {
            Ok(())
        } else {
            Err(ReactorError::InvalidParameter {
                param: self.name.to_string(),
                value: value.to_string(),
                expected: format!("{} to {}", self.min, self.max),
            })
        }
    }
}

pub const THRESHOLD: ParamRange = ParamRange {
    name: "threshold",
    min: -60.0,
    max: 0.0,
    default: -18.0,
};

pub const RATIO: ParamRange = ParamRange {
    name: "ratio",
    min: 1.0,
    max: 20.0,
    default: 4.0,
};

pub const ATTACK: ParamRange = ParamRange {
    name: "attack",
    min: 0.1,
    max: 100.0,
    default: 10.0,
};

pub const RELEASE: ParamRange = ParamRange {
    name: "release",
    min: 10.0,
    max: 2000.0,
    default: 100.0,
};

pub const KNEE: ParamRange = ParamRange {
    name: "knee",
    min: 0.0,
    max: 24.0,
    default: 6.0,
};

pub const RESPONSE_DENSITY: ParamRange = ParamRange {
    name: "response_density",
    min: 0.0,
    max: 100.0,
    default: 50.0,
};

pub const HEAT_SINK_AMOUNT: ParamRange = ParamRange {
    name: "heat_sink_amount",
    min: 0.0,
    max: 100.0,
    default: 0.0,
};

pub const SIDECHAIN_FREQUENCY: ParamRange = ParamRange {
    name: "sidechain_frequency",
    min: 20.0,
    max: 500.0,
    default: 100.0,
};

// ============================================================================
// Response Density
// ============================================================================

const DENSITY_ATTACK_FAST_MS: f32 = 0.1;
const DENSITY_ATTACK_SLOW_MS: f32 = 80.0;
const DENSITY_RELEASE_FAST_MS: f32 = 30.0;
const DENSITY_RELEASE_SLOW_MS: f32 = 1500.0;

/// Squared inverse of the density, so most of the travel sits near "dense"
#[inline]
fn density_curve(density_percent: f32) -> f32 {
    let d = (density_percent / 100.0).clamp(0.0, 1.0);
    (1.0 - d) * (1.0 - d)
}

/// Attack time in ms implied by a response density in percent
pub fn response_density_attack_ms(density_percent: f32) -> f32 {
    let t = density_curve(density_percent);
    DENSITY_ATTACK_FAST_MS + t * (DENSITY_ATTACK_SLOW_MS - DENSITY_ATTACK_FAST_MS)
}

/// Release time in ms implied by a response density in percent
pub fn response_density_release_ms(density_percent: f32) -> f32 {
    let t = density_curve(density_percent);
    DENSITY_RELEASE_FAST_MS + t * (DENSITY_RELEASE_SLOW_MS - DENSITY_RELEASE_FAST_MS)
}

// ============================================================================
// Atomic cells
// ============================================================================

/// f32 stored as its bit pattern for lock-free access
#[derive(Debug)]
pub struct AtomicParam(AtomicU32);

impl AtomicParam {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl Default for AtomicParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Latest smoothed gain reduction in dB, written by the audio thread
#[derive(Debug, Default)]
pub struct GainReductionMeter {
    value: AtomicParam,
}

impl GainReductionMeter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set(&self, gain_reduction_db: f32) {
        self.value.store(gain_reduction_db);
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load()
    }

    pub fn reset(&self) {
        self.value.store(0.0);
    }
}

// ============================================================================
// Parameter snapshot (configuration format)
// ============================================================================

/// Complete parameter set
///
/// Missing JSON fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamSnapshot {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub knee_db: f32,
    pub character: Character,
    /// Passes audio through untouched when true
    pub bypass: bool,
    pub response_density_enabled: bool,
    /// 0..100 %
    pub response_density: f32,
    pub heat_sink_enabled: bool,
    /// 0..100 %
    pub heat_sink_amount: f32,
    pub sidechain_enabled: bool,
    pub sidechain_frequency_hz: f32,
}

impl Default for ParamSnapshot {
    fn default() -> Self {
        Self {
            threshold_db: THRESHOLD.default,
            ratio: RATIO.default,
            attack_ms: ATTACK.default,
            release_ms: RELEASE.default,
            knee_db: KNEE.default,
            character: Character::Vca,
            bypass: false,
            response_density_enabled: false,
            response_density: RESPONSE_DENSITY.default,
            heat_sink_enabled: true,
            heat_sink_amount: HEAT_SINK_AMOUNT.default,
            sidechain_enabled: false,
            sidechain_frequency_hz: SIDECHAIN_FREQUENCY.default,
        }
    }
}

impl ParamSnapshot {
    /// Parse a snapshot from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a snapshot from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReactorError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json_str(&text)?;
        info!("Loaded parameters from {}", path.display());
        debug!("{:?}", snapshot);
        Ok(snapshot)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every value against its documented range
    pub fn validate(&self) -> Result<()> {
        THRESHOLD.check(self.threshold_db)?;
        RATIO.check(self.ratio)?;
        ATTACK.check(self.attack_ms)?;
        RELEASE.check(self.release_ms)?;
        KNEE.check(self.knee_db)?;
        RESPONSE_DENSITY.check(self.response_density)?;
        HEAT_SINK_AMOUNT.check(self.heat_sink_amount)?;
        SIDECHAIN_FREQUENCY.check(self.sidechain_frequency_hz)?;
        Ok(())
    }

    /// Attack actually fed to the compressor, before the character scale
    pub fn effective_attack_ms(&self) -> f32 {
        if self.response_density_enabled {
            response_density_attack_ms(self.response_density)
        } else {
            self.attack_ms
        }
    }

    /// Release actually fed to the compressor, before the character scale
    pub fn effective_release_ms(&self) -> f32 {
        if self.response_density_enabled {
            response_density_release_ms(self.response_density)
        } else {
            self.release_ms
        }
    }
}

// ============================================================================
// Shared parameters
// ============================================================================

/// Lock-free parameter store shared between control and audio contexts
///
/// Each field updates independently; readers see every value at most one
/// block late.
#[derive(Debug)]
pub struct SharedParams {
    pub threshold_db: AtomicParam,
    pub ratio: AtomicParam,
    pub attack_ms: AtomicParam,
    pub release_ms: AtomicParam,
    pub knee_db: AtomicParam,
    character: AtomicU8,
    pub bypass: AtomicBool,
    pub response_density_enabled: AtomicBool,
    pub response_density: AtomicParam,
    pub heat_sink_enabled: AtomicBool,
    pub heat_sink_amount: AtomicParam,
    pub sidechain_enabled: AtomicBool,
    pub sidechain_frequency_hz: AtomicParam,
}

impl SharedParams {
    pub fn new() -> Self {
        Self::from_snapshot(&ParamSnapshot::default())
    }

    pub fn from_snapshot(snapshot: &ParamSnapshot) -> Self {
        Self {
            threshold_db: AtomicParam::new(snapshot.threshold_db),
            ratio: AtomicParam::new(snapshot.ratio),
            attack_ms: AtomicParam::new(snapshot.attack_ms),
            release_ms: AtomicParam::new(snapshot.release_ms),
            knee_db: AtomicParam::new(snapshot.knee_db),
            character: AtomicU8::new(snapshot.character.index()),
            bypass: AtomicBool::new(snapshot.bypass),
            response_density_enabled: AtomicBool::new(snapshot.response_density_enabled),
            response_density: AtomicParam::new(snapshot.response_density),
            heat_sink_enabled: AtomicBool::new(snapshot.heat_sink_enabled),
            heat_sink_amount: AtomicParam::new(snapshot.heat_sink_amount),
            sidechain_enabled: AtomicBool::new(snapshot.sidechain_enabled),
            sidechain_frequency_hz: AtomicParam::new(snapshot.sidechain_frequency_hz),
        }
    }

    /// Store every value of `snapshot`
    pub fn apply(&self, snapshot: &ParamSnapshot) {
        self.threshold_db.store(snapshot.threshold_db);
        self.ratio.store(snapshot.ratio);
        self.attack_ms.store(snapshot.attack_ms);
        self.release_ms.store(snapshot.release_ms);
        self.knee_db.store(snapshot.knee_db);
        self.set_character(snapshot.character);
        self.bypass.store(snapshot.bypass, Ordering::Relaxed);
        self.response_density_enabled
            .store(snapshot.response_density_enabled, Ordering::Relaxed);
        self.response_density.store(snapshot.response_density);
        self.heat_sink_enabled
            .store(snapshot.heat_sink_enabled, Ordering::Relaxed);
        self.heat_sink_amount.store(snapshot.heat_sink_amount);
        self.sidechain_enabled
            .store(snapshot.sidechain_enabled, Ordering::Relaxed);
        self.sidechain_frequency_hz
            .store(snapshot.sidechain_frequency_hz);
    }

    /// Read every value once
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            threshold_db: self.threshold_db.load(),
            ratio: self.ratio.load(),
            attack_ms: self.attack_ms.load(),
            release_ms: self.release_ms.load(),
            knee_db: self.knee_db.load(),
            character: self.character(),
            bypass: self.bypass.load(Ordering::Relaxed),
            response_density_enabled: self.response_density_enabled.load(Ordering::Relaxed),
            response_density: self.response_density.load(),
            heat_sink_enabled: self.heat_sink_enabled.load(Ordering::Relaxed),
            heat_sink_amount: self.heat_sink_amount.load(),
            sidechain_enabled: self.sidechain_enabled.load(Ordering::Relaxed),
            sidechain_frequency_hz: self.sidechain_frequency_hz.load(),
        }
    }

    pub fn set_character(&self, character: Character) {
        self.character.store(character.index(), Ordering::Relaxed);
    }

    pub fn character(&self) -> Character {
        Character::from_index(self.character.load(Ordering::Relaxed))
    }
}

impl Default for SharedParams {
    fn default() -> Self {
        Self::new()
    }
}
