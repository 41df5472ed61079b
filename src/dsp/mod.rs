//! DSP stages
//!
//! Detector, gain computer and character models feed the compressor core;
//! the sidechain filter and heat sink are independent stages composed by
//! `ReactorChain`.

pub mod biquad;
mod chain;
mod character;
mod compressor;
mod effect;
mod gain_computer;
mod heat_sink;
mod level_detector;
mod sidechain_filter;
mod smoothing;

pub use chain::{ChainStatus, ReactorChain};
pub use character::Character;
pub use compressor::CompressorCore;
pub use effect::Effect;
pub use gain_computer::GainComputer;
pub use heat_sink::{soft_clip, HeatSink};
pub use level_detector::{time_to_coeff, DetectorMode, LevelDetector, LEVEL_FLOOR_DB};
pub use sidechain_filter::SidechainFilter;
pub use smoothing::{SmoothedValue, GAIN_SMOOTHING_SECS};
