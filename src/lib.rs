//! Reactor - Character Compression Engine
//!
//! A per-sample compressor with three analog-modelled characters (VCA, FET,
//! Opto) that change detection, timing, gain-reduction shape and saturation.
//!
//! # Architecture
//!
//! - `dsp`: level detector, gain computer, character models, compressor core,
//!   sidechain high-pass, heat sink soft clipper and the processing chain
//! - `params`: lock-free parameter store, JSON configuration and metering
//! - `engine`: planar audio buffer and WAV file I/O
//! - `cli`: the `reactor` command-line renderer

pub mod cli;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod params;

pub use dsp::{Character, CompressorCore, Effect, HeatSink, ReactorChain, SidechainFilter};
pub use engine::AudioBuffer;
pub use error::{ReactorError, Result};
pub use params::{GainReductionMeter, ParamSnapshot, SharedParams};
