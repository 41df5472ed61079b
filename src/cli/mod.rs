//! CLI Module
//!
//! Command-line interface for rendering WAV files through the Reactor chain.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::dsp::Character;

/// Reactor - character compressor
#[derive(Parser, Debug)]
#[command(name = "reactor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process a WAV file through the compressor chain
    #[command(name = "render")]
    Render(RenderArgs),

    /// Print the static transfer curve
    #[command(name = "curve")]
    Curve(CurveArgs),
}

/// Parameter flags shared by every command; each overrides the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ParamOverrides {
    /// JSON parameter file (missing fields use defaults)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Threshold in dB (-60 to 0)
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<f32>,

    /// Ratio (1 to 20)
    #[arg(long)]
    pub ratio: Option<f32>,

    /// Attack in ms (0.1 to 100)
    #[arg(long)]
    pub attack: Option<f32>,

    /// Release in ms (10 to 2000)
    #[arg(long)]
    pub release: Option<f32>,

    /// Knee width in dB (0 to 24)
    #[arg(long)]
    pub knee: Option<f32>,

    /// Character: vca, fet or opto
    #[arg(long)]
    pub character: Option<Character>,

    /// Enable Response Density at this percentage (0 to 100)
    #[arg(long)]
    pub density: Option<f32>,

    /// Heat Sink amount in percent (0 to 100)
    #[arg(long)]
    pub heat_sink: Option<f32>,

    /// Enable the sidechain high-pass at this frequency (20 to 500 Hz)
    #[arg(long)]
    pub sidechain_hpf: Option<f32>,

    /// Bypass the compressor
    #[arg(long)]
    pub bypass: bool,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Input WAV file
    pub input: PathBuf,

    /// Output WAV file
    pub output: PathBuf,

    /// External sidechain WAV file
    #[arg(short, long)]
    pub sidechain: Option<PathBuf>,

    /// Processing block size in samples
    #[arg(long, default_value_t = 512)]
    pub block_size: usize,

    /// Output bit depth: 16, 24 or 32 (float)
    #[arg(long, default_value_t = 24)]
    pub bit_depth: u16,

    #[command(flatten)]
    pub params: ParamOverrides,
}

#[derive(Args, Debug)]
pub struct CurveArgs {
    /// Lowest input level in dB
    #[arg(long, default_value_t = -60.0, allow_negative_numbers = true)]
    pub from: f32,

    /// Highest input level in dB
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub to: f32,

    /// Step in dB
    #[arg(long, default_value_t = 3.0)]
    pub step: f32,

    #[command(flatten)]
    pub params: ParamOverrides,
}
