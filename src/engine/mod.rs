//! Audio Engine Module
//!
//! Buffer type, dB conversion and WAV file I/O shared by the DSP stages
//! and the command-line renderer.

pub mod buffer;
pub mod io;

pub use buffer::{db_to_linear, AudioBuffer, DEFAULT_SAMPLE_RATE};
pub use io::{
    export_audio, generate_stereo_test_tone, generate_test_tone, import_audio, ExportFormat,
};
