//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use super::{CurveArgs, ParamOverrides, RenderArgs};
use crate::dsp::{GainComputer, ReactorChain};
use crate::engine::{export_audio, import_audio, AudioBuffer, ExportFormat};
use crate::error::{ReactorError, Result};
use crate::params::{ParamSnapshot, SharedParams};

/// Outcome of a render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub frames: usize,
    pub channels: usize,
    pub sample_rate: u32,
    /// Deepest smoothed gain reduction seen at a block boundary (dB)
    pub max_gain_reduction_db: f32,
    pub output_peak: f32,
}

/// Build the parameter set from an optional config file and flag overrides
pub fn resolve_params(overrides: &ParamOverrides) -> Result<ParamSnapshot> {
    let mut snapshot = match &overrides.config {
        Some(path) => ParamSnapshot::from_json_file(path)?,
        None => ParamSnapshot::default(),
    };

    if let Some(v) = overrides.threshold {
        snapshot.threshold_db = v;
    }
    if let Some(v) = overrides.ratio {
        snapshot.ratio = v;
    }
    if let Some(v) = overrides.attack {
        snapshot.attack_ms = v;
    }
    if let Some(v) = overrides.release {
        snapshot.release_ms = v;
    }
    if let Some(v) = overrides.knee {
        snapshot.knee_db = v;
    }
    if let Some(character) = overrides.character {
        snapshot.character = character;
    }
    if let Some(v) = overrides.density {
        snapshot.response_density_enabled = true;
        snapshot.response_density = v;
    }
    if let Some(v) = overrides.heat_sink {
        snapshot.heat_sink_enabled = true;
        snapshot.heat_sink_amount = v;
    }
    if let Some(v) = overrides.sidechain_hpf {
        snapshot.sidechain_enabled = true;
        snapshot.sidechain_frequency_hz = v;
    }
    if overrides.bypass {
        snapshot.bypass = true;
    }

    snapshot.validate()?;
    Ok(snapshot)
}

/// `reactor render`
pub fn render(args: &RenderArgs) -> Result<()> {
    let snapshot = resolve_params(&args.params)?;
    let summary = render_file(
        &args.input,
        &args.output,
        args.sidechain.as_deref(),
        &snapshot,
        args.block_size,
        ExportFormat::new(args.bit_depth),
    )?;

    println!("Rendered: {}", args.output.display());
    println!(
        "  {} frames, {} channels, {} Hz",
        summary.frames, summary.channels, summary.sample_rate
    );
    println!("  Peak gain reduction: {:.2} dB", summary.max_gain_reduction_db);
    println!("  Output peak: {:.3}", summary.output_peak);

    Ok(())
}

/// Process `input` through a fresh chain and write `output`
pub fn render_file(
    input: &Path,
    output: &Path,
    sidechain: Option<&Path>,
    snapshot: &ParamSnapshot,
    block_size: usize,
    format: ExportFormat,
) -> Result<RenderSummary> {
    if block_size == 0 {
        return Err(ReactorError::InvalidParameter {
            param: "block_size".to_string(),
            value: "0".to_string(),
            expected: "at least 1".to_string(),
        });
    }

    format.validate()?;

    info!("Rendering {} -> {}", input.display(), output.display());
    let mut audio = import_audio(input)?;

    let key = match sidechain {
        Some(path) => {
            let key = import_audio(path)?;
            if key.sample_rate != audio.sample_rate {
                return Err(ReactorError::Config {
                    reason: format!(
                        "sidechain sample rate {} Hz does not match input {} Hz",
                        key.sample_rate, audio.sample_rate
                    ),
                });
            }
            if key.len() < audio.len() {
                warn!(
                    "Sidechain is shorter than the input; detection falls back to the input after {} frames",
                    key.len()
                );
            }
            Some(key)
        }
        None => None,
    };

    let channels = audio.num_channels();
    let frames = audio.len();
    let mut chain = ReactorChain::new(Arc::new(SharedParams::from_snapshot(snapshot)));
    chain.prepare(audio.sample_rate as f64, block_size, channels);

    let mut block = AudioBuffer::new(channels, block_size, audio.sample_rate);
    let mut key_block = AudioBuffer::new(
        key.as_ref().map_or(0, AudioBuffer::num_channels),
        block_size,
        audio.sample_rate,
    );
    let mut max_gain_reduction_db = 0.0_f32;

    let mut start = 0;
    while start < frames {
        let end = (start + block_size).min(frames);
        copy_range(&audio, &mut block, start, end);

        let key_slice = match &key {
            Some(k) if start < k.len() => {
                copy_range(k, &mut key_block, start, end);
                Some(&key_block)
            }
            _ => None,
        };

        chain.process(&mut block, key_slice);
        max_gain_reduction_db = max_gain_reduction_db.min(chain.gain_reduction_db());

        for (dst, src) in audio.samples.iter_mut().zip(&block.samples) {
            dst[start..end].copy_from_slice(src);
        }
        start = end;
    }

    debug!("Processed {} blocks", frames.div_ceil(block_size));

    export_audio(&audio, output, format)?;

    Ok(RenderSummary {
        frames,
        channels,
        sample_rate: audio.sample_rate,
        max_gain_reduction_db,
        output_peak: audio.peak(),
    })
}

/// `reactor curve`
pub fn curve(args: &CurveArgs) -> Result<()> {
    let snapshot = resolve_params(&args.params)?;
    let points = transfer_curve(&snapshot, args.from, args.to, args.step);
    if points.is_empty() {
        return Err(ReactorError::InvalidParameter {
            param: "step".to_string(),
            value: args.step.to_string(),
            expected: "a positive step with from <= to".to_string(),
        });
    }

    println!(
        "threshold {} dB, ratio {}:1, knee {} dB",
        snapshot.threshold_db, snapshot.ratio, snapshot.knee_db
    );
    println!("{:>10} {:>10} {:>10}", "in (dB)", "out (dB)", "gr (dB)");
    for (input, output) in points {
        println!("{:>10.2} {:>10.2} {:>10.2}", input, output, output - input);
    }
    Ok(())
}

/// Static curve for the threshold / ratio / knee in `snapshot`
pub fn transfer_curve(snapshot: &ParamSnapshot, from_db: f32, to_db: f32, step_db: f32) -> Vec<(f32, f32)> {
    let mut computer = GainComputer::new();
    computer.set_threshold(snapshot.threshold_db);
    computer.set_ratio(snapshot.ratio);
    computer.set_knee(snapshot.knee_db);
    computer.transfer_curve(from_db, to_db, step_db)
}

/// Copy frames `start..end` of `src` into `dst`, reusing its allocations
///
/// Channels of `src` that end before `end` are copied as far as they go.
fn copy_range(src: &AudioBuffer, dst: &mut AudioBuffer, start: usize, end: usize) {
    for (to, from) in dst.samples.iter_mut().zip(&src.samples) {
        to.clear();
        let stop = end.min(from.len());
        if start < stop {
            to.extend_from_slice(&from[start..stop]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::Character;
    use crate::engine::generate_stereo_test_tone;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_params_overrides_config() {
        let dir = tempdir().unwrap();
        let config = dir.path().join("p.json");
        std::fs::write(&config, r#"{ "threshold_db": -30.0, "character": "fet" }"#).unwrap();

        let overrides = ParamOverrides {
            config: Some(config),
            ratio: Some(8.0),
            density: Some(75.0),
            ..ParamOverrides::default()
        };
        let p = resolve_params(&overrides).unwrap();
        assert_eq!(p.threshold_db, -30.0);
        assert_eq!(p.character, Character::Fet);
        assert_eq!(p.ratio, 8.0);
        assert!(p.response_density_enabled);
        assert_eq!(p.response_density, 75.0);
    }

    #[test]
    fn test_resolve_params_rejects_out_of_range() {
        let overrides = ParamOverrides {
            ratio: Some(50.0),
            ..ParamOverrides::default()
        };
        assert!(matches!(
            resolve_params(&overrides),
            Err(ReactorError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_render_file_compresses() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        let tone = generate_stereo_test_tone(220.0, 330.0, 0.9, 0.5, 44100);
        export_audio(&tone, &input, ExportFormat::new(32)).unwrap();

        let snapshot = ParamSnapshot {
            threshold_db: -30.0,
            ..ParamSnapshot::default()
        };
        let summary =
            render_file(&input, &output, None, &snapshot, 256, ExportFormat::new(32)).unwrap();

        assert_eq!(summary.frames, tone.len());
        assert_eq!(summary.channels, 2);
        assert_eq!(summary.sample_rate, 44100);
        assert!(summary.max_gain_reduction_db < -10.0);

        let rendered = import_audio(&output).unwrap();
        assert_eq!(rendered.len(), tone.len());
        assert!(rendered.peak() < tone.peak());
    }

    #[test]
    fn test_render_rejects_mismatched_sidechain_rate() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let key = dir.path().join("key.wav");
        export_audio(
            &generate_stereo_test_tone(100.0, 100.0, 0.5, 0.1, 48000),
            &input,
            ExportFormat::default(),
        )
        .unwrap();
        export_audio(
            &generate_stereo_test_tone(100.0, 100.0, 0.5, 0.1, 44100),
            &key,
            ExportFormat::default(),
        )
        .unwrap();

        let result = render_file(
            &input,
            &dir.path().join("out.wav"),
            Some(&key),
            &ParamSnapshot::default(),
            512,
            ExportFormat::default(),
        );
        assert!(matches!(result, Err(ReactorError::Config { .. })));
    }

    #[test]
    fn test_render_rejects_bit_depth_before_processing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.wav");
        export_audio(
            &generate_stereo_test_tone(100.0, 100.0, 0.5, 0.1, 48000),
            &input,
            ExportFormat::default(),
        )
        .unwrap();

        for depth in [8, 20] {
            let result = render_file(
                &input,
                &output,
                None,
                &ParamSnapshot::default(),
                512,
                ExportFormat::new(depth),
            );
            assert!(matches!(result, Err(ReactorError::UnsupportedFormat { .. })));
            assert!(!output.exists());
        }

        // Checked ahead of reading the input
        let missing = render_file(
            &dir.path().join("missing.wav"),
            &output,
            None,
            &ParamSnapshot::default(),
            512,
            ExportFormat::new(20),
        );
        assert!(matches!(missing, Err(ReactorError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_transfer_curve_uses_snapshot() {
        let snapshot = ParamSnapshot {
            threshold_db: -18.0,
            ratio: 4.0,
            knee_db: 0.0,
            ..ParamSnapshot::default()
        };
        let points = transfer_curve(&snapshot, -24.0, -12.0, 6.0);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], (-24.0, -24.0));
        assert!((points[2].1 - -16.5).abs() < 1e-4);
    }
}
