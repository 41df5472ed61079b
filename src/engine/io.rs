//! Audio file I/O for Reactor
//!
//! WAV import and export through `hound`. Files keep their own sample rate
//! and channel count; the engine prepares itself for whatever it is given.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::engine::buffer::AudioBuffer;
use crate::error::{ReactorError, Result};

/// Export format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    /// Bit depth: 16, 24, or 32 (32 is written as float)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat { bit_depth: 24 }
    }
}

impl ExportFormat {
    /// Create a new export format with the given bit depth
    pub fn new(bit_depth: u16) -> Self {
        ExportFormat { bit_depth }
    }

    /// Reject bit depths the writer cannot produce
    pub fn validate(&self) -> Result<()> {
        match self.bit_depth {
            16 | 24 | 32 => Ok(()),
            other => Err(ReactorError::UnsupportedFormat {
                format: format!("{}-bit audio (only 16, 24, 32 supported)", other),
            }),
        }
    }
}

/// Import a WAV file as 32-bit float
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidAudio` - If the file is not a valid WAV file or is empty
/// * `UnsupportedFormat` - If the integer bit depth is not 8/16/24/32
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(ReactorError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let reader = WavReader::open(path).map_err(|e| ReactorError::InvalidAudio {
        reason: format!("Failed to open WAV file: {}", e),
        source: Some(Box::new(e)),
    })?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(ReactorError::InvalidAudio {
            reason: "WAV header declares zero channels".to_string(),
            source: None,
        });
    }

    let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
    if interleaved.is_empty() {
        return Err(ReactorError::InvalidAudio {
            reason: "WAV file contains no samples".to_string(),
            source: None,
        });
    }

    AudioBuffer::from_interleaved(&interleaved, channels, spec.sample_rate)
}

/// Export an AudioBuffer to a WAV file
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: ExportFormat) -> Result<()> {
    format.validate()?;

    let spec = WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: format.bit_depth,
        sample_format: if format.bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let mut writer = WavWriter::create(path, spec).map_err(hound_to_io)?;
    let interleaved = buffer.to_interleaved();

    match format.bit_depth {
        16 => {
            for sample in interleaved {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(hound_to_io)?;
            }
        }
        24 => {
            for sample in interleaved {
                // 24-bit stored as i32 in hound
                let scaled = (sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32;
                writer.write_sample(scaled).map_err(hound_to_io)?;
            }
        }
        _ => {
            for sample in interleaved {
                writer.write_sample(sample).map_err(hound_to_io)?;
            }
        }
    }

    writer.finalize().map_err(hound_to_io)?;
    Ok(())
}

/// Generate a mono sine test tone
pub fn generate_test_tone(
    frequency: f32,
    amplitude: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let mut buffer = AudioBuffer::new(1, num_samples, sample_rate);

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    for (i, sample) in buffer.samples[0].iter_mut().enumerate() {
        *sample = amplitude * (angular_freq * i as f32).sin();
    }

    buffer
}

/// Generate a stereo test tone with different frequencies per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    amplitude: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> AudioBuffer {
    let left = generate_test_tone(freq_left, amplitude, duration_secs, sample_rate);
    let right = generate_test_tone(freq_right, amplitude, duration_secs, sample_rate);

    let mut samples = left.samples;
    samples.extend(right.samples);
    AudioBuffer {
        samples,
        sample_rate,
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn hound_to_io(e: hound::Error) -> ReactorError {
    match e {
        hound::Error::IoError(io) => ReactorError::Io(io),
        other => ReactorError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            other.to_string(),
        )),
    }
}

/// Read samples from WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let scale = match (sample_format, bits_per_sample) {
        (SampleFormat::Float, _) => {
            return reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| ReactorError::InvalidAudio {
                    reason: format!("Failed to read float samples: {}", e),
                    source: Some(Box::new(e)),
                });
        }
        (SampleFormat::Int, 8) => 128.0,
        (SampleFormat::Int, 16) => 32768.0,
        (SampleFormat::Int, 24) => 8388608.0,
        (SampleFormat::Int, 32) => 2147483648.0,
        (SampleFormat::Int, bits) => {
            return Err(ReactorError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits),
            });
        }
    };

    reader
        .samples::<i32>()
        .map(|s| s.map(|v| (v as f64 / scale) as f32))
        .collect::<std::result::Result<Vec<f32>, _>>()
        .map_err(|e| ReactorError::InvalidAudio {
            reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
            source: Some(Box::new(e)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generate_test_tone() {
        let tone = generate_test_tone(1000.0, 0.5, 0.1, 48000);
        assert_eq!(tone.channels(), 1);
        assert_eq!(tone.len(), 4800);
        assert!((tone.peak() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_generate_stereo_test_tone() {
        let tone = generate_stereo_test_tone(440.0, 880.0, 1.0, 0.1, 44100);
        assert_eq!(tone.channels(), 2);
        assert_eq!(tone.channel(0).len(), tone.channel(1).len());
        assert_ne!(tone.channel(0)[10], tone.channel(1)[10]);
    }

    #[test]
    fn test_round_trip_32bit_float_is_exact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let tone = generate_stereo_test_tone(440.0, 660.0, 0.8, 0.2, 44100);

        export_audio(&tone, &path, ExportFormat::new(32)).unwrap();
        let loaded = import_audio(&path).unwrap();

        assert_eq!(loaded.sample_rate, 44100);
        assert!(loaded.is_identical_to(&tone));
    }

    #[test]
    fn test_round_trip_24bit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pcm24.wav");
        let tone = generate_test_tone(440.0, 0.5, 0.2, 48000);

        export_audio(&tone, &path, ExportFormat::default()).unwrap();
        let loaded = import_audio(&path).unwrap();

        assert_eq!(loaded.len(), tone.len());
        for (a, b) in tone.channel(0).iter().zip(loaded.channel(0)) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_export_unsupported_bit_depth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.wav");
        let tone = generate_test_tone(440.0, 0.5, 0.1, 48000);

        let result = export_audio(&tone, &path, ExportFormat::new(12));
        assert!(matches!(result, Err(ReactorError::UnsupportedFormat { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_export_format_validate() {
        for depth in [16, 24, 32] {
            assert!(ExportFormat::new(depth).validate().is_ok());
        }
        for depth in [0, 8, 20, 64] {
            assert!(ExportFormat::new(depth).validate().is_err());
        }
    }

    #[test]
    fn test_import_nonexistent_file() {
        let result = import_audio(Path::new("/nonexistent/reactor/input.wav"));
        assert!(matches!(result, Err(ReactorError::FileNotFound { .. })));
    }
}
