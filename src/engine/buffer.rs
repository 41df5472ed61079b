//! Audio Buffer Management
//!
//! Provides the planar audio buffer used by every processing stage and the
//! dB-to-gain conversion used by the compressor.

use crate::error::{ReactorError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Sample rate used when nothing else is known
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
///
/// # Arguments
/// * `db` - Value in decibels
///
/// # Returns
/// Linear amplitude (0.0 to 1.0+ range)
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Planar multichannel audio buffer
///
/// Stores audio as non-interleaved 32-bit floating point samples.
/// Each channel is a separate `Vec<f32>` of the same length.
///
/// # Example
/// ```
/// use reactor::engine::AudioBuffer;
///
/// let buffer = AudioBuffer::new(2, 48000, 48000);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.len(), 48000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    pub samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a silent buffer
    pub fn new(num_channels: usize, num_samples: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; num_channels],
            sample_rate,
        }
    }

    /// Create a buffer from per-channel sample vectors
    ///
    /// All channels must have the same length.
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if let Some(first) = samples.first() {
            let expected = first.len();
            if let Some((ch, bad)) = samples
                .iter()
                .enumerate()
                .find(|(_, channel)| channel.len() != expected)
            {
                return Err(ReactorError::InvalidAudio {
                    reason: format!(
                        "Channel {} has {} samples, expected {}",
                        ch,
                        bad.len(),
                        expected
                    ),
                    source: None,
                });
            }
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create an audio buffer from interleaved sample data
    ///
    /// # Arguments
    /// * `interleaved` - Interleaved sample data (L, R, L, R, ... for stereo)
    /// * `num_channels` - Number of interleaved channels
    /// * `sample_rate` - Sample rate in Hz
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(ReactorError::InvalidAudio {
                reason: "Channel count must be at least 1".to_string(),
                source: None,
            });
        }

        if interleaved.len() % num_channels != 0 {
            return Err(ReactorError::InvalidAudio {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
                source: None,
            });
        }

        let num_samples = interleaved.len() / num_channels;
        let mut samples = vec![Vec::with_capacity(num_samples); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let num_channels = self.channels();
        let num_samples = self.len();

        let mut interleaved = Vec::with_capacity(num_channels * num_samples);
        for sample_idx in 0..num_samples {
            for channel in &self.samples {
                interleaved.push(channel[sample_idx]);
            }
        }
        interleaved
    }

    /// Get the number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Alias for channels()
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Alias for len()
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.len()
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Get mutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Make this buffer an exact copy of `other`
    ///
    /// Reuses the existing channel allocations, so once a buffer has been
    /// sized for the largest block it can be refilled without allocating.
    pub fn copy_from(&mut self, other: &AudioBuffer) {
        self.sample_rate = other.sample_rate;
        self.samples.truncate(other.channels());
        while self.samples.len() < other.channels() {
            self.samples.push(Vec::new());
        }
        for (dst, src) in self.samples.iter_mut().zip(&other.samples) {
            dst.clear();
            dst.extend_from_slice(src);
        }
    }

    /// Check if two buffers hold bit-identical samples
    pub fn is_identical_to(&self, other: &AudioBuffer) -> bool {
        self.channels() == other.channels()
            && self.samples.iter().zip(&other.samples).all(|(a, b)| {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            })
    }

    /// Check if all samples are finite (not NaN or Infinity)
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }

    /// Largest absolute sample value across all channels (linear)
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| s.abs())
            .fold(0.0_f32, f32::max)
    }

}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new(2, 0, DEFAULT_SAMPLE_RATE)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_buffer(samples: Vec<Vec<f32>>) -> AudioBuffer {
        AudioBuffer {
            samples,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
        assert!(db_to_linear(-120.0) < 1e-5);
    }

    #[test]
    fn test_buffer_new() {
        let buffer = AudioBuffer::new(2, 1000, 44100);
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.len(), 1000);
        assert_eq!(buffer.sample_rate, 44100);
        assert!(buffer.peak() == 0.0);
    }

    #[test]
    fn test_buffer_from_channels_mismatch() {
        let result = AudioBuffer::from_channels(vec![vec![0.0; 10], vec![0.0; 9]], 48000);
        assert!(matches!(result, Err(ReactorError::InvalidAudio { .. })));
    }

    #[test]
    fn test_buffer_from_interleaved_stereo() {
        let interleaved = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let buffer = AudioBuffer::from_interleaved(&interleaved, 2, DEFAULT_SAMPLE_RATE).unwrap();

        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.channel(0), &[0.1, 0.3, 0.5]);
        assert_eq!(buffer.channel(1), &[0.2, 0.4, 0.6]);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_buffer_from_interleaved_invalid() {
        let interleaved = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        assert!(AudioBuffer::from_interleaved(&interleaved, 2, DEFAULT_SAMPLE_RATE).is_err());
        assert!(AudioBuffer::from_interleaved(&interleaved, 0, DEFAULT_SAMPLE_RATE).is_err());
    }

    #[test]
    fn test_copy_from_reshapes_and_reuses() {
        let source = create_test_buffer(vec![vec![0.25; 64], vec![-0.25; 64], vec![0.5; 64]]);
        let mut scratch = AudioBuffer::new(2, 512, 44100);

        scratch.copy_from(&source);
        assert!(scratch.is_identical_to(&source));
        assert_eq!(scratch.sample_rate, DEFAULT_SAMPLE_RATE);

        let mono = create_test_buffer(vec![vec![0.1; 16]]);
        scratch.copy_from(&mono);
        assert_eq!(scratch.channels(), 1);
        assert_eq!(scratch.len(), 16);
    }

    #[test]
    fn test_is_identical_to_detects_single_bit() {
        let a = create_test_buffer(vec![vec![0.5; 8]]);
        let mut b = a.clone();
        assert!(a.is_identical_to(&b));

        b.samples[0][3] = f32::from_bits(0.5_f32.to_bits() + 1);
        assert!(!a.is_identical_to(&b));
    }

    #[test]
    fn test_buffer_is_finite() {
        assert!(create_test_buffer(vec![vec![0.5; 100]]).is_finite());
        assert!(!create_test_buffer(vec![vec![f32::NAN; 100]]).is_finite());
    }
}
