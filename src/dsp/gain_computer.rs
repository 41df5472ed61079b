//! Static gain computer
//!
//! Maps a detected level in dB to gain reduction in dB through a
//! threshold / ratio / knee transfer function. Gain reduction is always
//! zero or negative.

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_THRESHOLD_DB: f32 = -18.0;
const DEFAULT_RATIO: f32 = 4.0;
const DEFAULT_KNEE_DB: f32 = 6.0;

/// Lowest accepted ratio (no compression)
pub const MIN_RATIO: f32 = 1.0;

/// Lowest accepted knee width (hard knee)
pub const MIN_KNEE_DB: f32 = 0.0;

/// Threshold / ratio / knee transfer function
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainComputer {
    threshold_db: f32,
    ratio: f32,
    knee_db: f32,
}

impl GainComputer {
    pub fn new() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
            ratio: DEFAULT_RATIO,
            knee_db: DEFAULT_KNEE_DB,
        }
    }

    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db;
    }

    /// Set the ratio; values below 1:1 are clamped to 1:1
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio.max(MIN_RATIO);
    }

    /// Set the knee width; negative widths are clamped to a hard knee
    pub fn set_knee(&mut self, knee_db: f32) {
        self.knee_db = knee_db.max(MIN_KNEE_DB);
    }

    pub fn threshold(&self) -> f32 {
        self.threshold_db
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn knee(&self) -> f32 {
        self.knee_db
    }

    /// Gain reduction in dB (<= 0) for an input level in dB
    #[inline]
    pub fn compute_gain_reduction(&self, input_db: f32) -> f32 {
        let threshold = self.threshold_db;
        let slope = 1.0 / self.ratio;

        if self.knee_db <= 0.0 {
            if input_db <= threshold {
                return 0.0;
            }
            return threshold + (input_db - threshold) * slope - input_db;
        }

        let half_knee = self.knee_db * 0.5;
        let knee_start = threshold - half_knee;
        let knee_end = threshold + half_knee;

        if input_db <= knee_start {
            0.0
        } else if input_db >= knee_end {
            threshold + (input_db - threshold) * slope - input_db
        } else {
            // Quadratic interpolation across the knee
            let a = input_db - threshold + half_knee;
            let output_db = input_db - (1.0 - slope) * a * a / (2.0 * self.knee_db);
            output_db - input_db
        }
    }

    /// Output level in dB for an input level in dB
    #[inline]
    pub fn compute_output_level(&self, input_db: f32) -> f32 {
        input_db + self.compute_gain_reduction(input_db)
    }

    /// Sample the static curve as `(input_db, output_db)` pairs
    ///
    /// Includes `from_db`, and `to_db` when the step lands on it. An empty
    /// vector is returned for a non-positive step or an inverted range.
    pub fn transfer_curve(&self, from_db: f32, to_db: f32, step_db: f32) -> Vec<(f32, f32)> {
        if step_db <= 0.0 || to_db < from_db {
            return Vec::new();
        }

        let steps = ((to_db - from_db) / step_db + 1e-4).floor() as usize;
        (0..=steps)
            .map(|i| {
                let input = from_db + i as f32 * step_db;
                (input, self.compute_output_level(input))
            })
            .collect()
    }
}

impl Default for GainComputer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn computer(threshold: f32, ratio: f32, knee: f32) -> GainComputer {
        let mut gc = GainComputer::new();
        gc.set_threshold(threshold);
        gc.set_ratio(ratio);
        gc.set_knee(knee);
        gc
    }

    #[test]
    fn test_unity_ratio_never_reduces() {
        for knee in [0.0, 6.0, 24.0] {
            let gc = computer(-30.0, 1.0, knee);
            let mut x = -100.0;
            while x <= 20.0 {
                assert_eq!(gc.compute_gain_reduction(x), 0.0, "x={} knee={}", x, knee);
                x += 0.5;
            }
        }
    }

    #[test]
    fn test_hard_knee_formula() {
        let gc = computer(-20.0, 3.0, 0.0);
        assert_eq!(gc.compute_gain_reduction(-40.0), 0.0);
        assert_eq!(gc.compute_gain_reduction(-20.0), 0.0);
        for x in [-19.0_f32, -10.0, 0.0, 6.0] {
            let expected = -20.0 + (x + 20.0) / 3.0 - x;
            assert_relative_eq!(gc.compute_gain_reduction(x), expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_gain_reduction_is_never_positive() {
        let gc = computer(-18.0, 8.0, 12.0);
        let mut x = -80.0;
        while x <= 10.0 {
            assert!(gc.compute_gain_reduction(x) <= 0.0, "x={}", x);
            x += 0.25;
        }
    }

    #[test]
    fn test_hard_knee_reference_value() {
        let gc = computer(-18.0, 4.0, 0.0);
        assert_relative_eq!(gc.compute_gain_reduction(-12.0), -4.5, epsilon = 1e-5);
    }

    #[test]
    fn test_soft_knee_reference_value() {
        let gc = computer(-18.0, 4.0, 6.0);
        assert_relative_eq!(gc.compute_gain_reduction(-18.0), -0.5625, epsilon = 1e-5);
    }

    #[test]
    fn test_soft_knee_continuous_at_edges() {
        let soft = computer(-18.0, 4.0, 6.0);
        let hard = computer(-18.0, 4.0, 0.0);
        let h = 1e-3_f32;

        for edge in [-21.0_f32, -15.0] {
            // Outside the knee both curves agree; just inside they differ by O(h^2)
            for x in [edge - h, edge, edge + h] {
                let gap = (soft.compute_gain_reduction(x) - hard.compute_gain_reduction(x)).abs();
                assert!(gap < 1e-4, "value jump at {}: {}", x, gap);
            }

            let below = soft.compute_gain_reduction(edge - h);
            let at = soft.compute_gain_reduction(edge);
            let above = soft.compute_gain_reduction(edge + h);
            let left_slope = (at - below) / h;
            let right_slope = (above - at) / h;
            assert!(
                (left_slope - right_slope).abs() < 0.01,
                "slope jump at {}: {} vs {}",
                edge,
                left_slope,
                right_slope
            );
        }
    }

    #[test]
    fn test_setters_clamp() {
        let mut gc = GainComputer::new();
        gc.set_ratio(0.25);
        gc.set_knee(-3.0);
        assert_eq!(gc.ratio(), 1.0);
        assert_eq!(gc.knee(), 0.0);
    }

    #[test]
    fn test_output_level_and_curve() {
        let gc = computer(-18.0, 4.0, 0.0);
        assert_relative_eq!(gc.compute_output_level(-12.0), -16.5, epsilon = 1e-5);
        assert_eq!(gc.compute_output_level(-30.0), -30.0);

        let curve = gc.transfer_curve(-60.0, 0.0, 6.0);
        assert_eq!(curve.len(), 11);
        assert_eq!(curve[0].0, -60.0);
        assert_relative_eq!(curve[10].0, 0.0, epsilon = 1e-4);
        assert!(curve.windows(2).all(|w| w[1].1 >= w[0].1));

        assert!(gc.transfer_curve(0.0, -10.0, 1.0).is_empty());
        assert!(gc.transfer_curve(-10.0, 0.0, 0.0).is_empty());
    }
}
