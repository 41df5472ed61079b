//! Gain-reduction smoother
//!
//! One-pole exponential ramp toward a target set every sample.

/// Time constant used for gain-reduction smoothing
pub const GAIN_SMOOTHING_SECS: f64 = 0.005;

/// Exponentially smoothed value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedValue {
    current: f32,
    target: f32,
    coeff: f32,
}

impl SmoothedValue {
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
        }
    }

    /// Configure the time constant for a sample rate; the current value jumps
    /// to the target
    pub fn reset(&mut self, sample_rate: f64, time_secs: f64) {
        self.coeff = if sample_rate > 0.0 && time_secs > 0.0 {
            (1.0 - (-1.0 / (sample_rate * time_secs)).exp()) as f32
        } else {
            1.0
        };
        self.current = self.target;
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Force both current and target to `value`
    pub fn set_current_and_target(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// Advance one sample and return the smoothed value
    #[inline]
    pub fn next_value(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn coeff(&self) -> f32 {
        self.coeff
    }
}

impl Default for SmoothedValue {
    fn default() -> Self {
        Self::new(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approaches_target_without_overshoot() {
        let mut smoother = SmoothedValue::default();
        smoother.reset(48000.0, GAIN_SMOOTHING_SECS);
        smoother.set_target(-12.0);

        let mut previous = 0.0;
        for _ in 0..2400 {
            let v = smoother.next_value();
            assert!(v <= previous && v >= -12.0);
            previous = v;
        }
        // 50 ms is ten time constants
        assert!((previous + 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_one_time_constant_reaches_63_percent() {
        let mut smoother = SmoothedValue::default();
        smoother.reset(48000.0, GAIN_SMOOTHING_SECS);
        smoother.set_target(-10.0);
        let mut v = 0.0;
        for _ in 0..240 {
            v = smoother.next_value();
        }
        assert!((v + 6.32).abs() < 0.05, "got {}", v);
    }

    #[test]
    fn test_set_current_and_target_jumps() {
        let mut smoother = SmoothedValue::default();
        smoother.reset(44100.0, GAIN_SMOOTHING_SECS);
        smoother.set_target(-6.0);
        smoother.next_value();
        smoother.set_current_and_target(0.0);
        assert_eq!(smoother.current(), 0.0);
        assert_eq!(smoother.next_value(), 0.0);
    }
}
