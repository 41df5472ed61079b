//! Effect trait definition
//!
//! Common lifecycle shared by the compressor, the sidechain filter and the
//! heat sink.

use crate::engine::AudioBuffer;
use crate::error::{ReactorError, Result};
use serde_json::Value;

/// Base trait for all DSP stages
///
/// Stages process planar buffers in place. Processing never fails; the
/// by-name parameter interface reports type and name errors.
pub trait Effect: Send + Sync {
    /// Process audio buffer in-place
    fn process(&mut self, buffer: &mut AudioBuffer);

    /// Prepare the effect for processing
    ///
    /// Called when sample rate or block size changes.
    fn prepare(&mut self, sample_rate: f64, max_block_size: usize);

    /// Reset effect state
    ///
    /// Clears envelopes, smoothing and filter history.
    fn reset(&mut self);

    /// Get the effect type identifier
    fn effect_type(&self) -> &'static str;

    /// Get human-readable display name
    fn display_name(&self) -> &str;

    /// Check if effect is enabled
    fn is_enabled(&self) -> bool;

    /// Enable or disable the effect
    fn set_enabled(&mut self, enabled: bool);

    /// Get all parameters as JSON
    fn get_params(&self) -> Value;

    /// Set a single parameter by name
    fn set_param(&mut self, name: &str, value: &Value) -> Result<()>;
}

/// Helper macro to implement common Effect trait methods
///
/// Expects an `enabled: bool` field on the implementing type.
#[macro_export]
macro_rules! impl_effect_common {
    ($effect_type:expr, $display_name:expr) => {
        fn effect_type(&self) -> &'static str {
            $effect_type
        }

        fn display_name(&self) -> &str {
            $display_name
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn set_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
        }
    };
}

/// Read a numeric JSON parameter
pub(crate) fn expect_number(name: &str, value: &Value) -> Result<f32> {
    value
        .as_f64()
        .map(|v| v as f32)
        .ok_or_else(|| ReactorError::InvalidParameter {
            param: name.to_string(),
            value: value.to_string(),
            expected: "a number".to_string(),
        })
}

/// Read a boolean JSON parameter
pub(crate) fn expect_bool(name: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| ReactorError::InvalidParameter {
        param: name.to_string(),
        value: value.to_string(),
        expected: "true or false".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expect_number() {
        assert_eq!(expect_number("ratio", &json!(4)).unwrap(), 4.0);
        assert_eq!(expect_number("ratio", &json!(2.5)).unwrap(), 2.5);
        let err = expect_number("ratio", &json!("fast")).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_expect_bool() {
        assert!(expect_bool("enabled", &json!(true)).unwrap());
        assert!(expect_bool("enabled", &json!(1)).is_err());
    }
}
