//! Verification helpers for assembled shaping rules
//!
//! Provides assertion helpers over a [`TcParameters`] result that report
//! what was missing instead of panicking deep inside a map lookup.

use tcshape_parser::{ShapingRule, ShapingRuleMapping, TcParameters};
use tcshape_types::TrafficDirection;
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Device '{device}' not found in result")]
    DeviceNotFound { device: String },

    #[error("No {direction} rule for '{key}' on {device}")]
    RuleNotFound {
        device: String,
        direction: TrafficDirection,
        key: String,
    },

    #[error("Expected field '{field}' not found in rule '{key}'")]
    FieldNotFound { key: String, field: String },

    #[error("Value mismatch for {key}:{field}: expected '{expected}', got '{actual}'")]
    ValueMismatch {
        key: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Expected {expected} {direction} rules on {device}, found {actual}")]
    RuleCountMismatch {
        device: String,
        direction: TrafficDirection,
        expected: usize,
        actual: usize,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Shaping result verification helper
pub struct ShapingVerifier<'a> {
    params: &'a TcParameters,
}

impl<'a> ShapingVerifier<'a> {
    /// Create a new verifier over a `get_tc_parameter` result
    pub fn new(params: &'a TcParameters) -> Self {
        Self { params }
    }

    /// Rules of one device and direction
    pub fn rules(&self, device: &str, direction: TrafficDirection) -> VerifyResult<&'a ShapingRuleMapping> {
        self.params
            .get(device)
            .map(|shaping| shaping.direction(direction))
            .ok_or_else(|| VerificationError::DeviceNotFound {
                device: device.to_string(),
            })
    }

    /// Verify that a rule exists for a flow key
    pub fn assert_rule_exists(
        &self,
        device: &str,
        direction: TrafficDirection,
        key: &str,
    ) -> VerifyResult<&'a ShapingRule> {
        self.rules(device, direction)?
            .get(key)
            .ok_or_else(|| VerificationError::RuleNotFound {
                device: device.to_string(),
                direction,
                key: key.to_string(),
            })
    }

    /// Verify a single field of a rule
    pub fn assert_field(
        &self,
        device: &str,
        direction: TrafficDirection,
        key: &str,
        field: &str,
        expected: &str,
    ) -> VerifyResult<()> {
        let rule = self.assert_rule_exists(device, direction, key)?;
        let actual = rule
            .get(field)
            .ok_or_else(|| VerificationError::FieldNotFound {
                key: key.to_string(),
                field: field.to_string(),
            })?;

        if actual != expected {
            return Err(VerificationError::ValueMismatch {
                key: key.to_string(),
                field: field.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Verify several fields of a rule
    pub fn assert_fields(
        &self,
        device: &str,
        direction: TrafficDirection,
        key: &str,
        expected: &[(&str, &str)],
    ) -> VerifyResult<()> {
        for (field, value) in expected {
            self.assert_field(device, direction, key, field, value)?;
        }
        Ok(())
    }

    /// Verify the number of rules of one direction
    pub fn assert_rule_count(
        &self,
        device: &str,
        direction: TrafficDirection,
        expected: usize,
    ) -> VerifyResult<()> {
        let actual = self.rules(device, direction)?.len();
        if actual != expected {
            return Err(VerificationError::RuleCountMismatch {
                device: device.to_string(),
                direction,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Verify that a device has no incoming rules
    pub fn assert_no_incoming(&self, device: &str) -> VerifyResult<()> {
        self.assert_rule_count(device, TrafficDirection::Incoming, 0)
    }
}
