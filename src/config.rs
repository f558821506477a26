//! Session configuration
//!
//! The EAR threshold is the only tunable. It is set by the caller (CLI flag or
//! FFI argument); nothing is read from files or the environment.

use serde::{Deserialize, Serialize};

use crate::error::FocusError;

/// Default EAR threshold above which an eye counts as open
pub const DEFAULT_EAR_THRESHOLD: f64 = 0.25;

/// Configuration for a focus session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusConfig {
    /// Average EAR must exceed this value for a frame to count as focused
    pub ear_threshold: f64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
        }
    }
}

impl FocusConfig {
    /// Create a configuration with a validated threshold
    pub fn with_threshold(ear_threshold: f64) -> Result<Self, FocusError> {
        let config = Self { ear_threshold };
        config.validate()?;
        Ok(config)
    }

    /// Threshold must be finite and strictly inside (0, 1)
    pub fn validate(&self) -> Result<(), FocusError> {
        let t = self.ear_threshold;
        if !t.is_finite() || t <= 0.0 || t >= 1.0 {
            return Err(FocusError::InvalidThreshold(t));
        }
        Ok(())
    }
}
