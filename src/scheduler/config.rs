/*!
 * Kernel Configuration
 * Budget thresholds and persistence settings, loadable from JSON
 */

use crate::core::data_structures::InlineString;
use crate::core::errors::KernelError;
use crate::core::limits::*;
use crate::core::types::{Compute, KernelResult, Priority};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Budget governor thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Reserve at or above this runs in Normal mode
    pub safe_watermark: Compute,
    /// Reserve below this runs in Emergency mode
    pub emergency_watermark: Compute,
    /// Highest priority eligible in Safe mode
    pub safe_priority_threshold: Priority,
    /// Normal-mode soft ceiling as a fraction of the per-cycle ceiling
    pub burst_fraction: f64,
    /// Safe/Emergency soft ceiling as a fraction of the sustained ceiling
    pub conservative_fraction: f64,
    /// Hard ceiling as a fraction of the per-cycle ceiling, every mode
    pub hard_fraction: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            safe_watermark: DEFAULT_SAFE_WATERMARK,
            emergency_watermark: DEFAULT_EMERGENCY_WATERMARK,
            safe_priority_threshold: DEFAULT_SAFE_PRIORITY_THRESHOLD,
            burst_fraction: DEFAULT_BURST_FRACTION,
            conservative_fraction: DEFAULT_CONSERVATIVE_FRACTION,
            hard_fraction: DEFAULT_HARD_FRACTION,
        }
    }
}

impl BudgetConfig {
    /// Reject watermarks and fractions the governor cannot work with
    pub fn validate(&self) -> KernelResult<()> {
        if !(self.emergency_watermark <= self.safe_watermark) {
            return Err(config_error(format!(
                "emergency watermark ({}) must not exceed safe watermark ({})",
                self.emergency_watermark, self.safe_watermark
            )));
        }
        for (name, value) in [
            ("burst_fraction", self.burst_fraction),
            ("conservative_fraction", self.conservative_fraction),
            ("hard_fraction", self.hard_fraction),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(config_error(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.burst_fraction > self.hard_fraction {
            return Err(config_error(format!(
                "burst_fraction ({}) must not exceed hard_fraction ({})",
                self.burst_fraction, self.hard_fraction
            )));
        }
        Ok(())
    }
}

/// Top-level kernel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub budget: BudgetConfig,
    /// Store key the snapshot blob is written under
    pub snapshot_key: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            budget: BudgetConfig::default(),
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
        }
    }
}

impl KernelConfig {
    /// Parse a (possibly partial) JSON document; missing fields keep defaults
    pub fn from_json_str(json: &str) -> KernelResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| config_error(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> KernelResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> KernelResult<()> {
        if self.snapshot_key.is_empty() {
            return Err(config_error("snapshot_key must not be empty".to_string()));
        }
        self.budget.validate()
    }

    #[must_use]
    pub fn with_budget(mut self, budget: BudgetConfig) -> Self {
        self.budget = budget;
        self
    }

    #[must_use]
    pub fn with_snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }
}

#[cold]
#[inline(never)]
fn config_error(message: String) -> KernelError {
    KernelError::Configuration(InlineString::from(message))
}
