/*!
 * Budget Governor
 *
 * Three operating modes derived from the reserve level on every cycle:
 *
 * | Mode      | Reserve                           | Eligible priorities | Soft ceiling                 |
 * |-----------|-----------------------------------|---------------------|------------------------------|
 * | Normal    | >= safe watermark                 | all                 | burst × per-cycle ceiling    |
 * | Safe      | [emergency, safe) watermark       | <= safe threshold   | conservative × sustained     |
 * | Emergency | < emergency watermark             | 0 only              | conservative × sustained     |
 *
 * The hard ceiling is `hard × per-cycle ceiling` in every mode. Transitions are
 * level-triggered on the raw reading; there is no hysteresis band.
 */

use super::config::BudgetConfig;
use crate::clock::ClockProvider;
use crate::core::limits::CRITICAL_PRIORITY;
use crate::core::types::{Compute, Priority};
use serde::{Deserialize, Serialize};

/// Operating mode for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    #[default]
    Normal,
    Safe,
    Emergency,
}

impl OperatingMode {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Safe => "safe",
            Self::Emergency => "emergency",
        }
    }
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute ceilings in effect for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ceilings {
    pub soft: Compute,
    pub hard: Compute,
}

#[derive(Debug, Clone)]
pub struct BudgetGovernor {
    config: BudgetConfig,
}

impl BudgetGovernor {
    pub fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Mode for a reserve reading
    pub fn mode_for(&self, reserve: Compute) -> OperatingMode {
        if reserve < self.config.emergency_watermark {
            OperatingMode::Emergency
        } else if reserve < self.config.safe_watermark {
            OperatingMode::Safe
        } else {
            OperatingMode::Normal
        }
    }

    /// Whether processes at `priority` may run in `mode`
    #[inline]
    pub fn is_eligible(&self, mode: OperatingMode, priority: Priority) -> bool {
        match mode {
            OperatingMode::Normal => true,
            OperatingMode::Safe => priority <= self.config.safe_priority_threshold,
            OperatingMode::Emergency => priority == CRITICAL_PRIORITY,
        }
    }

    /// Soft and hard ceilings for `mode` given the clock's current limits
    pub fn ceilings(&self, mode: OperatingMode, clock: &dyn ClockProvider) -> Ceilings {
        let cycle_ceiling = clock.cycle_ceiling();
        let soft = match mode {
            OperatingMode::Normal => cycle_ceiling * self.config.burst_fraction,
            OperatingMode::Safe | OperatingMode::Emergency => {
                clock.sustained_ceiling() * self.config.conservative_fraction
            }
        };
        Ceilings {
            soft,
            hard: cycle_ceiling * self.config.hard_fraction,
        }
    }
}

impl Default for BudgetGovernor {
    fn default() -> Self {
        Self::new(BudgetConfig::default())
    }
}
