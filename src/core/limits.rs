/*!
 * Kernel Limits and Defaults
 *
 * Centralized location for budget thresholds and other tunables.
 * Every value here is a default for `KernelConfig` and can be overridden.
 */

use super::types::{Compute, Priority};

// =============================================================================
// RESERVE WATERMARKS
// =============================================================================

/// Reserve level at or above which the kernel runs in Normal mode
pub const DEFAULT_SAFE_WATERMARK: Compute = 1_000.0;

/// Reserve level below which the kernel enters Emergency mode
pub const DEFAULT_EMERGENCY_WATERMARK: Compute = 100.0;

/// Highest priority still eligible while in Safe mode
pub const DEFAULT_SAFE_PRIORITY_THRESHOLD: Priority = 3;

/// Priority reserved for processes that must run in every mode
pub const CRITICAL_PRIORITY: Priority = 0;

// =============================================================================
// CEILING FRACTIONS
// =============================================================================

/// Soft ceiling in Normal mode, as a fraction of the absolute per-cycle ceiling
pub const DEFAULT_BURST_FRACTION: f64 = 0.9;

/// Soft ceiling in Safe/Emergency mode, as a fraction of the sustained ceiling
pub const DEFAULT_CONSERVATIVE_FRACTION: f64 = 0.8;

/// Hard ceiling in every mode, as a fraction of the absolute per-cycle ceiling
pub const DEFAULT_HARD_FRACTION: f64 = 0.95;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Store key under which the kernel snapshot blob is written
pub const DEFAULT_SNAPSHOT_KEY: &str = "kernel";
