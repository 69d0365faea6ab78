/*!
 * Clock Provider
 *
 * The kernel never meters compute itself. The host supplies a clock that
 * reports the current cycle, compute used so far this cycle, the two ceilings
 * and the reserve level. Readings are taken fresh at every check, so compute
 * spent by a process between two reads is visible to the scheduler.
 */

mod manual;

pub use manual::ManualClock;

use crate::core::types::{Compute, Cycle};

/// Host-provided compute meter, consulted every cycle
pub trait ClockProvider {
    /// Current cycle number (monotonic)
    fn cycle(&self) -> Cycle;

    /// Cumulative compute used so far this cycle
    fn used(&self) -> Compute;

    /// Absolute per-cycle compute ceiling (burst limit)
    fn cycle_ceiling(&self) -> Compute;

    /// Sustained-rate compute ceiling
    fn sustained_ceiling(&self) -> Compute;

    /// Current reserve level, compared against the configured watermarks
    fn reserve(&self) -> Compute;
}
