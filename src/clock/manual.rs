/*!
 * Manual Clock
 * Host-driven clock for simulators and tests
 */

use super::ClockProvider;
use crate::core::types::{Compute, Cycle};
use parking_lot::RwLock;

#[derive(Debug, Clone, Copy)]
struct ClockState {
    cycle: Cycle,
    used: Compute,
    cycle_ceiling: Compute,
    sustained_ceiling: Compute,
    reserve: Compute,
}

/// Clock whose readings are set explicitly by the host
///
/// Processes that want to "spend" compute hold an `Arc<ManualClock>` and call
/// [`ManualClock::consume`]; the scheduler sees the new reading on its next
/// check.
#[derive(Debug)]
pub struct ManualClock {
    state: RwLock<ClockState>,
}

impl ManualClock {
    /// Create a clock at cycle 0 with a full reserve
    pub fn new(cycle_ceiling: Compute, sustained_ceiling: Compute) -> Self {
        Self {
            state: RwLock::new(ClockState {
                cycle: 0,
                used: 0.0,
                cycle_ceiling,
                sustained_ceiling,
                reserve: 10_000.0,
            }),
        }
    }

    #[must_use]
    pub fn with_reserve(self, reserve: Compute) -> Self {
        self.state.write().reserve = reserve;
        self
    }

    #[must_use]
    pub fn with_cycle(self, cycle: Cycle) -> Self {
        self.state.write().cycle = cycle;
        self
    }

    /// Move to the next cycle and reset compute used
    pub fn advance(&self) -> Cycle {
        let mut state = self.state.write();
        state.cycle += 1;
        state.used = 0.0;
        state.cycle
    }

    /// Jump to an arbitrary cycle and reset compute used
    pub fn set_cycle(&self, cycle: Cycle) {
        let mut state = self.state.write();
        state.cycle = cycle;
        state.used = 0.0;
    }

    /// Record compute spent this cycle
    pub fn consume(&self, amount: Compute) {
        self.state.write().used += amount;
    }

    pub fn set_used(&self, used: Compute) {
        self.state.write().used = used;
    }

    pub fn set_reserve(&self, reserve: Compute) {
        self.state.write().reserve = reserve;
    }
}

impl ClockProvider for ManualClock {
    fn cycle(&self) -> Cycle {
        self.state.read().cycle
    }

    fn used(&self) -> Compute {
        self.state.read().used
    }

    fn cycle_ceiling(&self) -> Compute {
        self.state.read().cycle_ceiling
    }

    fn sustained_ceiling(&self) -> Compute {
        self.state.read().sustained_ceiling
    }

    fn reserve(&self) -> Compute {
        self.state.read().reserve
    }
}
