/*!
 * Budget Tests
 * Soft and hard compute ceilings across operating modes
 */

use super::common::Harness;
use cycle_kernel::{ClockProvider, CycleStop, ProcessStatus};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// Harness clock: per-cycle ceiling 100, sustained 20.
// Normal: soft 90, hard 95. Safe/Emergency: soft 16, hard 95.

#[test]
fn test_soft_ceiling_ends_cycle_between_processes() {
    let mut h = Harness::new();
    h.admit_costly("a", 0, 46.0);
    h.admit_costly("b", 1, 46.0);
    let late = h.admit_costly("c", 2, 46.0);

    let report = h.tick();
    assert_eq!(h.take_log(), vec!["a", "b"]);
    assert_eq!(
        report.stop,
        Some(CycleStop::Soft {
            used: 92.0,
            ceiling: 90.0
        })
    );

    // The process that was not reached is untouched
    let header = h.kernel.find_by_id(late).unwrap().header();
    assert_eq!(header.status(), ProcessStatus::Alive);
    assert_eq!(header.last_cycle(), None);
}

#[test]
fn test_hard_ceiling_reported_first() {
    let mut h = Harness::new();
    h.admit_costly("a", 0, 50.0);
    h.admit_costly("b", 0, 50.0);
    h.admit_costly("c", 0, 50.0);

    let report = h.tick();
    assert_eq!(h.take_log(), vec!["a", "b"]);
    assert_eq!(
        report.stop,
        Some(CycleStop::Hard {
            used: 100.0,
            ceiling: 95.0
        })
    );
}

#[test]
fn test_exhausted_budget_runs_nothing() {
    let mut h = Harness::new();
    h.admit_costly("a", 0, 1.0);

    h.clock.set_used(96.0);
    let report = h.kernel.run_cycle().clone();
    assert!(h.take_log().is_empty());
    assert_eq!(report.executed_count(), 0);
    assert!(matches!(report.stop, Some(CycleStop::Hard { .. })));
}

#[test]
fn test_safe_mode_uses_conservative_ceiling() {
    let mut h = Harness::with_reserve(500.0);
    h.admit_costly("a", 0, 10.0);
    h.admit_costly("b", 1, 10.0);
    h.admit_costly("c", 2, 10.0);

    let report = h.tick();
    assert_eq!(report.ceilings.soft, 16.0);
    assert_eq!(report.ceilings.hard, 95.0);
    assert_eq!(h.take_log(), vec!["a", "b"]);
    assert!(matches!(report.stop, Some(CycleStop::Soft { .. })));
}

#[test]
fn test_compute_accounted_per_process_and_type() {
    let mut h = Harness::new();
    let pid = h.admit_costly("a", 0, 7.5);

    let report = h.tick();
    assert_eq!(report.compute_by_type.get("scripted"), Some(&7.5));
    assert_eq!(report.compute_total(), 7.5);

    h.tick();
    let header = h.kernel.find_by_id(pid).unwrap().header();
    assert_eq!(header.compute_used(), 15.0);
    assert_eq!(header.runs(), 2);
    assert_eq!(header.last_cycle(), Some(1));
    assert_eq!(h.clock.cycle(), 2);
}

proptest! {
    #[test]
    fn prop_execution_stops_at_first_ceiling_crossing(costs in prop::collection::vec(1u32..40, 1..16)) {
        let mut h = Harness::new();
        for (i, cost) in costs.iter().enumerate() {
            h.admit_costly(&format!("p{}", i), 0, f64::from(*cost));
        }

        let report = h.tick();
        let ran = h.take_log().len();
        let soft = report.ceilings.soft;

        // Every executed process started below the soft ceiling
        let before_last: f64 = costs[..ran - 1].iter().map(|&c| f64::from(c)).sum();
        prop_assert!(before_last < soft);

        if ran < costs.len() {
            let spent: f64 = costs[..ran].iter().map(|&c| f64::from(c)).sum();
            prop_assert!(spent >= soft);
            prop_assert!(report.stop.is_some());
        } else {
            prop_assert!(report.stop.is_none());
        }
    }
}
