/*!
 * Sleep/Wake Tests
 * Wake map resolution, admin lifecycle calls and overdue wakes
 */

use super::common::{Behaviour, Harness};
use cycle_kernel::{KernelError, ProcessStatus};
use pretty_assertions::assert_eq;

#[test]
fn test_sleep_and_wake_round_trip() {
    let mut h = Harness::new();
    let pid = h.admit("napper", 1, Behaviour::Sleep(3));

    // Cycle 0: runs, then sleeps until cycle 3
    h.tick();
    assert_eq!(h.take_log(), vec!["napper"]);
    let header = h.kernel.find_by_id(pid).unwrap().header();
    assert_eq!(header.status(), ProcessStatus::Sleeping);
    assert_eq!(header.wake_cycle(), Some(3));
    assert_eq!(h.kernel.wake_map().pending_at(3), &[pid]);

    for _ in 1..3 {
        let report = h.tick();
        assert_eq!(report.sleeping, 1);
        assert_eq!(report.executed_count(), 0);
    }
    assert!(h.take_log().is_empty());

    // Cycle 3: woken and executed in the same cycle
    let report = h.tick();
    assert_eq!(report.woken, 1);
    assert_eq!(h.take_log(), vec!["napper"]);
    assert_eq!(
        h.kernel.find_by_id(pid).unwrap().header().wake_cycle(),
        Some(6)
    );
}

#[test]
fn test_crowded_wake_cycle_stays_single_registration() {
    let mut h = Harness::new();
    for i in 0..200 {
        h.admit(&format!("napper{}", i), (i % 4) as u8, Behaviour::Sleep(4));
    }

    h.tick();
    assert_eq!(h.kernel.wake_map().pending_at(4).len(), 200);

    // Each walk re-registers every sleeper; the map must not grow
    for _ in 1..4 {
        let report = h.tick();
        assert_eq!(report.sleeping, 200);
        assert_eq!(h.kernel.wake_map().len(), 200);
    }
    h.take_log();

    let report = h.tick();
    assert_eq!(report.woken, 200);
    assert_eq!(h.take_log().len(), 200);
    assert_eq!(h.kernel.wake_map().pending_at(8).len(), 200);
    assert_eq!(h.kernel.wake_map().len(), 200);
}

#[test]
fn test_sleep_zero_wakes_next_cycle() {
    let mut h = Harness::new();
    h.admit("blink", 0, Behaviour::Sleep(0));

    h.tick();
    h.tick();
    assert_eq!(h.take_log(), vec!["blink", "blink"]);
}

#[test]
fn test_skipped_cycles_wake_overdue_process() {
    let mut h = Harness::new();
    let pid = h.admit("napper", 1, Behaviour::Sleep(3));
    h.tick();

    // The host was not invoked for cycles 1 through 9
    h.clock.set_cycle(10);
    let report = h.tick();
    assert_eq!(report.woken, 1);
    assert_eq!(h.take_log(), vec!["napper", "napper"]);
    assert_eq!(
        h.kernel.find_by_id(pid).unwrap().header().wake_cycle(),
        Some(13)
    );
}

#[test]
fn test_restored_past_wake_cycle_fires_next_cycle() {
    let mut h = Harness::new();
    let pid = h.admit("napper", 1, Behaviour::Sleep(5));
    h.tick();
    h.take_log();

    h.reset();
    assert_eq!(h.kernel.wake_map().next_wake(), Some(5));

    h.clock.set_cycle(40);
    let report = h.tick();
    assert_eq!(report.woken, 1);
    assert_eq!(h.take_log(), vec!["napper"]);
    assert_eq!(
        h.kernel.find_by_id(pid).unwrap().header().wake_cycle(),
        Some(45)
    );
}

#[test]
fn test_admin_sleep_and_wake() {
    let mut h = Harness::new();
    let pid = h.admit("worker", 0, Behaviour::Done);

    h.kernel.sleep(pid, 100).unwrap();
    h.tick();
    assert!(h.take_log().is_empty());

    h.kernel.wake(pid).unwrap();
    assert!(h.kernel.wake_map().is_empty());
    h.tick();
    assert_eq!(h.take_log(), vec!["worker"]);
}

#[test]
fn test_suspend_clears_pending_wake() {
    let mut h = Harness::new();
    let pid = h.admit("napper", 0, Behaviour::Sleep(2));
    h.tick();

    h.kernel.suspend(pid).unwrap();
    assert!(h.kernel.wake_map().is_empty());
    for _ in 0..4 {
        h.tick();
    }
    assert_eq!(h.take_log(), vec!["napper"]);
    assert_eq!(
        h.kernel.find_by_id(pid).unwrap().header().status(),
        ProcessStatus::Suspended
    );
}

#[test]
fn test_admin_calls_reject_unknown_pid() {
    let mut h = Harness::new();
    assert!(matches!(h.kernel.wake(42), Err(KernelError::ProcessNotFound(42))));
    assert!(matches!(h.kernel.suspend(42), Err(KernelError::ProcessNotFound(42))));
    assert!(matches!(h.kernel.sleep(42, 1), Err(KernelError::ProcessNotFound(42))));
    assert!(matches!(h.kernel.set_priority(42, 1), Err(KernelError::ProcessNotFound(42))));
    assert!(matches!(h.kernel.terminate(42), Err(KernelError::ProcessNotFound(42))));
}

#[test]
fn test_removed_sleeper_leaves_no_wake() {
    let mut h = Harness::new();
    let pid = h.admit("napper", 0, Behaviour::Sleep(2));
    h.tick();

    assert!(h.kernel.remove(pid));
    assert!(!h.kernel.remove(pid));
    assert!(h.kernel.wake_map().is_empty());
}
