/*!
 * Scheduling Tests
 * Priority ordering, mode gating and exactly-once execution per cycle
 */

use super::common::{Behaviour, EventRecorder, Harness};
use cycle_kernel::{OperatingMode, Priority};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

#[test]
fn test_levels_run_ascending_in_admission_order() {
    let mut h = Harness::new();
    h.admit("c", 3, Behaviour::Done);
    h.admit("a1", 0, Behaviour::Done);
    h.admit("b", 2, Behaviour::Done);
    h.admit("a2", 0, Behaviour::Done);
    h.admit("x", 1, Behaviour::Done);

    let report = h.tick();
    assert_eq!(h.take_log(), vec!["a1", "a2", "x", "b", "c"]);
    assert_eq!(report.executed_count(), 5);
    assert_eq!(report.mode, OperatingMode::Normal);
    assert!(report.stop.is_none());
}

#[test]
fn test_emergency_runs_only_critical_priority() {
    let mut h = Harness::with_reserve(50.0);
    h.admit("critical", 0, Behaviour::Done);
    h.admit("economy", 2, Behaviour::Done);

    let report = h.tick();
    assert_eq!(h.take_log(), vec!["critical"]);
    assert_eq!(report.mode, OperatingMode::Emergency);
    assert_eq!(report.skipped.get(&2), Some(&1));
    assert!(h.kernel.is_panic_active());
}

#[test]
fn test_safe_mode_respects_threshold() {
    let mut h = Harness::with_reserve(500.0);
    h.admit("p3", 3, Behaviour::Done);
    h.admit("p4", 4, Behaviour::Done);
    h.admit("p9", 9, Behaviour::Done);

    let report = h.tick();
    assert_eq!(h.take_log(), vec!["p3"]);
    assert_eq!(report.mode, OperatingMode::Safe);
    assert_eq!(report.skipped_count(), 2);
    assert!(!h.kernel.is_panic_active());
}

#[test]
fn test_reserve_recovery_clears_panic() {
    let mut h = Harness::with_reserve(10.0);
    h.admit("critical", 0, Behaviour::Done);
    h.admit("economy", 5, Behaviour::Done);

    h.tick();
    assert!(h.kernel.is_panic_active());

    h.clock.set_reserve(5_000.0);
    let report = h.tick();
    assert!(!h.kernel.is_panic_active());
    assert_eq!(report.mode, OperatingMode::Normal);
    assert_eq!(h.kernel.mode(), Some(OperatingMode::Normal));
    assert_eq!(h.take_log(), vec!["critical", "critical", "economy"]);
}

#[test]
fn test_emergency_signal_fires_once_per_episode() {
    let recorder = EventRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());

    tracing::subscriber::with_default(subscriber, || {
        let mut h = Harness::with_reserve(50.0);
        h.admit("critical", 0, Behaviour::Done);
        h.admit("economy", 2, Behaviour::Done);

        for _ in 0..3 {
            let report = h.tick();
            assert_eq!(report.mode, OperatingMode::Emergency);
            assert!(h.kernel.is_panic_active());
        }
        assert_eq!(recorder.count(Level::ERROR, "Reserve depleted"), 1);
        assert_eq!(h.take_log(), vec!["critical", "critical", "critical"]);

        h.clock.set_reserve(5_000.0);
        h.tick();
        h.tick();
        assert!(!h.kernel.is_panic_active());
        assert_eq!(recorder.count(Level::WARN, "Reserve recovered"), 1);

        // A fresh episode signals again, still only once
        h.clock.set_reserve(20.0);
        h.tick();
        h.tick();
        assert!(h.kernel.is_panic_active());
        assert_eq!(recorder.count(Level::ERROR, "Reserve depleted"), 2);
        assert_eq!(recorder.count(Level::WARN, "Reserve recovered"), 1);
    });
}

#[test]
fn test_reprioritized_process_runs_once() {
    let mut h = Harness::new();
    let mover = h.admit("mover", 1, Behaviour::Reprioritize(9));
    h.admit("tail", 9, Behaviour::Done);

    h.tick();
    assert_eq!(h.take_log(), vec!["mover", "tail"]);
    assert_eq!(h.kernel.find_by_id(mover).unwrap().header().priority(), 9);
    assert_eq!(h.kernel.table().bucket(9).to_vec(), vec![2, mover]);
    assert!(h.kernel.table().bucket(1).is_empty());

    // Admission order within the new level puts it behind `tail`
    h.tick();
    assert_eq!(h.take_log(), vec!["tail", "mover"]);
}

#[test]
fn test_reprioritized_into_new_level_still_runs_once() {
    let mut h = Harness::new();
    let mover = h.admit("mover", 1, Behaviour::Reprioritize(7));
    h.admit("tail", 3, Behaviour::Done);

    h.tick();
    assert_eq!(h.take_log(), vec!["mover", "tail"]);
    assert_eq!(h.kernel.table().bucket(7).to_vec(), vec![mover]);

    h.tick();
    assert_eq!(h.take_log(), vec!["tail", "mover"]);
}

#[test]
fn test_spawned_child_gets_parent_and_runs() {
    let mut h = Harness::new();
    let parent = h.admit("colony", 1, Behaviour::Spawn(4));

    h.tick();
    // Level 4 did not exist when the walk started; the child still runs
    assert_eq!(h.take_log(), vec!["colony", "colony-child"]);
    let child = h
        .kernel
        .find_by_stable_key("colony-child")
        .expect("child admitted")
        .header()
        .id();
    assert_eq!(h.kernel.children_of(parent), vec![child]);
    assert_eq!(h.kernel.find_by_id(child).unwrap().header().parent(), Some(parent));

    h.tick();
    assert_eq!(h.take_log(), vec!["colony", "colony-child"]);
    // Stable key lookup keeps the spawn idempotent
    assert_eq!(h.kernel.len(), 2);
}

#[test]
fn test_spawn_timing_depends_only_on_relative_priority() {
    let mut h = Harness::new();
    h.admit("anchor", 5, Behaviour::Done);
    h.admit("colony", 3, Behaviour::Spawn(5));
    h.admit("outpost", 3, Behaviour::Spawn(8));
    h.admit("late", 4, Behaviour::Spawn(2));

    h.tick();
    // Existing and brand-new later levels both pick up their child this
    // cycle; a child below the spawner's level waits for the next one
    assert_eq!(
        h.take_log(),
        vec!["colony", "outpost", "late", "anchor", "colony-child", "outpost-child"]
    );

    h.tick();
    assert_eq!(
        h.take_log(),
        vec![
            "late-child",
            "colony",
            "outpost",
            "late",
            "anchor",
            "colony-child",
            "outpost-child"
        ]
    );
    assert_eq!(h.kernel.len(), 7);
}

#[test]
fn test_terminated_process_swept_at_end_of_cycle() {
    let mut h = Harness::new();
    let quitter = h.admit("quitter", 0, Behaviour::Terminate);
    h.admit("other", 1, Behaviour::Done);

    let report = h.tick();
    assert_eq!(report.swept, 1);
    assert!(h.kernel.find_by_id(quitter).is_none());
    assert_eq!(h.kernel.len(), 1);
}

proptest! {
    #[test]
    fn prop_execution_follows_priority_then_admission(priorities in prop::collection::vec(0u8..6, 1..24)) {
        let mut h = Harness::new();
        for (i, priority) in priorities.iter().enumerate() {
            h.admit(&format!("p{}", i), *priority as Priority, Behaviour::Done);
        }

        h.tick();

        let mut expected: Vec<(u8, usize)> = priorities.iter().copied().zip(0..).collect();
        expected.sort();
        let expected: Vec<String> = expected.into_iter().map(|(_, i)| format!("p{}", i)).collect();
        prop_assert_eq!(h.take_log(), expected);
    }
}
