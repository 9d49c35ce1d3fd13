//! Scheduled polling through `OtaService::tick`.

use otaresolver::CycleOutcome;

use super::mocks::fixture;

#[test]
fn nothing_runs_before_the_first_interval() {
    let mut f = fixture("1.1.0", 10);

    assert_eq!(f.service.tick(0), None);
    assert_eq!(f.service.tick(59_999), None);
    assert!(f.service.http().requests().is_empty());
}

#[test]
fn one_cycle_per_interval() {
    let mut f = fixture("1.1.0", 10);

    assert_eq!(f.service.tick(60_000), Some(CycleOutcome::UpToDate));
    assert_eq!(f.service.tick(60_001), None);
    assert_eq!(f.service.tick(119_999), None);
    assert_eq!(f.service.tick(120_000), Some(CycleOutcome::UpToDate));
    assert_eq!(f.service.http().requests().len(), 2);
    assert_eq!(f.service.events().count("tick executed"), 2);
}

#[test]
fn late_tick_restarts_the_interval_from_when_it_fired() {
    let mut f = fixture("1.1.0", 10);

    assert!(f.service.tick(90_000).is_some());
    assert_eq!(f.service.scheduler().last_fire_ms(), 90_000);
    assert_eq!(f.service.tick(120_000), None);
    assert!(f.service.tick(150_000).is_some());
}

#[test]
fn interval_change_applies_to_the_next_tick() {
    let mut f = fixture("1.1.0", 10);
    f.service.set_check_interval_secs(5).set_check_interval_secs(10);

    assert_eq!(f.service.scheduler().interval_ms(), 10_000);
    assert_eq!(f.service.tick(9_999), None);
    assert!(f.service.tick(10_000).is_some());
}

#[test]
fn manual_check_leaves_the_schedule_alone() {
    let mut f = fixture("1.1.0", 10);

    assert_eq!(f.service.check_now(), CycleOutcome::UpToDate);
    assert_eq!(f.service.scheduler().last_fire_ms(), 0);
    assert!(f.service.tick(60_000).is_some());
}

#[test]
fn counter_wraparound_fires_once() {
    let mut f = fixture("1.1.0", 10);
    let before_wrap = u32::MAX - 20_000;

    assert!(f.service.tick(before_wrap).is_some());
    assert_eq!(f.service.tick(10_000), None);
    // 20_001 ms before the wrap plus 39_999 after.
    assert!(f.service.tick(39_999).is_some());
    assert_eq!(f.service.tick(40_000), None);
}

#[test]
fn scheduled_cycle_installs_an_update() {
    let mut f = fixture("1.0.0", 3000);

    assert_eq!(
        f.service.tick(60_000),
        Some(CycleOutcome::Applied { bytes: 3000 })
    );
    assert!(f.service.restart().requested());
    assert_eq!(f.service.current_version(), "1.1.0");
}
