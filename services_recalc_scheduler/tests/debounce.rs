//! Scheduling scenarios driven by a virtual clock

use services_recalc_scheduler::{
    Duration, Instant, NotifyOutcome, RecalcScheduler, SchedulerEvent, SchedulerState,
};

/// Advances time in 1ms steps, running (and immediately completing) any
/// pass that becomes due; returns the instants at which passes started
fn run_until(scheduler: &mut RecalcScheduler, from: u64, to: u64) -> Vec<u64> {
    let mut started = Vec::new();
    for t in from..=to {
        let now = Instant::from_millis(t);
        if scheduler.poll(now) {
            started.push(t);
            scheduler.complete(now);
        }
    }
    started
}

#[test]
fn test_burst_produces_exactly_one_pass() {
    let mut scheduler = RecalcScheduler::new(Duration::from_millis(250));
    for t in [0, 40, 80, 120, 200] {
        scheduler.notify(Instant::from_millis(t), false);
    }
    let passes = run_until(&mut scheduler, 0, 1000);
    assert_eq!(passes, vec![450]);

    let stats = scheduler.stats();
    assert_eq!(stats.passes_started, 1);
    assert_eq!(stats.passes_completed, 1);
    assert_eq!(stats.coalesced, 4);
}

#[test]
fn test_separated_edits_produce_separate_passes() {
    let mut scheduler = RecalcScheduler::new(Duration::from_millis(100));
    scheduler.notify(Instant::from_millis(0), false);
    let first = run_until(&mut scheduler, 0, 300);
    scheduler.notify(Instant::from_millis(301), false);
    let second = run_until(&mut scheduler, 301, 600);
    assert_eq!(first, vec![100]);
    assert_eq!(second, vec![401]);
}

#[test]
fn test_marker_typed_mid_burst_runs_at_once() {
    let mut scheduler = RecalcScheduler::new(Duration::from_millis(250));
    scheduler.notify(Instant::from_millis(0), false);
    scheduler.notify(Instant::from_millis(30), true);
    let passes = run_until(&mut scheduler, 0, 1000);
    assert_eq!(passes, vec![30]);
}

#[test]
fn test_self_triggered_edits_do_not_loop() {
    let mut scheduler = RecalcScheduler::new(Duration::from_millis(250));
    scheduler.request_now(Instant::ZERO);
    assert!(scheduler.poll(Instant::ZERO));

    // Applying the pass output raises a change notification of its own
    assert_eq!(
        scheduler.notify(Instant::ZERO, false),
        NotifyOutcome::Dropped
    );
    scheduler.complete(Instant::ZERO);

    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert!(run_until(&mut scheduler, 0, 2000).is_empty());

    let notified: Vec<_> = scheduler
        .take_events()
        .into_iter()
        .filter(|e| matches!(e, SchedulerEvent::Notified { .. }))
        .collect();
    assert_eq!(notified.len(), 2);
}

#[test]
fn test_state_serializes() {
    let state = SchedulerState::Scheduled {
        deadline: Instant::from_millis(5),
    };
    let json = serde_json::to_string(&state).unwrap();
    let back: SchedulerState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, state);
}
