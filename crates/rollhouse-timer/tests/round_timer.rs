//! Integration tests for the round timer.
//!
//! Uses paused Tokio time so the five-second delays resolve instantly and
//! deterministically.

use std::time::Duration;

use rollhouse_timer::RoundTimer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Roll,
    Advance,
}

const ROLL_DELAY: Duration = Duration::from_secs(5);

// =========================================================================
// Firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_scheduled_continuation_fires_after_delay() {
    let mut timer = RoundTimer::new();
    let start = tokio::time::Instant::now();
    timer.schedule(Step::Roll, ROLL_DELAY);

    let fired = timer.wait().await;
    assert_eq!(fired.kind, Step::Roll);
    assert_eq!(fired.seq, 1);
    assert!(start.elapsed() >= ROLL_DELAY);
    assert!(!timer.is_pending(), "slot should be empty after firing");
    assert_eq!(timer.metrics().fired, 1);
}

#[tokio::test(start_paused = true)]
async fn test_does_not_fire_early() {
    let mut timer = RoundTimer::new();
    timer.schedule(Step::Roll, ROLL_DELAY);

    let result = tokio::time::timeout(Duration::from_millis(4_999), timer.wait()).await;
    assert!(result.is_err(), "should still be waiting");
    assert_eq!(timer.pending(), Some(&Step::Roll), "timeout must not consume the slot");
}

#[tokio::test(start_paused = true)]
async fn test_empty_timer_pends_forever() {
    let mut timer = RoundTimer::<Step>::new();
    let result = tokio::time::timeout(Duration::from_secs(60), timer.wait()).await;
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_remaining_counts_down() {
    let mut timer = RoundTimer::new();
    timer.schedule(Step::Roll, ROLL_DELAY);
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(timer.remaining(), Some(Duration::from_secs(3)));
}

// =========================================================================
// Cancellation / replacement
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_prevents_firing() {
    let mut timer = RoundTimer::new();
    timer.schedule(Step::Roll, ROLL_DELAY);
    assert_eq!(timer.cancel(), Some(Step::Roll));

    let result = tokio::time::timeout(Duration::from_secs(30), timer.wait()).await;
    assert!(result.is_err(), "cancelled continuation must never fire");
    assert_eq!(timer.metrics().cancelled, 1);
    assert_eq!(timer.metrics().fired, 0);
}

#[tokio::test(start_paused = true)]
async fn test_schedule_replaces_pending_continuation() {
    let mut timer = RoundTimer::new();
    timer.schedule(Step::Roll, ROLL_DELAY);
    timer.schedule(Step::Advance, Duration::from_secs(1));

    let fired = timer.wait().await;
    assert_eq!(fired.kind, Step::Advance);
    assert_eq!(fired.seq, 2);

    // The replaced roll is gone for good.
    let result = tokio::time::timeout(Duration::from_secs(30), timer.wait()).await;
    assert!(result.is_err());

    let m = timer.metrics();
    assert_eq!(m.scheduled, 2);
    assert_eq!(m.cancelled, 1);
    assert_eq!(m.fired, 1);
}

#[tokio::test(start_paused = true)]
async fn test_rescheduling_later_pushes_deadline_out() {
    let mut timer = RoundTimer::new();
    timer.schedule(Step::Roll, Duration::from_secs(1));
    timer.schedule(Step::Roll, ROLL_DELAY);

    let start = tokio::time::Instant::now();
    timer.wait().await;
    assert!(start.elapsed() >= ROLL_DELAY);
}

// =========================================================================
// select! loop pattern (mirrors the room actor)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_with_cancel_command() {
    let mut timer = RoundTimer::new();
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(4);

    timer.schedule(Step::Roll, ROLL_DELAY);

    tokio::spawn(async move {
        // Two rolls fire (t=5s, t=10s), then a cancel lands before the third.
        tokio::time::sleep(Duration::from_secs(12)).await;
        tx.send("cancel").await.ok();
        tokio::time::sleep(Duration::from_secs(20)).await;
        tx.send("stop").await.ok();
    });

    let mut rolls = 0;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => match cmd {
                "cancel" => { timer.cancel(); }
                _ => break,
            },
            fired = timer.wait() => {
                assert_eq!(fired.kind, Step::Roll);
                rolls += 1;
                timer.schedule(Step::Roll, ROLL_DELAY);
            }
        }
    }

    assert_eq!(rolls, 2);
    assert!(!timer.is_pending());
}
