use std::sync::Arc;

use devserve::{start_rate_reset, RateWindow, MAX_RATE_PER_SECOND};

#[test]
fn ceiling_is_enforced_without_decrement() {
    let rate = RateWindow::new();
    for _ in 0..MAX_RATE_PER_SECOND {
        assert!(rate.tick());
    }
    // Over the ceiling every further request is rejected; the counter keeps
    // climbing until the next reset.
    assert!(!rate.tick());
    assert!(!rate.tick());
    assert_eq!(rate.current(), MAX_RATE_PER_SECOND + 2);
}

#[test]
fn reset_zeroes_any_count() {
    let rate = RateWindow::new();
    for _ in 0..37 {
        rate.tick();
    }
    assert_eq!(rate.current(), 37);
    rate.reset();
    assert_eq!(rate.current(), 0);
    assert!(rate.tick());
}

#[test]
fn periodic_reset_job_clears_the_window() {
    let rate = Arc::new(RateWindow::new());
    for _ in 0..10 {
        rate.tick();
    }
    let handle = start_rate_reset(rate.clone());
    // One reset tick fires within a second; allow for scheduling slop.
    std::thread::sleep(std::time::Duration::from_millis(1500));
    assert_eq!(rate.current(), 0);
    handle.stop();
}
