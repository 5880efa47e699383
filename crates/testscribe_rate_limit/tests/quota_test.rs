//! Sliding window and limiter admission tests.

use chrono::TimeDelta;
use std::time::Duration;
use testscribe_core::{BudgetConfigBuilder, Clock, ManualClock};
use testscribe_rate_limit::{Admission, Capacity, QuotaWindow, RateLimiter, RateLimits};

#[test]
fn test_sixth_request_waits_until_oldest_expires() {
    let clock = ManualClock::default();
    let start = clock.now();
    let mut window = QuotaWindow::per_minute();

    for i in 0..5 {
        window.record(1, start + TimeDelta::seconds(i));
    }

    match window.capacity_available(Some(5), 1, start + TimeDelta::seconds(10)) {
        Capacity::Wait(wait) => assert_eq!(wait, Duration::from_secs(50)),
        other => panic!("expected a wait, got {other:?}"),
    }

    clock.advance(Duration::from_secs(60));
    assert_eq!(
        window.capacity_available(Some(5), 1, clock.now()),
        Capacity::Available
    );
}

#[test]
fn test_daily_window_is_terminal() {
    let clock = ManualClock::default();
    let mut window = QuotaWindow::per_day();
    window.record(1, clock.now());
    window.record(1, clock.now());

    assert_eq!(
        window.capacity_available(Some(2), 1, clock.now()),
        Capacity::Exhausted
    );
    assert_eq!(
        window.capacity_available(Some(2), 1, clock.now() + TimeDelta::hours(24)),
        Capacity::Available
    );
}

#[test]
fn test_limiter_takes_longest_dimension() {
    let clock = ManualClock::default();
    let start = clock.now();
    let mut limiter = RateLimiter::new(RateLimits::new(Some(2), Some(1_000), None));

    limiter.record_request(start);
    limiter.record_tokens(900, start);
    limiter.record_request(start + TimeDelta::seconds(30));

    // Requests free up at +60s; tokens also at +60s since the only entry is at start.
    let now = start + TimeDelta::seconds(40);
    assert_eq!(
        limiter.next_available_in(200, now),
        Admission::MinuteThrottled(Duration::from_secs(20))
    );

    // A small request only waits on the request window.
    assert_eq!(
        limiter.next_available_in(50, start + TimeDelta::seconds(61)),
        Admission::Granted
    );
}

#[test]
fn test_limiter_reports_daily_exhaustion() {
    let clock = ManualClock::default();
    let mut limiter = RateLimiter::new(RateLimits::new(None, None, Some(1)));
    assert_eq!(limiter.next_available_in(10, clock.now()), Admission::Granted);

    limiter.record_request(clock.now());
    assert_eq!(
        limiter.next_available_in(10, clock.now()),
        Admission::DailyExhausted
    );
    assert_eq!(Admission::DailyExhausted.wait(), None);
}

#[test]
fn test_reset_empties_every_window() {
    let clock = ManualClock::default();
    let mut limiter = RateLimiter::new(RateLimits::new(Some(5), Some(100), Some(5)));
    limiter.record_request(clock.now());
    limiter.record_tokens(40, clock.now());
    assert_eq!(limiter.usage(clock.now()), (1, 40, 1));

    limiter.reset();
    assert!(limiter.is_fresh());
    assert_eq!(limiter.usage(clock.now()), (0, 0, 0));
}

#[test]
fn test_unlimited_limits_always_grant() {
    let clock = ManualClock::default();
    let mut limiter = RateLimiter::new(RateLimits::unlimited());
    for _ in 0..1_000 {
        limiter.record_request(clock.now());
    }
    assert!(limiter.limits().is_unlimited());
    assert_eq!(limiter.next_available_in(1_000_000, clock.now()), Admission::Granted);
}

#[test]
fn test_budget_scales_limits_down() {
    let budget = BudgetConfigBuilder::default()
        .rpm_multiplier(0.5)
        .rpd_multiplier(0.1)
        .build();
    let scaled = RateLimits::new(Some(10), Some(1_000), Some(25)).with_budget(&budget);

    assert_eq!(*scaled.requests_per_minute(), Some(5));
    assert_eq!(*scaled.tokens_per_minute(), Some(1_000));
    assert_eq!(*scaled.requests_per_day(), Some(2));
}
