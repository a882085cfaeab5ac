//! Adaptive per-session request pacing.
//!
//! [`RateLimiter`] keeps a single `current_delay` clamped to
//! `[base_delay, max_delay]`. Successful fetches relax it multiplicatively;
//! errors grow it (doubling for HTTP 429, ×1.5 otherwise) and pay an
//! immediate penalty sleep. State lives behind a mutex that is never held
//! across an `.await`, so one limiter can be shared by concurrent tasks:
//! each caller of [`RateLimiter::wait`] reserves the next start slot.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use listscout_core::MAX_DELAY_SECS;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;

/// Multiplier applied to the delay after a successful request.
const SUCCESS_DECAY: f64 = 0.9;
/// Multiplier applied after an HTTP 429.
const RATE_LIMIT_GROWTH: f64 = 2.0;
/// Multiplier applied after any other failure.
const ERROR_GROWTH: f64 = 1.5;
/// Bounds of the random jitter added to the error penalty sleep, in seconds.
const PENALTY_JITTER_SECS: (f64, f64) = (0.1, 0.5);

/// Failure classes reported to the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// HTTP 429 Too Many Requests.
    RateLimit,
    /// Any other non-200 status.
    Http,
    /// Timeout, connection reset, DNS failure and similar.
    Transport,
}

/// Mutable pacing state owned by a [`RateLimiter`].
#[derive(Debug)]
struct RateState {
    current_delay: f64,
    consecutive_errors: u32,
    last_request: Option<Instant>,
    rng: StdRng,
}

#[derive(Debug)]
pub struct RateLimiter {
    base_delay: f64,
    max_delay: f64,
    state: Mutex<RateState>,
}

impl RateLimiter {
    /// Creates a limiter starting at `base_delay`. A `max_delay` below
    /// `base_delay` is raised to it, and both are capped at one day.
    #[must_use]
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self::with_rng(base_delay, max_delay, StdRng::from_os_rng())
    }

    /// Like [`RateLimiter::new`] with a deterministic jitter source.
    #[must_use]
    pub fn with_seed(base_delay: Duration, max_delay: Duration, seed: u64) -> Self {
        Self::with_rng(base_delay, max_delay, StdRng::seed_from_u64(seed))
    }

    fn with_rng(base_delay: Duration, max_delay: Duration, rng: StdRng) -> Self {
        let base_delay = base_delay.as_secs_f64().min(MAX_DELAY_SECS);
        let max_delay = max_delay.as_secs_f64().clamp(base_delay, MAX_DELAY_SECS);
        Self {
            base_delay,
            max_delay,
            state: Mutex::new(RateState {
                current_delay: base_delay,
                consecutive_errors: 0,
                last_request: None,
                rng,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn max_delay(&self) -> f64 {
        self.max_delay
    }

    /// Current adaptive delay in seconds.
    #[must_use]
    pub fn current_delay(&self) -> f64 {
        self.lock().current_delay
    }

    #[must_use]
    pub fn consecutive_errors(&self) -> u32 {
        self.lock().consecutive_errors
    }

    /// Suspends until `current_delay` has elapsed since the previous request
    /// start, then records the new start.
    ///
    /// The first call never waits.
    pub async fn wait(&self) {
        let sleep_for = self.reserve_slot(Instant::now());
        if !sleep_for.is_zero() {
            tracing::debug!(
                delay_ms = u64::try_from(sleep_for.as_millis()).unwrap_or(u64::MAX),
                "pacing request"
            );
            tokio::time::sleep(sleep_for).await;
        }
    }

    /// Claims the next request start at or after `now` and returns how long
    /// the caller must sleep to reach it.
    fn reserve_slot(&self, now: Instant) -> Duration {
        let mut state = self.lock();
        let delay = Duration::from_secs_f64(state.current_delay);
        let start = match state.last_request {
            Some(last) => (last + delay).max(now),
            None => now,
        };
        state.last_request = Some(start);
        start.saturating_duration_since(now)
    }

    /// Relaxes the delay after a successful request.
    pub fn on_success(&self) {
        let mut state = self.lock();
        state.consecutive_errors = 0;
        state.current_delay = (state.current_delay * SUCCESS_DECAY).max(self.base_delay);
    }

    /// Grows the delay for `kind` and sleeps the resulting penalty.
    pub async fn on_error(&self, kind: ErrorKind) {
        let penalty = self.record_error(kind);
        tracing::debug!(
            ?kind,
            penalty_ms = u64::try_from(penalty.as_millis()).unwrap_or(u64::MAX),
            "backing off after request error"
        );
        tokio::time::sleep(penalty).await;
    }

    /// Bookkeeping half of [`RateLimiter::on_error`]: updates the delay and
    /// returns the penalty sleep (`current_delay` plus 0.1–0.5 s jitter)
    /// without sleeping.
    #[must_use]
    pub fn record_error(&self, kind: ErrorKind) -> Duration {
        let mut state = self.lock();
        state.consecutive_errors = state.consecutive_errors.saturating_add(1);
        let growth = match kind {
            ErrorKind::RateLimit => RATE_LIMIT_GROWTH,
            ErrorKind::Http | ErrorKind::Transport => ERROR_GROWTH,
        };
        state.current_delay = (state.current_delay * growth).min(self.max_delay);
        let jitter = state
            .rng
            .random_range(PENALTY_JITTER_SECS.0..PENALTY_JITTER_SECS.1);
        Duration::from_secs_f64(state.current_delay + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(base: f64, max: f64) -> RateLimiter {
        RateLimiter::with_seed(
            Duration::from_secs_f64(base),
            Duration::from_secs_f64(max),
            7,
        )
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn starts_at_base_delay() {
        let l = limiter(1.0, 10.0);
        assert!(approx_eq(l.current_delay(), 1.0));
        assert_eq!(l.consecutive_errors(), 0);
    }

    #[test]
    fn max_below_base_is_raised_to_base() {
        let l = limiter(3.0, 1.0);
        assert!(approx_eq(l.max_delay(), 3.0));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_doubles_then_success_decays() {
        let l = limiter(1.0, 10.0);
        l.on_error(ErrorKind::RateLimit).await;
        assert!(approx_eq(l.current_delay(), 2.0));
        assert_eq!(l.consecutive_errors(), 1);

        l.on_success();
        assert!(approx_eq(l.current_delay(), 1.8));
        assert_eq!(l.consecutive_errors(), 0);
    }

    #[test]
    fn generic_error_grows_by_half() {
        let l = limiter(2.0, 10.0);
        let _ = l.record_error(ErrorKind::Http);
        assert!(approx_eq(l.current_delay(), 3.0));
        let _ = l.record_error(ErrorKind::Transport);
        assert!(approx_eq(l.current_delay(), 4.5));
    }

    #[test]
    fn growth_is_capped_at_max_delay() {
        let l = limiter(4.0, 5.0);
        let _ = l.record_error(ErrorKind::RateLimit);
        assert!(approx_eq(l.current_delay(), 5.0));
        let _ = l.record_error(ErrorKind::RateLimit);
        assert!(approx_eq(l.current_delay(), 5.0));
    }

    #[test]
    fn success_never_drops_below_base() {
        let l = limiter(1.0, 10.0);
        l.on_success();
        l.on_success();
        assert!(approx_eq(l.current_delay(), 1.0));
    }

    #[test]
    fn oversized_delays_are_capped_at_one_day() {
        let l = RateLimiter::with_seed(Duration::from_secs(1), Duration::MAX, 7);
        assert!(approx_eq(l.max_delay(), MAX_DELAY_SECS));
        for _ in 0..64 {
            let _ = l.record_error(ErrorKind::RateLimit);
        }
        assert!(approx_eq(l.current_delay(), MAX_DELAY_SECS));
        let now = Instant::now();
        let _ = l.reserve_slot(now);
        assert_eq!(
            l.reserve_slot(now),
            Duration::from_secs_f64(MAX_DELAY_SECS)
        );

        let huge_base = RateLimiter::with_seed(Duration::MAX, Duration::MAX, 7);
        assert!(approx_eq(huge_base.current_delay(), MAX_DELAY_SECS));
    }

    #[test]
    fn penalty_is_delay_plus_bounded_jitter() {
        let l = limiter(1.0, 10.0);
        let penalty = l.record_error(ErrorKind::Http).as_secs_f64();
        assert!(penalty >= 1.5 + 0.1 - 1e-9, "penalty too small: {penalty}");
        assert!(penalty <= 1.5 + 0.5 + 1e-9, "penalty too large: {penalty}");
    }

    #[tokio::test(start_paused = true)]
    async fn on_error_sleeps_the_penalty() {
        let l = limiter(1.0, 10.0);
        let before = Instant::now();
        l.on_error(ErrorKind::RateLimit).await;
        let slept = before.elapsed().as_secs_f64();
        assert!((2.1..=2.51).contains(&slept), "slept {slept}s");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_spaces_requests_by_current_delay() {
        let l = limiter(2.0, 10.0);
        let start = Instant::now();
        l.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        l.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_does_not_sleep_when_delay_already_elapsed() {
        let l = limiter(1.0, 10.0);
        l.wait().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        let before = Instant::now();
        l.wait().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[test]
    fn concurrent_reservations_get_successive_slots() {
        let l = limiter(1.0, 10.0);
        let now = Instant::now();
        assert_eq!(l.reserve_slot(now), Duration::ZERO);
        assert_eq!(l.reserve_slot(now), Duration::from_secs(1));
        assert_eq!(l.reserve_slot(now), Duration::from_secs(2));
    }
}
