use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::cancel::CancellationToken;

/// Time source and sleep primitive for the scheduler.
pub trait Clock {
    /// Monotonic milliseconds.
    fn now_ms(&self) -> u64;

    /// Sleep for up to `ms`, returning early if `token` is cancelled or has
    /// been woken since wake epoch `since`.
    fn sleep_ms(&self, ms: u64, token: &CancellationToken, since: u64);
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    fn sleep_ms(&self, ms: u64, token: &CancellationToken, since: u64) {
        (**self).sleep_ms(ms, token, since)
    }
}

/// Wall-clock implementation backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn sleep_ms(&self, ms: u64, token: &CancellationToken, since: u64) {
        token.wait_timeout_since(Duration::from_millis(ms), since);
    }
}

/// Deterministic clock: sleeping advances time instantly and is recorded.
#[derive(Debug, Default)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    now: u64,
    sleeps: Vec<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: start_ms,
                sleeps: Vec::new(),
            }),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, ms: u64) {
        self.lock().now += ms;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<u64> {
        self.lock().sleeps.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.lock().now
    }

    fn sleep_ms(&self, ms: u64, _token: &CancellationToken, _since: u64) {
        let mut state = self.lock();
        state.sleeps.push(ms);
        state.now += ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.now_ms() >= a + 5);
    }

    #[test]
    fn system_sleep_returns_on_cancel() {
        let clock = SystemClock::new();
        let token = CancellationToken::new();
        token.cancel();

        let start = Instant::now();
        clock.sleep_ms(10_000, &token, token.wake_epoch());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn manual_clock_records_sleeps() {
        let clock = ManualClock::new(100);
        let token = CancellationToken::new();
        clock.sleep_ms(10, &token, 0);
        clock.advance(5);
        clock.sleep_ms(30, &token, 0);

        assert_eq!(clock.now_ms(), 145);
        assert_eq!(clock.sleeps(), vec![10, 30]);
    }
}
