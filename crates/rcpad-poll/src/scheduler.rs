use tracing::{debug, info, trace};

use crate::cancel::CancellationToken;
use crate::clock::{Clock, SystemClock};
use crate::source::PollSource;

/// Delay used when no source is registered.
pub const DEFAULT_IDLE_DELAY_MS: u64 = 1000;

/// Single-threaded loop over a fixed set of [`PollSource`]s.
///
/// Each tick calls every source once and sleeps for the smallest delay they
/// return. A zero delay skips the sleep entirely. The loop exits when the
/// token is cancelled, then stops every source in registration order.
pub struct Scheduler<C: Clock = SystemClock> {
    sources: Vec<Box<dyn PollSource>>,
    clock: C,
    token: CancellationToken,
    idle_delay_ms: u64,
}

impl Scheduler<SystemClock> {
    /// Scheduler driven by the system clock.
    pub fn new(token: CancellationToken) -> Self {
        Self::with_clock(SystemClock::new(), token)
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(clock: C, token: CancellationToken) -> Self {
        Self {
            sources: Vec::new(),
            clock,
            token,
            idle_delay_ms: DEFAULT_IDLE_DELAY_MS,
        }
    }

    /// Register a source. Sources are polled and stopped in registration order.
    pub fn register(&mut self, source: impl PollSource + 'static) -> &mut Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Override the sleep used when nothing is registered.
    pub fn with_idle_delay(mut self, ms: u64) -> Self {
        self.idle_delay_ms = ms;
        self
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Poll every source once and return the delay until the next tick is due.
    pub fn tick(&mut self) -> u64 {
        let now = self.clock.now_ms();
        let mut next = None::<u64>;

        for source in &mut self.sources {
            let delay = source.process(now);
            trace!(source = source.name(), delay, "polled");
            next = Some(next.map_or(delay, |d| d.min(delay)));
        }

        next.unwrap_or(self.idle_delay_ms)
    }

    /// Run until the token is cancelled. Returns the number of ticks executed.
    pub fn run(&mut self) -> u64 {
        info!(sources = self.sources.len(), "scheduler started");
        let mut ticks = 0u64;

        while !self.token.is_cancelled() {
            // Taken before the tick so input arriving mid-tick cuts the sleep short.
            let epoch = self.token.wake_epoch();
            let delay = self.tick();
            ticks += 1;
            if delay > 0 && !self.token.is_cancelled() {
                self.clock.sleep_ms(delay, &self.token, epoch);
            }
        }

        self.stop();
        info!(ticks, "scheduler stopped");
        ticks
    }

    fn stop(&mut self) {
        for source in &mut self.sources {
            debug!(source = source.name(), "stopping source");
            source.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::clock::ManualClock;

    struct Fixed {
        name: &'static str,
        delay: u64,
        calls: usize,
        cancel_after: Option<(usize, CancellationToken)>,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Fixed {
        fn new(name: &'static str, delay: u64, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                delay,
                calls: 0,
                cancel_after: None,
                log: Arc::clone(log),
            }
        }

        fn cancelling(mut self, calls: usize, token: &CancellationToken) -> Self {
            self.cancel_after = Some((calls, token.clone()));
            self
        }
    }

    impl PollSource for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn process(&mut self, now_ms: u64) -> u64 {
            self.calls += 1;
            self.log
                .lock()
                .unwrap()
                .push(format!("{}@{}", self.name, now_ms));
            if let Some((limit, token)) = &self.cancel_after {
                if self.calls >= *limit {
                    token.cancel();
                }
            }
            self.delay
        }

        fn stop(&mut self) {
            self.log.lock().unwrap().push(format!("stop:{}", self.name));
        }
    }

    #[test]
    fn sleeps_for_shortest_delay() {
        let token = CancellationToken::new();
        let clock = Arc::new(ManualClock::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut scheduler = Scheduler::with_clock(Arc::clone(&clock), token.clone());
        scheduler
            .register(Fixed::new("fast", 10, &log))
            .register(Fixed::new("slow", 30, &log).cancelling(3, &token));

        let ticks = scheduler.run();
        assert_eq!(ticks, 3);
        assert_eq!(clock.sleeps(), vec![10, 10]);
        assert!(clock.sleeps().iter().all(|&ms| ms <= 10));
    }

    #[test]
    fn zero_delay_repolls_without_sleeping() {
        let token = CancellationToken::new();
        let clock = Arc::new(ManualClock::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut scheduler = Scheduler::with_clock(Arc::clone(&clock), token.clone());
        scheduler
            .register(Fixed::new("busy", 0, &log))
            .register(Fixed::new("idle", 50, &log).cancelling(4, &token));

        scheduler.run();
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn passes_current_time_to_sources() {
        let token = CancellationToken::new();
        let clock = Arc::new(ManualClock::new(1_000));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut scheduler = Scheduler::with_clock(Arc::clone(&clock), token.clone());
        scheduler.register(Fixed::new("a", 25, &log).cancelling(3, &token));
        scheduler.run();

        let log = log.lock().unwrap();
        assert_eq!(log[..3], ["a@1000", "a@1025", "a@1050"]);
    }

    #[test]
    fn stops_sources_in_registration_order() {
        let token = CancellationToken::new();
        let clock = Arc::new(ManualClock::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut scheduler = Scheduler::with_clock(Arc::clone(&clock), token.clone());
        scheduler
            .register(Fixed::new("first", 5, &log))
            .register(Fixed::new("second", 5, &log))
            .register(Fixed::new("third", 5, &log).cancelling(1, &token));
        scheduler.run();

        let log = log.lock().unwrap();
        let stops: Vec<_> = log.iter().filter(|l| l.starts_with("stop:")).collect();
        assert_eq!(stops, ["stop:first", "stop:second", "stop:third"]);
    }

    #[test]
    fn cancelled_before_start_only_stops() {
        let token = CancellationToken::new();
        token.cancel();
        let clock = Arc::new(ManualClock::new(0));
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut scheduler = Scheduler::with_clock(Arc::clone(&clock), token);
        scheduler.register(Fixed::new("only", 5, &log));

        assert_eq!(scheduler.run(), 0);
        assert_eq!(*log.lock().unwrap(), ["stop:only"]);
    }

    #[test]
    fn empty_scheduler_uses_idle_delay() {
        let token = CancellationToken::new();
        let mut scheduler =
            Scheduler::with_clock(ManualClock::new(0), token).with_idle_delay(250);
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.tick(), 250);
    }

    #[test]
    fn system_clock_run_exits_on_cancel() {
        let token = CancellationToken::new();
        let remote = token.clone();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut scheduler = Scheduler::new(token);
        scheduler.register(Fixed::new("slow", 60_000, &log));

        let canceller = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            remote.cancel();
        });

        let start = std::time::Instant::now();
        scheduler.run();
        assert!(start.elapsed() < std::time::Duration::from_secs(5));
        canceller.join().unwrap();
    }

    /// Wakes the scheduler's token from inside `process`, then asks for a long sleep.
    struct WakesDuringTick {
        token: CancellationToken,
        calls: usize,
    }

    impl PollSource for WakesDuringTick {
        fn process(&mut self, _now_ms: u64) -> u64 {
            self.calls += 1;
            if self.calls == 1 {
                self.token.waker().wake();
            } else {
                self.token.cancel();
            }
            60_000
        }
    }

    #[test]
    fn wake_during_tick_skips_the_sleep() {
        let token = CancellationToken::new();
        let mut scheduler = Scheduler::new(token.clone());
        scheduler.register(WakesDuringTick {
            token: token.clone(),
            calls: 0,
        });

        let start = std::time::Instant::now();
        assert_eq!(scheduler.run(), 2);
        assert!(start.elapsed() < std::time::Duration::from_secs(5));
    }
}
