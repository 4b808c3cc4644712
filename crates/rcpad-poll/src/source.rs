/// A subsystem driven by the [`Scheduler`](crate::Scheduler).
///
/// `process` must not block. It returns the number of milliseconds until the
/// source next needs attention; `0` means it made progress and wants to be
/// called again straight away.
pub trait PollSource {
    /// Short name used in logs.
    fn name(&self) -> &str {
        "source"
    }

    /// Do any due work at monotonic time `now_ms`.
    fn process(&mut self, now_ms: u64) -> u64;

    /// Release resources. Called once, after the scheduler loop exits.
    fn stop(&mut self) {}
}

impl<S: PollSource + ?Sized> PollSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn process(&mut self, now_ms: u64) -> u64 {
        (**self).process(now_ms)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}
