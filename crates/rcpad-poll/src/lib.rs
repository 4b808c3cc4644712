//! Cooperative scheduling for intermittent, rate-limited I/O sources.
//!
//! Sources report how long they can be left alone; the [`Scheduler`] sleeps
//! for the shortest of those delays instead of ticking at a fixed rate. The
//! [`CancellationToken`] is the shutdown signal shared by the scheduler and
//! every background thread.

pub mod cancel;
pub mod clock;
pub mod scheduler;
pub mod source;

pub use cancel::{CancellationToken, Waker};
pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{Scheduler, DEFAULT_IDLE_DELAY_MS};
pub use source::PollSource;
