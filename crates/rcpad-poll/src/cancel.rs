use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

/// Cooperative shutdown signal.
///
/// Cloning shares the same signal. Child tokens are cancelled together with
/// their parent but can also be cancelled on their own, which lets one
/// component shut down its worker without stopping everything else.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

/// Interrupts sleepers on a token without cancelling it.
#[derive(Clone, Debug)]
pub struct Waker {
    inner: Weak<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<State>,
    changed: Condvar,
}

#[derive(Debug, Default)]
struct State {
    cancelled: bool,
    wakeups: u64,
    children: Vec<Weak<Inner>>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(&self) {
        let children = {
            let mut state = self.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            std::mem::take(&mut state.children)
        };
        self.changed.notify_all();

        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }

    fn wake(&self) {
        self.lock().wakeups += 1;
        self.changed.notify_all();
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal shutdown to every holder of this token and its children.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    /// A token that is cancelled when this one is.
    pub fn child_token(&self) -> CancellationToken {
        let child = CancellationToken::new();
        let mut state = self.inner.lock();
        if state.cancelled {
            child.inner.lock().cancelled = true;
        } else {
            state.children.retain(|c| c.strong_count() > 0);
            state.children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    /// Handle that can cut a [`wait_timeout`](Self::wait_timeout) short.
    pub fn waker(&self) -> Waker {
        Waker {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Count of wake-ups so far. Pass it to
    /// [`wait_timeout_since`](Self::wait_timeout_since) to also catch wake-ups
    /// that land before the wait begins.
    pub fn wake_epoch(&self) -> u64 {
        self.inner.lock().wakeups
    }

    /// Block for up to `timeout`, returning early on cancellation or wake-up.
    ///
    /// Returns `true` if the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let epoch = self.wake_epoch();
        self.wait_timeout_since(timeout, epoch)
    }

    /// Like [`wait_timeout`](Self::wait_timeout), but returns at once if any
    /// wake-up happened after `epoch` was taken.
    pub fn wait_timeout_since(&self, timeout: Duration, epoch: u64) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.lock();

        while !state.cancelled && state.wakeups == epoch {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            state = self
                .inner
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        state.cancelled
    }
}

impl Waker {
    /// Wake anything blocked in `wait_timeout` on the originating token.
    pub fn wake(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.wake();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn cancel_is_visible_to_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn parent_cancels_children() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        let grandchild = child.child_token();

        parent.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn child_cancel_leaves_parent_running() {
        let parent = CancellationToken::new();
        let child = parent.child_token();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn child_of_cancelled_token_starts_cancelled() {
        let parent = CancellationToken::new();
        parent.cancel();
        assert!(parent.child_token().is_cancelled());
    }

    #[test]
    fn wait_timeout_expires() {
        let token = CancellationToken::new();
        let start = Instant::now();
        assert!(!token.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn cancel_interrupts_wait() {
        let token = CancellationToken::new();
        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let start = Instant::now();
        assert!(token.wait_timeout(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        canceller.join().unwrap();
    }

    #[test]
    fn waker_interrupts_wait_without_cancelling() {
        let token = CancellationToken::new();
        let waker = token.waker();
        let ringer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            waker.wake();
        });

        let start = Instant::now();
        assert!(!token.wait_timeout(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(!token.is_cancelled());
        ringer.join().unwrap();
    }

    #[test]
    fn wake_before_wait_is_not_lost() {
        let token = CancellationToken::new();
        let epoch = token.wake_epoch();
        token.waker().wake();

        let start = Instant::now();
        assert!(!token.wait_timeout_since(Duration::from_secs(10), epoch));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(token.wake_epoch(), epoch + 1);
    }
}
