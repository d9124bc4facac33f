use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// Why a wait ended.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Wake {
    Elapsed,
    Cancelled,
}

pub trait Clock: Send + 'static {
    /// Wait for `duration` unless a message (or hang-up) arrives on `cancel` first.
    fn sleep(&mut self, duration: Duration, cancel: &Receiver<()>) -> Wake;
}

/// Wall clock. Cancellation interrupts a wait immediately.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&mut self, duration: Duration, cancel: &Receiver<()>) -> Wake {
        match cancel.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => Wake::Elapsed,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Wake::Cancelled,
        }
    }
}

/// A clock that advances a shared millisecond counter instead of blocking.
///
/// Clones share the same timeline, so a test can hand one clone to the scheduler and read
/// [`VirtualClock::now`] from another. With a horizon set, any wait that would run past it
/// reports [`Wake::Cancelled`] and the session winds down on its own.
#[derive(Clone, Debug, Default)]
pub struct VirtualClock {
    now_ms: Arc<AtomicU64>,
    horizon: Option<Duration>,
}

impl VirtualClock {
    pub fn new() -> Self {
        VirtualClock::default()
    }

    pub fn with_horizon(horizon: Duration) -> Self {
        VirtualClock {
            now_ms: Arc::new(AtomicU64::new(0)),
            horizon: Some(horizon),
        }
    }

    pub fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms.load(Ordering::SeqCst))
    }
}

impl Clock for VirtualClock {
    fn sleep(&mut self, duration: Duration, cancel: &Receiver<()>) -> Wake {
        match cancel.try_recv() {
            Err(TryRecvError::Empty) => {}
            Ok(()) | Err(TryRecvError::Disconnected) => return Wake::Cancelled,
        }

        let wake_at = self.now() + duration;
        if matches!(self.horizon, Some(horizon) if wake_at > horizon) {
            return Wake::Cancelled;
        }
        self.now_ms
            .store(wake_at.as_millis() as u64, Ordering::SeqCst);
        Wake::Elapsed
    }
}
