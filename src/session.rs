use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::light::LightDevice;
use crate::pattern::BlinkPattern;
use crate::scheduler::{BlinkScheduler, SchedulerHandle};

/// Owns the one blink scheduler of the application and answers "is a strobe running?".
pub struct SessionManager<D: LightDevice, C = SystemClock> {
    scheduler: BlinkScheduler<D>,
    clock: C,
    pattern: BlinkPattern,
    on_duration: Duration,
}

impl<D: LightDevice> SessionManager<D> {
    pub fn new(pattern: BlinkPattern, on_duration: Duration) -> Self {
        SessionManager::with_clock(SystemClock, pattern, on_duration)
    }
}

impl<D: LightDevice, C: Clock + Clone> SessionManager<D, C> {
    pub fn with_clock(clock: C, pattern: BlinkPattern, on_duration: Duration) -> Self {
        SessionManager {
            scheduler: BlinkScheduler::new(),
            clock,
            pattern,
            on_duration,
        }
    }

    /// The running session, if any.
    pub fn current_session(&self) -> Option<SchedulerHandle> {
        self.scheduler.handle().filter(SchedulerHandle::is_running)
    }

    pub fn start(&mut self, device: D) -> Result<()> {
        self.scheduler.start_with_clock(
            device,
            self.clock.clone(),
            self.pattern.clone(),
            self.on_duration,
        )
    }

    pub fn stop(&mut self) -> Option<D> {
        self.scheduler.stop()
    }
}
