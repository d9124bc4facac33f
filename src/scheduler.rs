use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock, Wake};
use crate::error::{DeviceError, Error, Result};
use crate::light::LightDevice;
use crate::pattern::BlinkPattern;
use crate::state::{AtomicSessionState, SessionState};

const WORKER_NAME: &str = "blink";

/// A cheap, cloneable view of one blink session.
///
/// Safe to use from any thread. A handle only ever reports on and stops the session it
/// was taken from. [`SchedulerHandle::request_stop`] only signals the worker;
/// use [`BlinkScheduler::stop`] to wait for it and get the device back.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    state: AtomicSessionState,
    flashes: Arc<AtomicU64>,
    started_at: Instant,
    cancel: Sender<()>,
}

impl SchedulerHandle {
    pub fn state(&self) -> SessionState {
        self.state.get_state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Number of flashes attempted in this session.
    pub fn flashes(&self) -> u64 {
        self.flashes.load(Ordering::SeqCst)
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn request_stop(&self) {
        if self.state.stopping() {
            // The worker may already be gone, in which case there's nobody to tell
            let _ = self.cancel.send(());
        }
    }
}

struct Session<D> {
    handle: SchedulerHandle,
    worker: JoinHandle<D>,
}

pub struct BlinkScheduler<D: LightDevice> {
    session: Option<Session<D>>,
}

impl<D: LightDevice> BlinkScheduler<D> {
    pub fn new() -> Self {
        BlinkScheduler { session: None }
    }

    /// State of the most recent session; `Idle` once it has been stopped.
    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(|session| session.handle.state())
            .unwrap_or(SessionState::Idle)
    }

    /// Handle to the current session, if one has been started and not yet reaped.
    pub fn handle(&self) -> Option<SchedulerHandle> {
        self.session.as_ref().map(|session| session.handle.clone())
    }

    pub fn start(&mut self, device: D, pattern: BlinkPattern, on_duration: Duration) -> Result<()> {
        self.start_with_clock(device, SystemClock, pattern, on_duration)
    }

    pub fn start_with_clock<C: Clock>(
        &mut self,
        device: D,
        clock: C,
        pattern: BlinkPattern,
        on_duration: Duration,
    ) -> Result<()> {
        if self.state() == SessionState::Running {
            return Err(Error::AlreadyRunning);
        }
        // A session that was asked to stop, or wound down on its own, still needs joining
        self.stop();

        let state = AtomicSessionState::new(SessionState::Running);
        let (cancel_tx, cancel_rx) = mpsc::channel();
        let handle = SchedulerHandle {
            state: state.clone(),
            flashes: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
            cancel: cancel_tx,
        };
        let worker = Worker {
            device,
            clock,
            pattern,
            on_duration,
            cancel: cancel_rx,
            state,
            flashes: Arc::clone(&handle.flashes),
        };

        info!(
            "starting blink session: on for {}ms, gaps {}, period {}ms",
            on_duration.as_millis(),
            worker.pattern,
            worker.pattern.period(on_duration).as_millis()
        );
        match thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || worker.run())
        {
            Ok(worker) => {
                self.session = Some(Session { handle, worker });
                Ok(())
            }
            Err(err) => Err(Error::Spawn(err)),
        }
    }

    /// Stop the current session, wait for the worker and return the device.
    ///
    /// Returns `None` without touching any device if no session was started.
    pub fn stop(&mut self) -> Option<D> {
        let session = self.session.take()?;
        session.handle.request_stop();
        let device = match session.worker.join() {
            Ok(device) => Some(device),
            Err(_) => {
                error!("blink worker panicked");
                None
            }
        };
        session.handle.state.idle();
        info!("blink session stopped after {} flashes", session.handle.flashes());
        device
    }
}

impl<D: LightDevice> Default for BlinkScheduler<D> {
    fn default() -> Self {
        BlinkScheduler::new()
    }
}

impl<D: LightDevice> Drop for BlinkScheduler<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker<D, C> {
    device: D,
    clock: C,
    pattern: BlinkPattern,
    on_duration: Duration,
    cancel: Receiver<()>,
    state: AtomicSessionState,
    flashes: Arc<AtomicU64>,
}

impl<D: LightDevice, C: Clock> Worker<D, C> {
    fn run(mut self) -> D {
        let mut counter: u64 = 0;
        loop {
            if self.state.get_state() != SessionState::Running {
                break;
            }

            tolerate("on", self.device.turn_on());
            self.flashes.fetch_add(1, Ordering::SeqCst);
            debug!("flashing for {}ms", self.on_duration.as_millis());
            if self.clock.sleep(self.on_duration, &self.cancel) == Wake::Cancelled {
                // Never leave the light lit
                tolerate("off", self.device.turn_off());
                break;
            }
            tolerate("off", self.device.turn_off());

            let gap = self.pattern.gap(counter);
            debug!("sleeping for {}ms", gap.as_millis());
            if self.clock.sleep(gap, &self.cancel) == Wake::Cancelled {
                break;
            }
            counter = counter.wrapping_add(1);
            debug!("counter = {}", counter);
        }
        self.state.idle();
        debug!("blink worker exiting");
        self.device
    }
}

fn tolerate(switch: &str, result: std::result::Result<(), DeviceError>) {
    match result {
        Ok(()) => {}
        Err(err @ DeviceError::UnsupportedMode(_)) => warn!("turning light {}: {}", switch, err),
        Err(err @ DeviceError::Unavailable) => debug!("turning light {}: {}", switch, err),
    }
}
