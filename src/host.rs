use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::light::{Color, LightDevice};
use crate::scheduler::SchedulerHandle;
use crate::session::SessionManager;

const ONE_SECOND: Duration = Duration::from_secs(1);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HostEvent {
    Foreground,
    Background,
    QuickLaunch,
    EulaAgreed,
    Paint(Color),
    Shutdown,
}

/// Acquires and releases the light device for each session.
pub trait DeviceProvider {
    type Device: LightDevice;

    /// `None` when there is no light at all to drive.
    fn acquire(&mut self) -> Option<Self::Device>;

    fn release(&mut self, device: Self::Device);
}

/// What the host looks like right now, for anyone outside the host loop.
#[derive(Clone, Debug)]
pub struct Status {
    pub foreground: bool,
    pub eula_agreed: bool,
    pub flash_available: bool,
    pub screen: Color,
    pub session: Option<SchedulerHandle>,
}

impl Default for Status {
    fn default() -> Self {
        Status {
            foreground: false,
            eula_agreed: false,
            flash_available: false,
            screen: Color::DARK,
            session: None,
        }
    }
}

pub struct WalkBright<P: DeviceProvider> {
    provider: P,
    sessions: SessionManager<P::Device>,
    status: Status,
    shared: Arc<RwLock<Status>>,
}

impl<P: DeviceProvider> WalkBright<P> {
    pub fn new(config: &Config, provider: P, shared: Arc<RwLock<Status>>) -> Self {
        let status = Status {
            eula_agreed: config.accept_eula,
            ..Status::default()
        };
        let mut host = WalkBright {
            provider,
            sessions: SessionManager::new(config.pattern.clone(), config.on_duration),
            status,
            shared,
        };
        host.publish();
        host
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn current_session(&self) -> Option<SchedulerHandle> {
        self.sessions.current_session()
    }

    pub fn on_foreground(&mut self) {
        debug!("foreground");
        self.status.foreground = true;
        self.start_light();
    }

    pub fn on_background(&mut self) {
        debug!("background");
        self.status.foreground = false;
        if let Some(device) = self.sessions.stop() {
            self.provider.release(device);
        }
        self.status.screen = Color::DARK;
        self.status.flash_available = false;
    }

    pub fn on_eula_agreed(&mut self) {
        info!("EULA agreed");
        self.status.eula_agreed = true;
        if self.status.foreground {
            self.start_light();
        }
    }

    /// Toggle the strobe: stop a running session, otherwise bring the strobe up.
    pub fn on_quick_launch(&mut self) {
        if self.sessions.current_session().is_some() {
            debug!("quick launch: strobe running, stopping it");
            self.on_background();
        } else {
            debug!("quick launch: no strobe, starting one");
            self.on_foreground();
        }
    }

    /// Apply one event. Returns false once the host should shut down.
    pub fn handle(&mut self, event: HostEvent) -> bool {
        match event {
            HostEvent::Foreground => self.on_foreground(),
            HostEvent::Background => self.on_background(),
            HostEvent::QuickLaunch => self.on_quick_launch(),
            HostEvent::EulaAgreed => self.on_eula_agreed(),
            HostEvent::Paint(color) => {
                // A paint may still be in flight after the session stopped
                if self.status.foreground {
                    self.status.screen = color;
                }
            }
            HostEvent::Shutdown => return false,
        }
        self.publish();
        true
    }

    /// Run the host loop until shutdown, `term` being set or every sender going away.
    pub fn run(&mut self, events: Receiver<HostEvent>, term: &AtomicBool) {
        while !term.load(Ordering::Relaxed) {
            match events.recv_timeout(ONE_SECOND) {
                Ok(event) => {
                    if !self.handle(event) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.on_background();
        self.publish();
        eprintln!("host loop exiting");
    }

    fn start_light(&mut self) {
        if !self.status.eula_agreed {
            debug!("EULA not agreed, leaving the light off");
            return;
        }
        if self.sessions.current_session().is_some() {
            debug!("strobe already running");
            return;
        }
        // A session stopped through its handle still holds its device
        if let Some(device) = self.sessions.stop() {
            self.provider.release(device);
        }
        let device = match self.provider.acquire() {
            Some(device) => device,
            None => {
                warn!("no light device available");
                return;
            }
        };
        self.status.flash_available = device.is_available();
        match self.sessions.start(device) {
            Ok(()) => {}
            Err(Error::AlreadyRunning) => debug!("strobe already running"),
            Err(err) => warn!("unable to start strobe: {}", err),
        }
    }

    fn publish(&mut self) {
        self.status.session = self.sessions.current_session();
        match self.shared.write() {
            Ok(mut shared) => *shared = self.status.clone(),
            Err(err) => warn!("unable to publish status: {}", err),
        }
    }
}
