use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
}

impl From<u8> for SessionState {
    fn from(val: u8) -> Self {
        use SessionState::*;
        match val {
            0 => Idle,
            1 => Running,
            2 => Stopping,
            _ => unreachable!(),
        }
    }
}

/// Session state shared between a scheduler, its worker and any handles.
#[derive(Clone, Debug)]
pub struct AtomicSessionState {
    flag: Arc<AtomicU8>,
}

impl AtomicSessionState {
    pub fn new(state: SessionState) -> Self {
        AtomicSessionState {
            flag: Arc::new(AtomicU8::new(state as u8)),
        }
    }

    pub fn idle(&self) {
        self.set_state(SessionState::Idle)
    }

    /// Running -> Stopping. Returns false if nothing was running.
    pub fn stopping(&self) -> bool {
        self.transition(SessionState::Running, SessionState::Stopping)
    }

    #[inline]
    pub fn get_state(&self) -> SessionState {
        self.flag.load(Ordering::SeqCst).into()
    }

    pub fn set_state(&self, state: SessionState) {
        self.flag.store(state as u8, Ordering::SeqCst)
    }

    fn transition(&self, from: SessionState, to: SessionState) -> bool {
        self.flag
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("Idle"),
            SessionState::Running => f.write_str("Running"),
            SessionState::Stopping => f.write_str("Stopping"),
        }
    }
}
