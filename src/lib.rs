pub mod clock;
pub mod config;
mod error;
pub mod host;
pub mod http;
pub mod light;
pub mod pattern;
pub mod scheduler;
pub mod session;
mod state;

pub use error::{ConfigError, DeviceError, Error, Result};
pub use state::SessionState;

#[macro_export]
macro_rules! term_on_err {
    ($expr:expr, $term:expr) => {
        match $expr {
            std::result::Result::Ok(val) => val,
            std::result::Result::Err(err) => {
                eprintln!("setting term due to error: {}", err);
                $term.store(true, std::sync::atomic::Ordering::SeqCst);
                break;
            }
        }
    };
}
