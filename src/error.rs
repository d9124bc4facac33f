use std::io;

use thiserror::Error;

use crate::light::FlashMode;

/// Failures reported by a [`LightDevice`](crate::light::LightDevice).
///
/// These are never fatal: the blink worker logs them and carries on with the pattern.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    #[error("light device unavailable")]
    Unavailable,

    #[error("flash mode {0} not supported")]
    UnsupportedMode(FlashMode),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("blink session already running")]
    AlreadyRunning,

    #[error("blink pattern must contain at least one gap")]
    InvalidPattern,

    #[error("unable to spawn blink worker: {0}")]
    Spawn(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config: {0}")]
    Io(#[from] io::Error),

    #[error("config is not valid JSON: {0}")]
    Json(#[from] json::Error),

    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error(transparent)]
    Pattern(#[from] Error),
}

pub type Result<T> = std::result::Result<T, Error>;
