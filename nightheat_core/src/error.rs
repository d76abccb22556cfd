use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ThermoError {
    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("device api error: {0}")]
    DeviceApi(String),
    #[error("device rejected request: {0}")]
    DeviceRejected(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("profile deadline exceeded after {0} ms")]
    DeadlineExceeded(u64),
}

impl ThermoError {
    /// Only external device-call failures are worth another attempt.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, ThermoError::DeviceApi(_))
    }
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing profile store")]
    MissingStore,
    #[error("missing credential refresher")]
    MissingAuth,
    #[error("missing bed device")]
    MissingDevice,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = std::result::Result<T, ThermoError>;
