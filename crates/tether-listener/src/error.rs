//! Error types for listener operations.

use tether_core::{ConfigError, HostError};

/// Errors that can occur while creating or using an event listener.
#[derive(Debug)]
pub enum ListenerError {
    /// The listener timing cannot produce a working flush timer.
    InvalidConfig(ConfigError),
    /// A timer interval rounded down to zero ticks.
    ZeroInterval,
    /// The host refused a raw callback registration.
    Host(HostError),
    /// The listener has already been disposed.
    Disposed,
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(e) => write!(f, "listener config rejected: {e}"),
            Self::ZeroInterval => write!(f, "timer interval is shorter than one clock tick"),
            Self::Host(e) => write!(f, "host registration failed: {e}"),
            Self::Disposed => write!(f, "listener already disposed"),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfig(e) => Some(e),
            Self::Host(e) => Some(e),
            Self::ZeroInterval | Self::Disposed => None,
        }
    }
}

impl From<ConfigError> for ListenerError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfig(e)
    }
}

impl From<HostError> for ListenerError {
    fn from(e: HostError) -> Self {
        Self::Host(e)
    }
}

/// Result type for listener operations.
pub type Result<T> = std::result::Result<T, ListenerError>;
