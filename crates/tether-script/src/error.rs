//! Error types for bridge operations.

use tether_core::{ConfigError, HostError};
use tether_listener::ListenerError;

/// Errors that can occur while setting up or driving a [`ScriptBridge`].
///
/// [`ScriptBridge`]: crate::ScriptBridge
#[derive(Debug)]
pub enum BridgeError {
    /// The bridge configuration was rejected.
    Config(ConfigError),
    /// The event listener could not be created or refused a registration.
    Listener(ListenerError),
    /// The host failed while the script surface was being built.
    Host(HostError),
    /// A context is already active on this bridge.
    AlreadyActive,
    /// The context was released; the bridge takes no new context.
    Released,
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid bridge config: {e}"),
            Self::Listener(e) => write!(f, "event listener error: {e}"),
            Self::Host(e) => write!(f, "host error: {e}"),
            Self::AlreadyActive => write!(f, "a script context is already active"),
            Self::Released => write!(f, "script context already released"),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Listener(e) => Some(e),
            Self::Host(e) => Some(e),
            Self::AlreadyActive | Self::Released => None,
        }
    }
}

impl From<ConfigError> for BridgeError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ListenerError> for BridgeError {
    fn from(e: ListenerError) -> Self {
        Self::Listener(e)
    }
}

impl From<HostError> for BridgeError {
    fn from(e: HostError) -> Self {
        Self::Host(e)
    }
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
