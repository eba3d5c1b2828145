//! Error types for host and configuration operations.

use crate::types::{ParameterId, PropertyId};

/// Errors reported by an [`AudioUnitHost`](crate::AudioUnitHost).
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// No parameter with this id.
    ParameterNotFound(ParameterId),
    /// No property with this id.
    PropertyNotFound(PropertyId),
    /// A property payload had an unexpected byte size.
    InvalidSize { expected: usize, actual: usize },
    /// A property payload could not be decoded.
    InvalidData(String),
    /// A value was rejected (out of range or not finite).
    InvalidValue { id: ParameterId, value: f32 },
    /// The parameter is read-only.
    NotWritable(ParameterId),
    /// The parameter is write-only.
    NotReadable(ParameterId),
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParameterNotFound(id) => write!(f, "parameter {id} not found"),
            Self::PropertyNotFound(id) => write!(f, "property {id} not found"),
            Self::InvalidSize { expected, actual } => {
                write!(f, "invalid property size: expected {expected} bytes, got {actual}")
            }
            Self::InvalidData(msg) => write!(f, "invalid property data: {msg}"),
            Self::InvalidValue { id, value } => {
                write!(f, "value {value} rejected by parameter {id}")
            }
            Self::NotWritable(id) => write!(f, "parameter {id} is read-only"),
            Self::NotReadable(id) => write!(f, "parameter {id} is write-only"),
        }
    }
}

impl std::error::Error for HostError {}

/// Result type for host operations.
pub type Result<T> = std::result::Result<T, HostError>;

/// Errors from loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    Parse(serde_json::Error),
    /// A field holds a value the listener cannot work with.
    Invalid(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}
