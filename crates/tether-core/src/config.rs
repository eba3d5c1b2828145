//! Bridge configuration.
//!
//! Configuration can be declared statically with the const builders or loaded
//! from JSON.
//!
//! # Example
//!
//! ```ignore
//! use tether_core::{BridgeConfig, ListenerConfig};
//!
//! pub static CONFIG: BridgeConfig = BridgeConfig::new()
//!     .with_listener(ListenerConfig::new().with_granularity(0.02))
//!     .with_max_parameters(64);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Scope;

// =========================================================================
// ListenerConfig
// =========================================================================

/// Timing of the event listener, in seconds.
///
/// `granularity` bounds which notifications are merged: within one window of
/// this length at most one delivery is made per watched property.
/// `delivery_interval` is the period of the flush timer and bounds when
/// merged notifications are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub delivery_interval: f64,
    pub granularity: f64,
}

impl ListenerConfig {
    pub const DEFAULT_DELIVERY_INTERVAL: f64 = 0.05;
    pub const DEFAULT_GRANULARITY: f64 = 0.05;

    pub const fn new() -> Self {
        Self {
            delivery_interval: Self::DEFAULT_DELIVERY_INTERVAL,
            granularity: Self::DEFAULT_GRANULARITY,
        }
    }

    pub const fn with_delivery_interval(mut self, seconds: f64) -> Self {
        self.delivery_interval = seconds;
        self
    }

    pub const fn with_granularity(mut self, seconds: f64) -> Self {
        self.granularity = seconds;
        self
    }

    /// Check that the timer can be created from these values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.delivery_interval.is_finite() || self.delivery_interval <= 0.0 {
            return Err(ConfigError::Invalid("delivery_interval must be a positive number of seconds"));
        }
        if !self.granularity.is_finite() || self.granularity < 0.0 {
            return Err(ConfigError::Invalid("granularity must be a non-negative number of seconds"));
        }
        Ok(())
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// BridgeConfig
// =========================================================================

/// Configuration of the scripting bridge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub listener: ListenerConfig,
    /// Scope whose parameters are exposed to scripts.
    pub parameter_scope: Scope,
    /// Capacity of the parameter dispatch table.
    pub max_parameters: usize,
    /// Capacity of the property dispatch table.
    pub max_properties: usize,
}

impl BridgeConfig {
    pub const DEFAULT_MAX_PARAMETERS: usize = 256;
    pub const DEFAULT_MAX_PROPERTIES: usize = 64;

    pub const fn new() -> Self {
        Self {
            listener: ListenerConfig::new(),
            parameter_scope: Scope::Global,
            max_parameters: Self::DEFAULT_MAX_PARAMETERS,
            max_properties: Self::DEFAULT_MAX_PROPERTIES,
        }
    }

    pub const fn with_listener(mut self, listener: ListenerConfig) -> Self {
        self.listener = listener;
        self
    }

    pub const fn with_parameter_scope(mut self, scope: Scope) -> Self {
        self.parameter_scope = scope;
        self
    }

    pub const fn with_max_parameters(mut self, max: usize) -> Self {
        self.max_parameters = max;
        self
    }

    pub const fn with_max_properties(mut self, max: usize) -> Self {
        self.max_properties = max;
        self
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listener.validate()?;
        if self.max_parameters == 0 {
            return Err(ConfigError::Invalid("max_parameters must be at least 1"));
        }
        if self.max_properties == 0 {
            return Err(ConfigError::Invalid("max_properties must be at least 1"));
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(BridgeConfig::default().validate().is_ok());
        assert_eq!(BridgeConfig::default(), BridgeConfig::new());
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config =
            BridgeConfig::from_json(r#"{ "listener": { "granularity": 0.01 }, "max_properties": 8 }"#)
                .unwrap();
        assert_eq!(config.listener.granularity, 0.01);
        assert_eq!(
            config.listener.delivery_interval,
            ListenerConfig::DEFAULT_DELIVERY_INTERVAL
        );
        assert_eq!(config.max_properties, 8);
        assert_eq!(config.max_parameters, BridgeConfig::DEFAULT_MAX_PARAMETERS);
        assert_eq!(config.parameter_scope, Scope::Global);
    }

    #[test]
    fn test_from_json_scope_names() {
        let config = BridgeConfig::from_json(r#"{ "parameter_scope": "output" }"#).unwrap();
        assert_eq!(config.parameter_scope, Scope::Output);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            BridgeConfig::from_json(r#"{ "listener": { "delivery_interval": 0 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BridgeConfig::from_json(r#"{ "listener": { "granularity": -1 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            BridgeConfig::from_json(r#"{ "max_parameters": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(BridgeConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_granularity_is_allowed() {
        assert!(ListenerConfig::new().with_granularity(0.0).validate().is_ok());
    }
}
