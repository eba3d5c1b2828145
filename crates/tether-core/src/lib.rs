//! Core types for the Tether AudioUnit to web view bridge.
//!
//! This crate holds the vocabulary shared by the listener and the scripting
//! bridge: event records, parameter and property metadata, the traits a host
//! audio component implements, and configuration.

pub mod config;
mod error;
pub mod host;
pub mod parameter_info;
pub mod property;
pub mod simulated;
pub mod types;

pub use config::{BridgeConfig, ListenerConfig};
pub use error::{ConfigError, HostError, Result};
pub use host::{AudioUnitHost, EventSource, RawEventCallback, RegistrationId};
pub use parameter_info::{ParameterFlags, ParameterInfo, ParameterUnit};
pub use property::{
    decode_descriptor_list, encode_descriptor_list, encode_f64, encode_f64_slice, encode_string,
    property_host_id, property_script_index, PropertyDescriptor, PropertyValueType,
    CUSTOM_PROPERTY_BASE, PROPERTY_DESCRIPTOR_SIZE, PROPERTY_LIST_ID,
};
pub use simulated::SimulatedUnit;
pub use types::{AuEvent, ComponentId, Element, EventKind, EventTarget, ParameterId, PropertyId, Scope};
