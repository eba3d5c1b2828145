//! Traits implemented by the host audio component.
//!
//! [`AudioUnitHost`] is the command direction (scripts read and write
//! parameters and properties). [`EventSource`] is the notification direction:
//! the host invokes a [`RawEventCallback`] on whatever thread the change
//! happened on, possibly the real-time render thread.

use std::sync::Arc;

use crate::error::Result;
use crate::parameter_info::ParameterInfo;
use crate::types::{AuEvent, ComponentId, Element, ParameterId, PropertyId, Scope};

/// Raw change callback.
///
/// Receives only the identifying record, never the new value. Implementations
/// must return quickly and must not block.
pub type RawEventCallback = Arc<dyn Fn(&AuEvent) + Send + Sync>;

/// Handle for one raw callback registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub u64);

/// Parameter and property access on a host audio component.
pub trait AudioUnitHost: Send + Sync {
    /// Identity used in every [`AuEvent`] this host emits.
    fn component(&self) -> ComponentId;

    /// Parameter ids in `scope`, in host order.
    fn parameter_ids(&self, scope: Scope) -> Result<Vec<ParameterId>>;

    fn parameter_info(&self, id: ParameterId) -> Result<ParameterInfo>;

    fn parameter_value(&self, id: ParameterId) -> Result<f32>;

    fn set_parameter_value(&self, id: ParameterId, value: f32) -> Result<()>;

    fn begin_parameter_gesture(&self, id: ParameterId) -> Result<()>;

    fn end_parameter_gesture(&self, id: ParameterId) -> Result<()>;

    /// Current byte size of a property's value.
    fn property_size(&self, id: PropertyId, scope: Scope, element: Element) -> Result<usize>;

    /// Raw bytes of a property's value, in host byte order.
    fn property_data(&self, id: PropertyId, scope: Scope, element: Element) -> Result<Vec<u8>>;
}

/// Registration point for raw change callbacks.
pub trait EventSource: Send + Sync {
    /// Invoke `callback` whenever an event equal to `event` fires.
    fn add_listener(&self, event: AuEvent, callback: RawEventCallback) -> Result<RegistrationId>;

    /// Remove a registration. Unknown ids are ignored.
    ///
    /// After this returns the callback is not invoked again.
    fn remove_listener(&self, registration: RegistrationId);
}
