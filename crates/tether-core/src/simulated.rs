//! In-memory host component.
//!
//! [`SimulatedUnit`] implements [`AudioUnitHost`] and [`EventSource`] without
//! any platform audio stack. Every mutation fires the matching raw callbacks
//! on the calling thread, the way a real host notifies from whichever thread
//! performed the change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{HostError, Result};
use crate::host::{AudioUnitHost, EventSource, RawEventCallback, RegistrationId};
use crate::parameter_info::ParameterInfo;
use crate::property::{
    encode_descriptor_list, property_host_id, property_script_index, PropertyDescriptor,
    PropertyValueType, PROPERTY_LIST_ID,
};
use crate::types::{AuEvent, ComponentId, Element, EventKind, ParameterId, PropertyId, Scope};

struct SimParameter {
    info: ParameterInfo,
    value: f32,
}

struct SimProperty {
    descriptor: PropertyDescriptor,
    data: Vec<u8>,
}

#[derive(Default)]
struct SimState {
    parameters: Vec<SimParameter>,
    properties: Vec<SimProperty>,
}

struct Registration {
    id: RegistrationId,
    event: AuEvent,
    callback: RawEventCallback,
}

/// In-memory audio component with change notifications.
pub struct SimulatedUnit {
    component: ComponentId,
    state: Mutex<SimState>,
    registrations: Mutex<Vec<Registration>>,
    next_registration: AtomicU64,
}

/// Lock a mutex, recovering the data if a callback panicked while it was held.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimulatedUnit {
    pub fn new(component: ComponentId) -> Self {
        Self {
            component,
            state: Mutex::new(SimState::default()),
            registrations: Mutex::new(Vec::new()),
            next_registration: AtomicU64::new(1),
        }
    }

    /// Add a parameter initialised to its default value.
    pub fn add_parameter(&self, info: ParameterInfo) {
        let value = info.default;
        lock(&self.state).parameters.push(SimParameter { info, value });
    }

    /// Add a custom property and return its script index.
    ///
    /// Fires a property change for the list property.
    pub fn add_property(&self, value_type: PropertyValueType, name: &str, data: Vec<u8>) -> u32 {
        let index = {
            let mut state = lock(&self.state);
            state.properties.push(SimProperty {
                descriptor: PropertyDescriptor::new(value_type, name),
                data,
            });
            (state.properties.len() - 1) as u32
        };
        self.notify(AuEvent::property(self.component, PROPERTY_LIST_ID));
        index
    }

    /// Replace a custom property's bytes and fire its change notification.
    pub fn set_property_data(&self, index: u32, data: Vec<u8>) -> Result<()> {
        {
            let mut state = lock(&self.state);
            let property = state
                .properties
                .get_mut(index as usize)
                .ok_or(HostError::PropertyNotFound(property_host_id(index)))?;
            property.data = data;
        }
        self.notify(AuEvent::property(self.component, property_host_id(index)));
        Ok(())
    }

    /// Fire every raw callback registered for `event`.
    ///
    /// The registry lock is released before callbacks run, so callbacks may
    /// call back into the unit.
    pub fn notify(&self, event: AuEvent) {
        let callbacks: Vec<RawEventCallback> = lock(&self.registrations)
            .iter()
            .filter(|r| r.event == event)
            .map(|r| r.callback.clone())
            .collect();
        for callback in callbacks {
            callback(&event);
        }
    }

    /// Number of live raw callback registrations.
    pub fn listener_count(&self) -> usize {
        lock(&self.registrations).len()
    }

    fn parameter_event(&self, kind: EventKind, id: ParameterId) -> AuEvent {
        AuEvent::parameter(kind, self.component, id)
    }

    fn with_parameter<R>(&self, id: ParameterId, f: impl FnOnce(&mut SimParameter) -> Result<R>) -> Result<R> {
        let mut state = lock(&self.state);
        let parameter = state
            .parameters
            .iter_mut()
            .find(|p| p.info.id == id)
            .ok_or(HostError::ParameterNotFound(id))?;
        f(parameter)
    }

    fn property_bytes(&self, id: PropertyId, scope: Scope) -> Result<Vec<u8>> {
        if scope != Scope::Global {
            return Err(HostError::PropertyNotFound(id));
        }
        let state = lock(&self.state);
        if id == PROPERTY_LIST_ID {
            let descriptors: Vec<PropertyDescriptor> =
                state.properties.iter().map(|p| p.descriptor.clone()).collect();
            return Ok(encode_descriptor_list(&descriptors));
        }
        property_script_index(id)
            .and_then(|index| state.properties.get(index as usize))
            .map(|p| p.data.clone())
            .ok_or(HostError::PropertyNotFound(id))
    }
}

impl AudioUnitHost for SimulatedUnit {
    fn component(&self) -> ComponentId {
        self.component
    }

    fn parameter_ids(&self, scope: Scope) -> Result<Vec<ParameterId>> {
        if scope != Scope::Global {
            return Ok(Vec::new());
        }
        Ok(lock(&self.state).parameters.iter().map(|p| p.info.id).collect())
    }

    fn parameter_info(&self, id: ParameterId) -> Result<ParameterInfo> {
        self.with_parameter(id, |p| Ok(p.info.clone()))
    }

    fn parameter_value(&self, id: ParameterId) -> Result<f32> {
        self.with_parameter(id, |p| {
            if !p.info.flags.readable {
                return Err(HostError::NotReadable(id));
            }
            Ok(p.value)
        })
    }

    fn set_parameter_value(&self, id: ParameterId, value: f32) -> Result<()> {
        self.with_parameter(id, |p| {
            if !p.info.flags.writable {
                return Err(HostError::NotWritable(id));
            }
            if !value.is_finite() || !p.info.contains(value) {
                return Err(HostError::InvalidValue { id, value });
            }
            p.value = value;
            Ok(())
        })?;
        log::trace!("{}: parameter {id} = {value}", self.component);
        self.notify(self.parameter_event(EventKind::ParameterValueChange, id));
        Ok(())
    }

    fn begin_parameter_gesture(&self, id: ParameterId) -> Result<()> {
        self.with_parameter(id, |_| Ok(()))?;
        self.notify(self.parameter_event(EventKind::BeginParameterChangeGesture, id));
        Ok(())
    }

    fn end_parameter_gesture(&self, id: ParameterId) -> Result<()> {
        self.with_parameter(id, |_| Ok(()))?;
        self.notify(self.parameter_event(EventKind::EndParameterChangeGesture, id));
        Ok(())
    }

    fn property_size(&self, id: PropertyId, scope: Scope, _element: Element) -> Result<usize> {
        self.property_bytes(id, scope).map(|bytes| bytes.len())
    }

    fn property_data(&self, id: PropertyId, scope: Scope, _element: Element) -> Result<Vec<u8>> {
        self.property_bytes(id, scope)
    }
}

impl EventSource for SimulatedUnit {
    fn add_listener(&self, event: AuEvent, callback: RawEventCallback) -> Result<RegistrationId> {
        let id = RegistrationId(self.next_registration.fetch_add(1, Ordering::Relaxed));
        lock(&self.registrations).push(Registration { id, event, callback });
        Ok(id)
    }

    fn remove_listener(&self, registration: RegistrationId) {
        lock(&self.registrations).retain(|r| r.id != registration);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::parameter_info::ParameterFlags;
    use crate::property::{decode_descriptor_list, encode_f64, CUSTOM_PROPERTY_BASE};

    fn unit() -> SimulatedUnit {
        let unit = SimulatedUnit::new(ComponentId(1));
        unit.add_parameter(ParameterInfo::new(3, "Gain").with_default(0.25));
        unit
    }

    #[test]
    fn test_parameter_roundtrip_and_notification() {
        let unit = unit();
        let fired = Arc::new(AtomicU64::new(0));
        let counter = fired.clone();
        let event = AuEvent::parameter(EventKind::ParameterValueChange, ComponentId(1), 3);
        unit.add_listener(
            event,
            Arc::new(move |e: &AuEvent| {
                assert_eq!(e.id(), 3);
                counter.fetch_add(1, Ordering::Relaxed);
            }),
        )
        .unwrap();

        assert_eq!(unit.parameter_value(3).unwrap(), 0.25);
        unit.set_parameter_value(3, 0.75).unwrap();
        assert_eq!(unit.parameter_value(3).unwrap(), 0.75);
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_parameter_errors() {
        let unit = unit();
        assert_eq!(unit.parameter_value(9), Err(HostError::ParameterNotFound(9)));
        assert!(matches!(
            unit.set_parameter_value(3, 4.0),
            Err(HostError::InvalidValue { id: 3, .. })
        ));
        assert!(unit.set_parameter_value(3, f32::NAN).is_err());
    }

    #[test]
    fn test_access_flags_are_enforced() {
        let unit = unit();
        unit.add_parameter(ParameterInfo::new(5, "Meter").with_flags(ParameterFlags {
            readable: true,
            writable: false,
        }));
        unit.add_parameter(ParameterInfo::new(6, "Trigger").with_flags(ParameterFlags {
            readable: false,
            writable: true,
        }));

        assert_eq!(unit.set_parameter_value(5, 0.5), Err(HostError::NotWritable(5)));
        assert_eq!(unit.parameter_value(5).unwrap(), 0.0);
        assert_eq!(unit.parameter_value(6), Err(HostError::NotReadable(6)));
        unit.set_parameter_value(6, 1.0).unwrap();
    }

    #[test]
    fn test_property_list_tracks_added_properties() {
        let unit = unit();
        let index = unit.add_property(PropertyValueType::Number, "Level", encode_f64(1.5));
        assert_eq!(index, 0);

        let list = unit.property_data(PROPERTY_LIST_ID, Scope::Global, 0).unwrap();
        let descriptors = decode_descriptor_list(&list).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "Level");

        assert_eq!(unit.property_size(CUSTOM_PROPERTY_BASE, Scope::Global, 0).unwrap(), 8);
        assert_eq!(
            unit.property_size(CUSTOM_PROPERTY_BASE + 1, Scope::Global, 0),
            Err(HostError::PropertyNotFound(CUSTOM_PROPERTY_BASE + 1))
        );
    }

    #[test]
    fn test_removed_listener_is_not_called() {
        let unit = unit();
        let fired = Arc::new(AtomicU64::new(0));
        let counter = fired.clone();
        let event = AuEvent::parameter(EventKind::BeginParameterChangeGesture, ComponentId(1), 3);
        let registration = unit
            .add_listener(event, Arc::new(move |_: &AuEvent| {
                counter.fetch_add(1, Ordering::Relaxed);
            }))
            .unwrap();
        assert_eq!(unit.listener_count(), 1);

        unit.begin_parameter_gesture(3).unwrap();
        unit.remove_listener(registration);
        unit.begin_parameter_gesture(3).unwrap();

        assert_eq!(fired.load(Ordering::Relaxed), 1);
        assert_eq!(unit.listener_count(), 0);
    }

    #[test]
    fn test_callback_may_reenter_unit() {
        let unit = Arc::new(unit());
        let reentrant = unit.clone();
        let event = AuEvent::parameter(EventKind::ParameterValueChange, ComponentId(1), 3);
        unit.add_listener(
            event,
            Arc::new(move |_: &AuEvent| {
                // Would deadlock if the registry lock were still held.
                let _ = reentrant.parameter_value(3);
                let _ = reentrant.listener_count();
            }),
        )
        .unwrap();
        unit.set_parameter_value(3, 0.5).unwrap();
    }
}
