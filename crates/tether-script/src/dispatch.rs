//! Dispatch table: which script object handles which host event.
//!
//! The table is filled once per context and read on every delivery. Both
//! halves have a fixed capacity chosen at context creation; entries past it
//! are skipped, never grown into.

use serde::Serialize;
use tether_core::{
    property_host_id, AuEvent, EventKind, ParameterId, ParameterInfo, PropertyValueType,
};

use crate::value::ObjectRef;

pub const ON_PARAMETER_CHANGE: &str = "OnParameterChange";
pub const ON_BEGIN_PARAMETER_GESTURE: &str = "OnBeginParameterGesture";
pub const ON_END_PARAMETER_GESTURE: &str = "OnEndParameterGesture";
pub const ON_PROPERTY_CHANGE: &str = "OnPropertyChange";

/// Script callback name for an event kind, used on the global object and on
/// per-entry descriptors alike.
pub const fn callback_name(kind: EventKind) -> &'static str {
    match kind {
        EventKind::ParameterValueChange => ON_PARAMETER_CHANGE,
        EventKind::BeginParameterChangeGesture => ON_BEGIN_PARAMETER_GESTURE,
        EventKind::EndParameterChangeGesture => ON_END_PARAMETER_GESTURE,
        EventKind::PropertyChange => ON_PROPERTY_CHANGE,
    }
}

/// A parameter exposed to script.
#[derive(Debug, Clone)]
pub struct ParameterEntry {
    pub info: ParameterInfo,
    pub descriptor: ObjectRef,
}

/// A custom property exposed to script.
#[derive(Debug, Clone)]
pub struct PropertyEntry {
    /// Zero-based script index.
    pub index: u32,
    pub name: String,
    pub value_type: PropertyValueType,
    pub descriptor: ObjectRef,
}

impl PropertyEntry {
    /// Host property id this entry listens to.
    pub const fn host_id(&self) -> u32 {
        property_host_id(self.index)
    }
}

#[derive(Serialize)]
struct ParameterManifest<'a> {
    id: ParameterId,
    name: &'a str,
    unit: &'a str,
    min: f32,
    max: f32,
    default: f32,
}

#[derive(Serialize)]
struct PropertyManifest<'a> {
    id: u32,
    name: &'a str,
    #[serde(rename = "type")]
    value_type: &'static str,
}

#[derive(Serialize)]
struct Manifest<'a> {
    parameters: Vec<ParameterManifest<'a>>,
    properties: Vec<PropertyManifest<'a>>,
}

/// Fixed-capacity parameter and property entries.
#[derive(Debug, Default)]
pub struct DispatchTable {
    parameters: Vec<ParameterEntry>,
    properties: Vec<PropertyEntry>,
    max_parameters: usize,
    max_properties: usize,
}

impl DispatchTable {
    pub fn with_capacity(max_parameters: usize, max_properties: usize) -> Self {
        Self {
            parameters: Vec::with_capacity(max_parameters),
            properties: Vec::with_capacity(max_properties),
            max_parameters,
            max_properties,
        }
    }

    pub fn parameters_full(&self) -> bool {
        self.parameters.len() >= self.max_parameters
    }

    pub fn properties_full(&self) -> bool {
        self.properties.len() >= self.max_properties
    }

    /// Add a parameter entry. Returns `false` (and keeps the table unchanged)
    /// when the parameter half is full.
    pub fn push_parameter(&mut self, entry: ParameterEntry) -> bool {
        if self.parameters_full() {
            log::warn!(
                "parameter table full ({}), skipping '{}'",
                self.max_parameters,
                entry.info.name
            );
            return false;
        }
        self.parameters.push(entry);
        true
    }

    /// Add a property entry. Returns `false` when the property half is full.
    pub fn push_property(&mut self, entry: PropertyEntry) -> bool {
        if self.properties_full() {
            log::warn!(
                "property table full ({}), skipping '{}'",
                self.max_properties,
                entry.name
            );
            return false;
        }
        self.properties.push(entry);
        true
    }

    pub fn parameters(&self) -> &[ParameterEntry] {
        &self.parameters
    }

    pub fn properties(&self) -> &[PropertyEntry] {
        &self.properties
    }

    /// Descriptor of the first entry matching `event`.
    ///
    /// Parameter events compare against parameter ids; property events
    /// compare against each entry's host id.
    pub fn find_descriptor(&self, event: &AuEvent) -> Option<ObjectRef> {
        let id = event.id();
        if event.is_parameter_event() {
            self.parameters
                .iter()
                .find(|entry| entry.info.id == id)
                .map(|entry| entry.descriptor.clone())
        } else {
            self.properties
                .iter()
                .find(|entry| entry.host_id() == id)
                .map(|entry| entry.descriptor.clone())
        }
    }

    /// Drop every entry. Capacity limits stay.
    pub fn clear(&mut self) {
        self.parameters.clear();
        self.properties.clear();
    }

    /// Parameter and property metadata as JSON for page bootstrapping.
    pub fn manifest(&self) -> serde_json::Value {
        let manifest = Manifest {
            parameters: self
                .parameters
                .iter()
                .map(|entry| ParameterManifest {
                    id: entry.info.id,
                    name: &entry.info.name,
                    unit: entry.info.unit_label(),
                    min: entry.info.min,
                    max: entry.info.max,
                    default: entry.info.default,
                })
                .collect(),
            properties: self
                .properties
                .iter()
                .map(|entry| PropertyManifest {
                    id: entry.index,
                    name: &entry.name,
                    value_type: entry.value_type.script_name(),
                })
                .collect(),
        };
        serde_json::to_value(manifest).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{ComponentId, ParameterUnit, CUSTOM_PROPERTY_BASE};

    const UNIT: ComponentId = ComponentId(1);

    fn parameter(id: ParameterId, name: &str) -> ParameterEntry {
        ParameterEntry {
            info: ParameterInfo::new(id, name),
            descriptor: ObjectRef::new(),
        }
    }

    fn property(index: u32, name: &str) -> PropertyEntry {
        PropertyEntry {
            index,
            name: name.to_owned(),
            value_type: PropertyValueType::NumberArray,
            descriptor: ObjectRef::new(),
        }
    }

    #[test]
    fn test_callback_names() {
        assert_eq!(callback_name(EventKind::ParameterValueChange), "OnParameterChange");
        assert_eq!(
            callback_name(EventKind::BeginParameterChangeGesture),
            "OnBeginParameterGesture"
        );
        assert_eq!(
            callback_name(EventKind::EndParameterChangeGesture),
            "OnEndParameterGesture"
        );
        assert_eq!(callback_name(EventKind::PropertyChange), "OnPropertyChange");
    }

    #[test]
    fn test_capacity_is_fixed() {
        let mut table = DispatchTable::with_capacity(1, 1);
        assert!(table.push_parameter(parameter(3, "Gain")));
        assert!(!table.push_parameter(parameter(4, "Mix")));
        assert!(table.push_property(property(0, "ScopeData")));
        assert!(!table.push_property(property(1, "Meter")));
        assert_eq!(table.parameters().len(), 1);
        assert_eq!(table.properties().len(), 1);
    }

    #[test]
    fn test_first_match_wins() {
        let mut table = DispatchTable::with_capacity(4, 4);
        let first = parameter(3, "Gain");
        let expected = first.descriptor.clone();
        table.push_parameter(first);
        table.push_parameter(parameter(3, "Gain (alias)"));

        let event = AuEvent::parameter(EventKind::ParameterValueChange, UNIT, 3);
        assert!(table.find_descriptor(&event).unwrap().ptr_eq(&expected));
        let missing = AuEvent::parameter(EventKind::ParameterValueChange, UNIT, 9);
        assert!(table.find_descriptor(&missing).is_none());
    }

    #[test]
    fn test_property_lookup_uses_host_id() {
        let mut table = DispatchTable::with_capacity(4, 4);
        table.push_property(property(0, "ScopeData"));
        let meter = property(1, "Meter");
        let expected = meter.descriptor.clone();
        table.push_property(meter);

        // Script index 1 never matches directly.
        assert!(table.find_descriptor(&AuEvent::property(UNIT, 1)).is_none());
        let event = AuEvent::property(UNIT, CUSTOM_PROPERTY_BASE + 1);
        assert!(table.find_descriptor(&event).unwrap().ptr_eq(&expected));
        // A parameter sharing the number does not shadow the property.
        table.push_parameter(parameter(CUSTOM_PROPERTY_BASE + 1, "Odd"));
        assert!(table.find_descriptor(&event).unwrap().ptr_eq(&expected));
    }

    #[test]
    fn test_manifest() {
        let mut table = DispatchTable::with_capacity(4, 4);
        table.push_parameter(ParameterEntry {
            info: ParameterInfo::new(3, "Gain")
                .with_range(-60.0, 12.0)
                .with_default(0.0)
                .with_unit(ParameterUnit::Decibels),
            descriptor: ObjectRef::new(),
        });
        table.push_property(property(0, "ScopeData"));

        assert_eq!(
            table.manifest(),
            serde_json::json!({
                "parameters": [
                    { "id": 3, "name": "Gain", "unit": "dB", "min": -60.0, "max": 12.0, "default": 0.0 }
                ],
                "properties": [
                    { "id": 0, "name": "ScopeData", "type": "number-array" }
                ]
            })
        );

        table.clear();
        assert_eq!(
            table.manifest(),
            serde_json::json!({ "parameters": [], "properties": [] })
        );
    }
}
