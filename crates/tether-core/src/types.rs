//! Identifiers and event records shared by every Tether crate.
//!
//! An [`AuEvent`] is the value-copyable descriptor that flows from the host's
//! notification thread into the scheduling loop. Two events describe the same
//! watched property exactly when every field compares equal.

use serde::{Deserialize, Serialize};

/// Parameter identifier in the host's flat parameter id space.
pub type ParameterId = u32;

/// Property identifier (built-in or custom, see [`crate::property`]).
pub type PropertyId = u32;

/// Element (bus) index within a scope.
pub type Element = u32;

/// Opaque identity of one host audio component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub u64);

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Audio unit scope. Values match `AudioUnitScope`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum Scope {
    #[default]
    Global = 0,
    Input = 1,
    Output = 2,
}

/// Kind of change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A parameter's value changed.
    ParameterValueChange,
    /// A control surface or UI started a parameter edit.
    BeginParameterChangeGesture,
    /// A control surface or UI finished a parameter edit.
    EndParameterChangeGesture,
    /// A property's value changed.
    PropertyChange,
}

impl EventKind {
    /// All parameter-scoped kinds, in registration order.
    pub const PARAMETER_KINDS: [EventKind; 3] = [
        EventKind::BeginParameterChangeGesture,
        EventKind::EndParameterChangeGesture,
        EventKind::ParameterValueChange,
    ];

    /// Whether events of this kind target a parameter (as opposed to a property).
    pub const fn is_parameter(self) -> bool {
        !matches!(self, EventKind::PropertyChange)
    }
}

/// The (component, id, scope, element) tuple a notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventTarget {
    pub component: ComponentId,
    /// Parameter id or property id, depending on the event kind.
    pub id: u32,
    pub scope: Scope,
    pub element: Element,
}

/// A watched descriptor: what changed and where.
///
/// The host's raw callback carries only this record, never the new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuEvent {
    pub kind: EventKind,
    pub target: EventTarget,
}

impl AuEvent {
    /// Event on a global-scope parameter.
    pub const fn parameter(kind: EventKind, component: ComponentId, id: ParameterId) -> Self {
        Self {
            kind,
            target: EventTarget {
                component,
                id,
                scope: Scope::Global,
                element: 0,
            },
        }
    }

    /// Property change event on a global-scope property.
    pub const fn property(component: ComponentId, id: PropertyId) -> Self {
        Self {
            kind: EventKind::PropertyChange,
            target: EventTarget {
                component,
                id,
                scope: Scope::Global,
                element: 0,
            },
        }
    }

    /// Override the scope and element of the target.
    pub const fn with_scope(mut self, scope: Scope, element: Element) -> Self {
        self.target.scope = scope;
        self.target.element = element;
        self
    }

    /// Shorthand for `self.target.id`.
    pub const fn id(&self) -> u32 {
        self.target.id
    }

    pub const fn is_parameter_event(&self) -> bool {
        self.kind.is_parameter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_equality_covers_every_field() {
        let unit = ComponentId(7);
        let a = AuEvent::parameter(EventKind::ParameterValueChange, unit, 3);
        assert_eq!(a, AuEvent::parameter(EventKind::ParameterValueChange, unit, 3));
        assert_ne!(a, AuEvent::parameter(EventKind::BeginParameterChangeGesture, unit, 3));
        assert_ne!(a, AuEvent::parameter(EventKind::ParameterValueChange, ComponentId(8), 3));
        assert_ne!(a, a.with_scope(Scope::Output, 0));
        assert_ne!(a, a.with_scope(Scope::Global, 1));
    }

    #[test]
    fn test_kind_classification() {
        for kind in EventKind::PARAMETER_KINDS {
            assert!(kind.is_parameter());
        }
        assert!(!EventKind::PropertyChange.is_parameter());
        assert!(!AuEvent::property(ComponentId(1), 64001).is_parameter_event());
    }
}
