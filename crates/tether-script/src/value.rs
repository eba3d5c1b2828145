//! Script value model.
//!
//! A small, single-threaded object graph standing in for the embedded
//! engine's value system: objects are ordered slot lists shared through
//! [`ObjectRef`], functions are native closures behind [`FunctionRef`].
//! Nothing here is `Send`; every value lives on the run loop thread.
//!
//! Calling a function never holds a borrow of the object it was read from,
//! so callbacks are free to reassign slots on that object.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tether_core::HostError;

/// A catchable script-level error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptException {
    message: String,
}

impl ScriptException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ScriptException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ScriptException {}

impl From<HostError> for ScriptException {
    fn from(e: HostError) -> Self {
        Self::new(e.to_string())
    }
}

/// Result of a script call.
pub type ScriptResult = Result<ScriptValue, ScriptException>;

// =========================================================================
// ScriptValue
// =========================================================================

/// A script value.
#[derive(Debug, Clone, Default)]
pub enum ScriptValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ScriptValue>),
    Object(ObjectRef),
    Function(FunctionRef),
}

impl ScriptValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl PartialEq for ScriptValue {
    /// Structural for plain values, identity for objects and functions.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<f64> for ScriptValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<ScriptValue>> for ScriptValue {
    fn from(items: Vec<ScriptValue>) -> Self {
        Self::Array(items)
    }
}

impl From<ObjectRef> for ScriptValue {
    fn from(object: ObjectRef) -> Self {
        Self::Object(object)
    }
}

impl From<FunctionRef> for ScriptValue {
    fn from(function: FunctionRef) -> Self {
        Self::Function(function)
    }
}

// =========================================================================
// FunctionRef
// =========================================================================

type NativeFn = dyn Fn(&[ScriptValue]) -> ScriptResult;

/// Shared handle to a callable.
#[derive(Clone)]
pub struct FunctionRef(Rc<NativeFn>);

impl FunctionRef {
    pub fn new(f: impl Fn(&[ScriptValue]) -> ScriptResult + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, args: &[ScriptValue]) -> ScriptResult {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[function]")
    }
}

// =========================================================================
// ObjectRef
// =========================================================================

#[derive(Clone)]
struct Slot {
    name: String,
    value: ScriptValue,
    read_only: bool,
}

#[derive(Default)]
struct ScriptObject {
    slots: Vec<Slot>,
}

impl ScriptObject {
    fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.name == name)
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| s.name == name)
    }

    fn put(&mut self, name: &str, value: ScriptValue, read_only: bool) {
        match self.slot_mut(name) {
            Some(slot) => {
                slot.value = value;
                slot.read_only = read_only;
            }
            None => self.slots.push(Slot {
                name: name.to_owned(),
                value,
                read_only,
            }),
        }
    }
}

/// Shared handle to a script object. Slots keep insertion order.
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<ScriptObject>>);

/// Saved slot list of an [`ObjectRef`].
pub struct ObjectSnapshot(Vec<Slot>);

/// Non-owning handle to a script object.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<RefCell<ScriptObject>>);

impl WeakObjectRef {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }
}

impl ObjectRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Value of a slot, `None` if absent.
    pub fn get(&self, name: &str) -> Option<ScriptValue> {
        self.0.borrow().slot(name).map(|s| s.value.clone())
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.borrow().slot(name).is_some()
    }

    /// Assign a slot the way a script would. Read-only slots raise.
    pub fn set(&self, name: &str, value: impl Into<ScriptValue>) -> Result<(), ScriptException> {
        let mut object = self.0.borrow_mut();
        match object.slot_mut(name) {
            Some(slot) if slot.read_only => Err(ScriptException::new(format!(
                "cannot assign to read-only property '{name}'"
            ))),
            Some(slot) => {
                slot.value = value.into();
                Ok(())
            }
            None => {
                object.put(name, value.into(), false);
                Ok(())
            }
        }
    }

    /// Define a writable slot, replacing any existing one.
    pub fn define(&self, name: &str, value: impl Into<ScriptValue>) {
        self.0.borrow_mut().put(name, value.into(), false);
    }

    /// Define a read-only slot, replacing any existing one.
    pub fn define_read_only(&self, name: &str, value: impl Into<ScriptValue>) {
        self.0.borrow_mut().put(name, value.into(), true);
    }

    /// Copy of every slot, for a later [`restore`](Self::restore).
    pub fn snapshot(&self) -> ObjectSnapshot {
        ObjectSnapshot(self.0.borrow().slots.clone())
    }

    /// Put the slots back as they were at `snapshot`. Slots added since are
    /// dropped, read-only ones included.
    pub fn restore(&self, snapshot: ObjectSnapshot) {
        self.0.borrow_mut().slots = snapshot.0;
    }

    /// The function stored in `name`, if that slot holds one.
    pub fn function(&self, name: &str) -> Option<FunctionRef> {
        match self.get(name) {
            Some(ScriptValue::Function(function)) => Some(function),
            _ => None,
        }
    }

    /// Call the function stored in `name`.
    pub fn call_method(&self, name: &str, args: &[ScriptValue]) -> ScriptResult {
        let function = self
            .function(name)
            .ok_or_else(|| ScriptException::new(format!("{name} is not a function")))?;
        function.call(args)
    }
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(object) => f
                .debug_list()
                .entries(object.slots.iter().map(|s| &s.name))
                .finish(),
            Err(_) => f.write_str("[object (borrowed)]"),
        }
    }
}

// =========================================================================
// Argument helpers
// =========================================================================

/// Fail unless exactly `expected` arguments were passed.
pub fn expect_args(function: &str, args: &[ScriptValue], expected: usize) -> Result<(), ScriptException> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ScriptException::new(format!(
            "{function}: expected {expected} argument(s), got {}",
            args.len()
        )))
    }
}

/// Numeric argument at `index`.
pub fn number_arg(function: &str, args: &[ScriptValue], index: usize) -> Result<f64, ScriptException> {
    args.get(index)
        .and_then(ScriptValue::as_number)
        .ok_or_else(|| ScriptException::new(format!("{function}: argument {index} must be a number")))
}

/// Non-negative integral argument at `index` that fits in a `u32`.
pub fn id_arg(function: &str, args: &[ScriptValue], index: usize) -> Result<u32, ScriptException> {
    let n = number_arg(function, args, index)?;
    if n.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&n) {
        Ok(n as u32)
    } else {
        Err(ScriptException::new(format!(
            "{function}: argument {index} must be a non-negative integer id, got {n}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_read_only_slots_reject_assignment() {
        let object = ObjectRef::new();
        object.define_read_only("id", 3.0);
        object.set("label", "gain").unwrap();

        let err = object.set("id", 4.0).unwrap_err();
        assert!(err.message().contains("read-only"));
        assert_eq!(object.get("id"), Some(ScriptValue::Number(3.0)));
        assert!(object.has("label"));
    }

    #[test]
    fn test_call_method() {
        let object = ObjectRef::new();
        object.define(
            "add",
            FunctionRef::new(|args| {
                let a = number_arg("add", args, 0)?;
                let b = number_arg("add", args, 1)?;
                Ok((a + b).into())
            }),
        );
        assert_eq!(
            object.call_method("add", &[1.0.into(), 2.0.into()]).unwrap(),
            ScriptValue::Number(3.0)
        );
        assert!(object.call_method("add", &["x".into()]).is_err());
        assert!(object.call_method("missing", &[]).is_err());
    }

    #[test]
    fn test_callback_may_reassign_its_own_slot() {
        let object = ObjectRef::new();
        let calls = Rc::new(Cell::new(0));
        let weak = object.downgrade();
        let counter = calls.clone();
        object.define(
            "OnChange",
            FunctionRef::new(move |_| {
                counter.set(counter.get() + 1);
                if let Some(object) = weak.upgrade() {
                    object.set("OnChange", ScriptValue::Null)?;
                }
                Ok(ScriptValue::Undefined)
            }),
        );

        object.call_method("OnChange", &[]).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(object.get("OnChange"), Some(ScriptValue::Null));
    }

    #[test]
    fn test_id_arg_validation() {
        assert_eq!(id_arg("f", &[3.0.into()], 0).unwrap(), 3);
        assert!(id_arg("f", &[(-1.0).into()], 0).is_err());
        assert!(id_arg("f", &[1.5.into()], 0).is_err());
        assert!(id_arg("f", &["3".into()], 0).is_err());
        assert!(id_arg("f", &[], 0).is_err());
        assert!(expect_args("f", &[ScriptValue::Null], 2).is_err());
    }

    #[test]
    fn test_restore_drops_later_slots() {
        let object = ObjectRef::new();
        object.define("Title", "Reverb");
        let saved = object.snapshot();

        object.set("Title", "Delay").unwrap();
        object.define_read_only("SetParameter", FunctionRef::new(|_| Ok(ScriptValue::Undefined)));
        object.restore(saved);

        assert_eq!(object.get("Title"), Some(ScriptValue::String("Reverb".into())));
        assert!(!object.has("SetParameter"));
        object.set("SetParameter", 1.0).unwrap();
    }

    #[test]
    fn test_object_equality_is_identity() {
        let a = ObjectRef::new();
        let b = ObjectRef::new();
        assert_eq!(ScriptValue::from(a.clone()), ScriptValue::from(a.clone()));
        assert_ne!(ScriptValue::from(a), ScriptValue::from(b));
    }
}
