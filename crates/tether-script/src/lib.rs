//! Scripting bridge for AudioUnit web views.
//!
//! A [`ScriptBridge`] installs a small global surface on a page's
//! [`ScriptContext`]:
//!
//! ```text
//! SetParameter(id, value)          GetParameter(id)
//! BeginParameterChangeGesture(id)  EndParameterChangeGesture(id)
//! GetProperty(index)
//! Params.<name>      { id, name, unit, min, max, default, Get, Set, BeginGesture, EndGesture }
//! Properties.<name>  { id, name, type, Get }
//! ```
//!
//! and routes coalesced host notifications to `OnParameterChange`,
//! `OnBeginParameterGesture`, `OnEndParameterGesture` and `OnPropertyChange`
//! handlers, globally and per descriptor.

pub mod bridge;
pub mod context;
pub mod dispatch;
mod error;
pub mod property;
pub mod surface;
pub mod value;

pub use bridge::{ScriptBridge, Subscription};
pub use context::{ContextPhase, ContextState, ScriptContext};
pub use dispatch::{callback_name, DispatchTable, ParameterEntry, PropertyEntry};
pub use error::{BridgeError, Result};
pub use property::{decode_property, read_property};
pub use value::{
    FunctionRef, ObjectRef, ObjectSnapshot, ScriptException, ScriptResult, ScriptValue,
    WeakObjectRef,
};
