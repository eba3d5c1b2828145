//! Script context handle and its lifecycle.

use crate::value::{ObjectRef, ScriptException, ScriptResult, ScriptValue};

/// One web view script context: the global object a page sees.
///
/// Clones share the same global.
#[derive(Debug, Clone, Default)]
pub struct ScriptContext {
    global: ObjectRef,
}

impl ScriptContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self) -> &ObjectRef {
        &self.global
    }

    /// Resolve a dotted path such as `Params.Gain.min` from the global.
    pub fn get(&self, path: &str) -> Option<ScriptValue> {
        let mut current = ScriptValue::Object(self.global.clone());
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Call the function at a dotted path, e.g. `Properties.ScopeData.Get`.
    ///
    /// The receiver object is resolved first; the function is looked up and
    /// called without holding any borrow of it.
    pub fn call(&self, path: &str, args: &[ScriptValue]) -> ScriptResult {
        let (receiver, method) = match path.rsplit_once('.') {
            Some((parent, method)) => {
                let receiver = self
                    .get(parent)
                    .and_then(|v| v.as_object().cloned())
                    .ok_or_else(|| ScriptException::new(format!("{parent} is not an object")))?;
                (receiver, method)
            }
            None => (self.global.clone(), path),
        };
        receiver.call_method(method, args)
    }
}

/// Lifecycle phase without the context payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPhase {
    Uninitialized,
    Active,
    Released,
}

/// Lifecycle of the bridge's context.
///
/// `Released` is terminal; a new context needs a new bridge.
#[derive(Debug, Default)]
pub enum ContextState {
    #[default]
    Uninitialized,
    Active(ScriptContext),
    Released,
}

impl ContextState {
    pub fn phase(&self) -> ContextPhase {
        match self {
            Self::Uninitialized => ContextPhase::Uninitialized,
            Self::Active(_) => ContextPhase::Active,
            Self::Released => ContextPhase::Released,
        }
    }

    pub fn context(&self) -> Option<&ScriptContext> {
        match self {
            Self::Active(context) => Some(context),
            _ => None,
        }
    }
}
