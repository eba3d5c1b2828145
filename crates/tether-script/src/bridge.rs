//! Bridge between one AudioUnit and one web view script context.
//!
//! Lifecycle:
//!
//! ```text
//! new()                      listener created, nothing registered
//! on_context_created(ctx)    surface installed, events registered  -> Active
//! (deliveries)               dispatch(): global handler, then entry
//! on_context_released()      table dropped, listener disposed      -> Released
//! ```
//!
//! Everything here runs on the run loop thread. The listener reaches the
//! dispatcher through a weak reference, so a delivery racing with teardown
//! finds nothing to call.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use tether_core::{
    decode_descriptor_list, property_host_id, AudioUnitHost, AuEvent, BridgeConfig, EventSource,
    EventKind, HostError, ParameterId, PropertyDescriptor, PropertyValueType, Scope,
    PROPERTY_LIST_ID,
};
use tether_listener::{Clock, Delivery, EventListener, RunLoop};

use crate::context::{ContextPhase, ContextState, ScriptContext};
use crate::dispatch::{callback_name, DispatchTable, ParameterEntry, PropertyEntry};
use crate::error::{BridgeError, Result};
use crate::surface::{
    attach, install_get_property, install_parameter_functions, parameter_descriptor,
    property_descriptor, PARAMS, PROPERTIES,
};
use crate::value::{ObjectRef, ScriptValue};

/// What a listener registration was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    Parameter(ParameterId),
    /// Custom property, by script index.
    Property(u32),
}

/// State the listener callback reaches into.
#[derive(Default)]
struct Dispatcher {
    state: RefCell<ContextState>,
    table: RefCell<DispatchTable>,
}

impl Dispatcher {
    fn active_global(&self) -> Option<ObjectRef> {
        self.state
            .borrow()
            .context()
            .map(|context| context.global().clone())
    }

    fn dispatch(&self, event: &AuEvent, value: f32) {
        let Some(global) = self.active_global() else {
            log::trace!("no active context, dropping {event:?}");
            return;
        };
        let name = callback_name(event.kind);
        let value = ScriptValue::Number(f64::from(value));

        if let Some(handler) = global.function(name) {
            let args = [ScriptValue::Number(f64::from(event.id())), value.clone()];
            if let Err(e) = handler.call(&args) {
                log::warn!("global {name} raised: {e}");
            }
        }

        // The global handler may have torn the context down.
        if self.active_global().is_none() {
            return;
        }

        let target = self.table.borrow().find_descriptor(event);
        if let Some(handler) = target.and_then(|descriptor| descriptor.function(name)) {
            if let Err(e) = handler.call(&[value]) {
                log::warn!("{name} for id {} raised: {e}", event.id());
            }
        }
    }
}

/// Connects a host audio unit to a script context.
pub struct ScriptBridge {
    host: Arc<dyn AudioUnitHost>,
    config: BridgeConfig,
    dispatcher: Rc<Dispatcher>,
    listener: EventListener<Subscription>,
}

impl ScriptBridge {
    /// Create a bridge whose listener flushes on `run_loop`.
    ///
    /// Nothing is registered with `source` until a context is created.
    pub fn new(
        host: Arc<dyn AudioUnitHost>,
        source: Arc<dyn EventSource>,
        run_loop: Rc<RunLoop>,
        clock: Arc<dyn Clock>,
        config: BridgeConfig,
    ) -> Result<Self> {
        config.validate()?;

        let dispatcher = Rc::new(Dispatcher::default());
        let weak: Weak<Dispatcher> = Rc::downgrade(&dispatcher);
        let listener = EventListener::new(
            run_loop,
            source,
            clock,
            config.listener,
            move |delivery: Delivery<Subscription>| {
                if let Some(dispatcher) = weak.upgrade() {
                    log::trace!("delivering {:?} at tick {}", delivery.subscriber, delivery.timestamp);
                    dispatcher.dispatch(&delivery.event, delivery.value);
                }
            },
        )
        .map_err(|e| {
            log::error!("failed to create event listener: {e}");
            BridgeError::from(e)
        })?;

        log::debug!("script bridge created for {}", host.component());
        Ok(Self {
            host,
            config,
            dispatcher,
            listener,
        })
    }

    pub fn phase(&self) -> ContextPhase {
        self.dispatcher.state.borrow().phase()
    }

    /// The active context, if any.
    pub fn context(&self) -> Option<ScriptContext> {
        self.dispatcher.state.borrow().context().cloned()
    }

    pub fn listener(&self) -> &EventListener<Subscription> {
        &self.listener
    }

    /// Install the script surface on `context` and start listening.
    ///
    /// Refused once a context was released, and while one is active.
    pub fn on_context_created(&self, context: ScriptContext) -> Result<()> {
        match self.phase() {
            ContextPhase::Uninitialized => {}
            ContextPhase::Active => {
                log::warn!("context created while another is active, ignoring");
                return Err(BridgeError::AlreadyActive);
            }
            ContextPhase::Released => {
                log::warn!("context created after release, ignoring");
                return Err(BridgeError::Released);
            }
        }

        let global = context.global().clone();
        let saved = global.snapshot();
        let mut registered = Vec::new();
        let mut table = DispatchTable::with_capacity(self.config.max_parameters, self.config.max_properties);
        let built = self
            .install_parameters(&global, &mut table, &mut registered)
            .and_then(|()| self.install_properties(&global, &mut table, &mut registered));

        // A failed setup leaves neither host registrations nor globals behind.
        if let Err(e) = built {
            log::error!("script surface setup failed, rolling back: {e}");
            for event in registered {
                self.listener.stop_listening(event);
            }
            global.restore(saved);
            return Err(e);
        }

        log::debug!(
            "script context active: {} parameters, {} properties, {} host registrations",
            table.parameters().len(),
            table.properties().len(),
            self.listener.registration_count(),
        );
        *self.dispatcher.table.borrow_mut() = table;
        *self.dispatcher.state.borrow_mut() = ContextState::Active(context);
        Ok(())
    }

    fn install_parameters(
        &self,
        global: &ObjectRef,
        table: &mut DispatchTable,
        registered: &mut Vec<AuEvent>,
    ) -> Result<()> {
        install_parameter_functions(global, &self.host);
        let params = ObjectRef::new();
        global.define_read_only(PARAMS, params.clone());

        let scope = self.config.parameter_scope;
        let component = self.host.component();
        for id in self.host.parameter_ids(scope)? {
            if table.parameters_full() {
                log::warn!(
                    "more than {} parameters, ignoring the rest",
                    self.config.max_parameters
                );
                break;
            }
            let info = match self.host.parameter_info(id) {
                Ok(info) => info,
                Err(e) => {
                    log::warn!("skipping parameter {id}: {e}");
                    continue;
                }
            };

            for kind in EventKind::PARAMETER_KINDS {
                let event = AuEvent::parameter(kind, component, id).with_scope(scope, 0);
                self.listener.start_listening(Subscription::Parameter(id), event)?;
                registered.push(event);
            }

            let descriptor = parameter_descriptor(global, &info);
            attach(global, &params, &info.name, &descriptor);
            table.push_parameter(ParameterEntry { info, descriptor });
        }
        Ok(())
    }

    fn install_properties(
        &self,
        global: &ObjectRef,
        table: &mut DispatchTable,
        registered: &mut Vec<AuEvent>,
    ) -> Result<()> {
        let mut descriptors = self.property_list()?;
        if descriptors.len() > self.config.max_properties {
            log::warn!(
                "{} custom properties, only the first {} are exposed",
                descriptors.len(),
                self.config.max_properties
            );
            descriptors.truncate(self.config.max_properties);
        }

        let value_types: Rc<[PropertyValueType]> =
            descriptors.iter().map(|d| d.value_type).collect();
        install_get_property(global, &self.host, value_types);
        let properties = ObjectRef::new();
        global.define_read_only(PROPERTIES, properties.clone());

        let component = self.host.component();
        for (index, property) in (0u32..).zip(descriptors) {
            let event = AuEvent::property(component, property_host_id(index));
            self.listener.start_listening(Subscription::Property(index), event)?;
            registered.push(event);

            let descriptor = property_descriptor(global, index, &property);
            attach(global, &properties, &property.name, &descriptor);
            table.push_property(PropertyEntry {
                index,
                name: property.name,
                value_type: property.value_type,
                descriptor,
            });
        }
        Ok(())
    }

    /// Custom property list; a unit without one exposes no properties.
    fn property_list(&self) -> Result<Vec<PropertyDescriptor>> {
        match self.host.property_data(PROPERTY_LIST_ID, Scope::Global, 0) {
            Ok(bytes) => Ok(decode_descriptor_list(&bytes)?),
            Err(HostError::PropertyNotFound(_)) => {
                log::debug!("{} has no custom property list", self.host.component());
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Route one notification to script.
    ///
    /// The global handler for the event kind runs first with `(id, value)`,
    /// where `id` is the host id for parameters and properties alike. Then
    /// the first matching entry's handler runs with `(value)`. Does nothing
    /// unless a context is active.
    pub fn dispatch(&self, event: &AuEvent, value: f32) {
        self.dispatcher.dispatch(event, value);
    }

    /// Tear down the context. Only the first call has any effect.
    pub fn on_context_released(&self) {
        let previous = std::mem::replace(
            &mut *self.dispatcher.state.borrow_mut(),
            ContextState::Released,
        );
        match previous {
            ContextState::Released => return,
            ContextState::Uninitialized => log::debug!("released before any context was created"),
            ContextState::Active(_) => log::debug!("script context released"),
        }
        self.dispatcher.table.borrow_mut().clear();
        self.listener.dispose();
    }

    /// Parameter and property metadata of the active context as JSON.
    pub fn manifest_json(&self) -> serde_json::Value {
        self.dispatcher.table.borrow().manifest()
    }
}

impl std::fmt::Debug for ScriptBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptBridge")
            .field("component", &self.host.component())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
