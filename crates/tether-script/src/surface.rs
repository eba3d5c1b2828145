//! The global functions and descriptor objects a page scripts against.
//!
//! Descriptor methods look up the global functions at call time through a
//! weak handle to the global object, so no descriptor keeps the context
//! alive and no reference cycle forms.

use std::rc::Rc;
use std::sync::Arc;

use tether_core::{AudioUnitHost, ParameterId, ParameterInfo, PropertyDescriptor, PropertyValueType};

use crate::property::read_property;
use crate::value::{
    expect_args, id_arg, number_arg, FunctionRef, ObjectRef, ScriptException, ScriptValue,
    WeakObjectRef,
};

pub const SET_PARAMETER: &str = "SetParameter";
pub const GET_PARAMETER: &str = "GetParameter";
pub const BEGIN_PARAMETER_CHANGE_GESTURE: &str = "BeginParameterChangeGesture";
pub const END_PARAMETER_CHANGE_GESTURE: &str = "EndParameterChangeGesture";
pub const GET_PROPERTY: &str = "GetProperty";
pub const PARAMS: &str = "Params";
pub const PROPERTIES: &str = "Properties";

/// Install the four parameter functions on `global`.
pub fn install_parameter_functions(global: &ObjectRef, host: &Arc<dyn AudioUnitHost>) {
    let h = host.clone();
    global.define_read_only(
        SET_PARAMETER,
        FunctionRef::new(move |args| {
            expect_args(SET_PARAMETER, args, 2)?;
            let id = id_arg(SET_PARAMETER, args, 0)?;
            let value = number_arg(SET_PARAMETER, args, 1)?;
            h.set_parameter_value(id, value as f32)?;
            Ok(ScriptValue::Undefined)
        }),
    );

    let h = host.clone();
    global.define_read_only(
        GET_PARAMETER,
        FunctionRef::new(move |args| {
            expect_args(GET_PARAMETER, args, 1)?;
            let id = id_arg(GET_PARAMETER, args, 0)?;
            Ok(ScriptValue::Number(f64::from(h.parameter_value(id)?)))
        }),
    );

    let h = host.clone();
    global.define_read_only(
        BEGIN_PARAMETER_CHANGE_GESTURE,
        FunctionRef::new(move |args| {
            expect_args(BEGIN_PARAMETER_CHANGE_GESTURE, args, 1)?;
            h.begin_parameter_gesture(id_arg(BEGIN_PARAMETER_CHANGE_GESTURE, args, 0)?)?;
            Ok(ScriptValue::Undefined)
        }),
    );

    let h = host.clone();
    global.define_read_only(
        END_PARAMETER_CHANGE_GESTURE,
        FunctionRef::new(move |args| {
            expect_args(END_PARAMETER_CHANGE_GESTURE, args, 1)?;
            h.end_parameter_gesture(id_arg(END_PARAMETER_CHANGE_GESTURE, args, 0)?)?;
            Ok(ScriptValue::Undefined)
        }),
    );
}

/// Install `GetProperty`, typed by `value_types` (indexed by script index).
pub fn install_get_property(
    global: &ObjectRef,
    host: &Arc<dyn AudioUnitHost>,
    value_types: Rc<[PropertyValueType]>,
) {
    let h = host.clone();
    global.define_read_only(
        GET_PROPERTY,
        FunctionRef::new(move |args| {
            expect_args(GET_PROPERTY, args, 1)?;
            let index = id_arg(GET_PROPERTY, args, 0)?;
            read_property(h.as_ref(), &value_types, index)
        }),
    );
}

/// A method that calls global `function` with `id` prepended to its
/// arguments.
fn forward(global: &WeakObjectRef, function: &'static str, id: u32) -> FunctionRef {
    let global = global.clone();
    FunctionRef::new(move |args| {
        let global = global
            .upgrade()
            .ok_or_else(|| ScriptException::new("script context is gone"))?;
        let mut forwarded = Vec::with_capacity(args.len() + 1);
        forwarded.push(ScriptValue::Number(f64::from(id)));
        forwarded.extend_from_slice(args);
        global.call_method(function, &forwarded)
    })
}

/// Descriptor object for one parameter.
pub fn parameter_descriptor(global: &ObjectRef, info: &ParameterInfo) -> ObjectRef {
    let weak = global.downgrade();
    let id: ParameterId = info.id;
    let descriptor = ObjectRef::new();
    descriptor.define_read_only("id", f64::from(id));
    descriptor.define_read_only("name", info.name.as_str());
    descriptor.define_read_only("unit", info.unit_label());
    descriptor.define_read_only("min", f64::from(info.min));
    descriptor.define_read_only("max", f64::from(info.max));
    descriptor.define_read_only("default", f64::from(info.default));
    descriptor.define_read_only("Get", forward(&weak, GET_PARAMETER, id));
    descriptor.define_read_only("Set", forward(&weak, SET_PARAMETER, id));
    descriptor.define_read_only("BeginGesture", forward(&weak, BEGIN_PARAMETER_CHANGE_GESTURE, id));
    descriptor.define_read_only("EndGesture", forward(&weak, END_PARAMETER_CHANGE_GESTURE, id));
    descriptor
}

/// Descriptor object for the custom property at script `index`.
pub fn property_descriptor(global: &ObjectRef, index: u32, property: &PropertyDescriptor) -> ObjectRef {
    let descriptor = ObjectRef::new();
    descriptor.define_read_only("id", f64::from(index));
    descriptor.define_read_only("name", property.name.as_str());
    descriptor.define_read_only("type", property.value_type.script_name());
    descriptor.define_read_only("Get", forward(&global.downgrade(), GET_PROPERTY, index));
    descriptor
}

/// Put `descriptor` into `collection` and onto the global under `name`.
///
/// A name clashing with a read-only global (`Params`, `SetParameter`, ...)
/// is only reachable through the collection.
pub fn attach(global: &ObjectRef, collection: &ObjectRef, name: &str, descriptor: &ObjectRef) {
    if collection.has(name) {
        log::warn!("duplicate script name '{name}', later entry wins");
    }
    collection.define(name, descriptor.clone());
    if let Err(e) = global.set(name, descriptor.clone()) {
        log::warn!("'{name}' not attached to the global object: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::{encode_string, ComponentId, ParameterFlags, SimulatedUnit};

    fn host() -> (Arc<SimulatedUnit>, Arc<dyn AudioUnitHost>) {
        let unit = Arc::new(SimulatedUnit::new(ComponentId(1)));
        unit.add_parameter(ParameterInfo::new(3, "Gain").with_range(0.0, 2.0));
        let host: Arc<dyn AudioUnitHost> = unit.clone();
        (unit, host)
    }

    #[test]
    fn test_parameter_functions() {
        let (unit, host) = host();
        let global = ObjectRef::new();
        install_parameter_functions(&global, &host);

        global
            .call_method(SET_PARAMETER, &[3.0.into(), 1.5.into()])
            .unwrap();
        assert_eq!(unit.parameter_value(3).unwrap(), 1.5);
        assert_eq!(
            global.call_method(GET_PARAMETER, &[3.0.into()]).unwrap(),
            ScriptValue::Number(1.5)
        );

        // Wrong arity, wrong type, unknown id, out of range.
        assert!(global.call_method(SET_PARAMETER, &[3.0.into()]).is_err());
        assert!(global.call_method(GET_PARAMETER, &["3".into()]).is_err());
        assert!(global.call_method(GET_PARAMETER, &[9.0.into()]).is_err());
        assert!(global
            .call_method(SET_PARAMETER, &[3.0.into(), 5.0.into()])
            .is_err());

        assert!(global.call_method(BEGIN_PARAMETER_CHANGE_GESTURE, &[3.0.into()]).is_ok());
        assert!(global.call_method(END_PARAMETER_CHANGE_GESTURE, &[3.0.into()]).is_ok());
        assert!(global.set(SET_PARAMETER, ScriptValue::Null).is_err());
    }

    #[test]
    fn test_write_only_parameter_raises_on_get() {
        let (unit, host) = host();
        unit.add_parameter(ParameterInfo::new(6, "Trigger").with_flags(ParameterFlags {
            readable: false,
            writable: true,
        }));
        let global = ObjectRef::new();
        install_parameter_functions(&global, &host);

        global
            .call_method(SET_PARAMETER, &[6.0.into(), 1.0.into()])
            .unwrap();
        let err = global.call_method(GET_PARAMETER, &[6.0.into()]).unwrap_err();
        assert!(err.message().contains("write-only"));
    }

    #[test]
    fn test_descriptor_forwards_with_id() {
        let (unit, host) = host();
        let global = ObjectRef::new();
        install_parameter_functions(&global, &host);
        let info = unit.parameter_info(3).unwrap();
        let gain = parameter_descriptor(&global, &info);

        assert_eq!(gain.get("max"), Some(ScriptValue::Number(2.0)));
        assert!(gain.set("id", 4.0).is_err());
        gain.call_method("Set", &[0.25.into()]).unwrap();
        assert_eq!(gain.call_method("Get", &[]).unwrap(), ScriptValue::Number(0.25));
    }

    #[test]
    fn test_descriptor_outliving_global_raises() {
        let (unit, host) = host();
        let global = ObjectRef::new();
        install_parameter_functions(&global, &host);
        let gain = parameter_descriptor(&global, &unit.parameter_info(3).unwrap());
        drop(global);
        assert!(gain.call_method("Get", &[]).is_err());
    }

    #[test]
    fn test_property_descriptor() {
        let (unit, host) = host();
        unit.add_property(PropertyValueType::String, "Preset", encode_string("Warm"));
        let global = ObjectRef::new();
        install_get_property(&global, &host, Rc::from(vec![PropertyValueType::String]));
        let preset = property_descriptor(
            &global,
            0,
            &PropertyDescriptor::new(PropertyValueType::String, "Preset"),
        );

        assert_eq!(preset.get("type"), Some(ScriptValue::String("string".into())));
        assert_eq!(
            preset.call_method("Get", &[]).unwrap(),
            ScriptValue::String("Warm".into())
        );
        assert!(global.call_method(GET_PROPERTY, &[1.0.into()]).is_err());
    }

    #[test]
    fn test_attach_respects_read_only_globals() {
        let global = ObjectRef::new();
        let params = ObjectRef::new();
        global.define_read_only(PARAMS, params.clone());
        let clash = ObjectRef::new();
        attach(&global, &params, PARAMS, &clash);

        assert!(params.get(PARAMS).unwrap().as_object().unwrap().ptr_eq(&clash));
        assert!(global.get(PARAMS).unwrap().as_object().unwrap().ptr_eq(&params));
    }
}
