//! Reading custom property values into script values.

use tether_core::{property_host_id, AudioUnitHost, PropertyValueType, Scope};

use crate::value::{ScriptException, ScriptResult, ScriptValue};

const F64_SIZE: usize = std::mem::size_of::<f64>();

/// Decode raw property bytes as `value_type`.
///
/// Numbers are native-endian doubles. Strings stop at the first NUL and are
/// decoded lossily.
pub fn decode_property(value_type: PropertyValueType, bytes: &[u8]) -> ScriptResult {
    match value_type {
        PropertyValueType::Number => {
            let raw: [u8; F64_SIZE] = bytes.try_into().map_err(|_| {
                ScriptException::new(format!(
                    "number property must be {F64_SIZE} bytes, got {}",
                    bytes.len()
                ))
            })?;
            Ok(ScriptValue::Number(f64::from_ne_bytes(raw)))
        }
        PropertyValueType::String => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            Ok(ScriptValue::String(
                String::from_utf8_lossy(&bytes[..end]).into_owned(),
            ))
        }
        PropertyValueType::NumberArray => {
            if bytes.len() % F64_SIZE != 0 {
                return Err(ScriptException::new(format!(
                    "number-array property size {} is not a multiple of {F64_SIZE}",
                    bytes.len()
                )));
            }
            let values = bytes
                .chunks_exact(F64_SIZE)
                .map(|chunk| {
                    let mut raw = [0u8; F64_SIZE];
                    raw.copy_from_slice(chunk);
                    ScriptValue::Number(f64::from_ne_bytes(raw))
                })
                .collect();
            Ok(ScriptValue::Array(values))
        }
    }
}

/// Read property `index` from the host, typed through `value_types`.
///
/// The size is queried before the data so a number property with the wrong
/// size fails without a data read.
pub fn read_property(
    host: &dyn AudioUnitHost,
    value_types: &[PropertyValueType],
    index: u32,
) -> ScriptResult {
    let value_type = *value_types.get(index as usize).ok_or_else(|| {
        ScriptException::new(format!(
            "GetProperty: index {index} out of range ({} properties)",
            value_types.len()
        ))
    })?;

    let id = property_host_id(index);
    let size = host.property_size(id, Scope::Global, 0)?;
    if value_type == PropertyValueType::Number && size != F64_SIZE {
        return Err(ScriptException::new(format!(
            "GetProperty: number property {index} has size {size}, expected {F64_SIZE}"
        )));
    }

    let bytes = host.property_data(id, Scope::Global, 0)?;
    if bytes.len() != size {
        log::debug!(
            "property {index} changed size between queries ({size} -> {})",
            bytes.len()
        );
    }
    decode_property(value_type, &bytes)
}
