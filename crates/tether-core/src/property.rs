//! Custom property descriptors and their byte layout.
//!
//! A plugin advertises its custom properties through one list property
//! ([`PROPERTY_LIST_ID`]) whose payload is a packed array of fixed-size
//! records:
//!
//! ```text
//! offset 0   u32 value type code (host byte order)
//! offset 4   [u8; 64] UTF-8 name, NUL padded
//! ```
//!
//! The property at list position `i` lives at host id
//! `CUSTOM_PROPERTY_BASE + i`. Scripts address properties by list position.

use serde::Serialize;

use crate::error::{HostError, Result};
use crate::types::PropertyId;

/// Host id of the list property describing all custom properties.
pub const PROPERTY_LIST_ID: PropertyId = 64000;

/// Host id of the first custom property.
pub const CUSTOM_PROPERTY_BASE: PropertyId = 64001;

/// Maximum name length in bytes, including the terminating NUL.
pub const PROPERTY_NAME_CAPACITY: usize = 64;

/// Size of one encoded [`PropertyDescriptor`].
pub const PROPERTY_DESCRIPTOR_SIZE: usize = 4 + PROPERTY_NAME_CAPACITY;

/// Translate a script-side index into a host property id.
pub const fn property_host_id(index: u32) -> PropertyId {
    index + CUSTOM_PROPERTY_BASE
}

/// Translate a host property id back into a script-side index.
///
/// Returns `None` for built-in ids below [`CUSTOM_PROPERTY_BASE`].
pub const fn property_script_index(id: PropertyId) -> Option<u32> {
    id.checked_sub(CUSTOM_PROPERTY_BASE)
}

/// Declared value type of a custom property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u32)]
pub enum PropertyValueType {
    /// One 8-byte IEEE double.
    Number = 0,
    /// UTF-8 text, optionally NUL terminated.
    String = 1,
    /// Packed 8-byte doubles.
    NumberArray = 2,
}

impl PropertyValueType {
    pub const fn from_raw(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Number),
            1 => Some(Self::String),
            2 => Some(Self::NumberArray),
            _ => None,
        }
    }

    /// Name exposed to scripts as the descriptor's `type`.
    pub const fn script_name(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::NumberArray => "number-array",
        }
    }
}

/// One entry of the custom property list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyDescriptor {
    pub value_type: PropertyValueType,
    pub name: String,
}

impl PropertyDescriptor {
    pub fn new(value_type: PropertyValueType, name: impl Into<String>) -> Self {
        Self {
            value_type,
            name: name.into(),
        }
    }

    /// Append the fixed-size record for this descriptor to `out`.
    ///
    /// Names longer than the record allows are truncated on a character
    /// boundary so the stored bytes stay valid UTF-8.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.value_type as u32).to_ne_bytes());

        let mut len = self.name.len().min(PROPERTY_NAME_CAPACITY - 1);
        while !self.name.is_char_boundary(len) {
            len -= 1;
        }
        let mut name = [0u8; PROPERTY_NAME_CAPACITY];
        name[..len].copy_from_slice(&self.name.as_bytes()[..len]);
        out.extend_from_slice(&name);
    }

    fn decode(record: &[u8]) -> Result<Self> {
        let mut code = [0u8; 4];
        code.copy_from_slice(&record[..4]);
        let code = u32::from_ne_bytes(code);
        let value_type = PropertyValueType::from_raw(code)
            .ok_or_else(|| HostError::InvalidData(format!("unknown property type code {code}")))?;

        let name = &record[4..];
        let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        let name = std::str::from_utf8(&name[..end])
            .map_err(|e| HostError::InvalidData(format!("property name is not UTF-8: {e}")))?;

        Ok(Self::new(value_type, name))
    }
}

/// Encode a descriptor list as the payload of [`PROPERTY_LIST_ID`].
pub fn encode_descriptor_list(descriptors: &[PropertyDescriptor]) -> Vec<u8> {
    let mut out = Vec::with_capacity(descriptors.len() * PROPERTY_DESCRIPTOR_SIZE);
    for descriptor in descriptors {
        descriptor.encode_into(&mut out);
    }
    out
}

/// Decode the payload of [`PROPERTY_LIST_ID`].
pub fn decode_descriptor_list(bytes: &[u8]) -> Result<Vec<PropertyDescriptor>> {
    if bytes.len() % PROPERTY_DESCRIPTOR_SIZE != 0 {
        return Err(HostError::InvalidSize {
            expected: bytes.len() / PROPERTY_DESCRIPTOR_SIZE * PROPERTY_DESCRIPTOR_SIZE,
            actual: bytes.len(),
        });
    }
    bytes
        .chunks_exact(PROPERTY_DESCRIPTOR_SIZE)
        .map(PropertyDescriptor::decode)
        .collect()
}

/// Encode a `number` payload.
pub fn encode_f64(value: f64) -> Vec<u8> {
    value.to_ne_bytes().to_vec()
}

/// Encode a `number-array` payload.
pub fn encode_f64_slice(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

/// Encode a `string` payload (NUL terminated).
pub fn encode_string(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + 1);
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_mapping_is_a_bijection() {
        assert_eq!(property_host_id(0), CUSTOM_PROPERTY_BASE);
        assert_eq!(property_script_index(property_host_id(5)), Some(5));
        assert_eq!(property_script_index(PROPERTY_LIST_ID), None);
        assert_eq!(property_script_index(0), None);
    }

    #[test]
    fn test_descriptor_list_layout() {
        let list = vec![
            PropertyDescriptor::new(PropertyValueType::NumberArray, "ScopeData"),
            PropertyDescriptor::new(PropertyValueType::String, "PresetName"),
        ];
        let bytes = encode_descriptor_list(&list);
        assert_eq!(bytes.len(), 2 * PROPERTY_DESCRIPTOR_SIZE);
        assert_eq!(&bytes[..4], &2u32.to_ne_bytes());
        assert_eq!(&bytes[4..13], b"ScopeData");
        assert_eq!(bytes[13], 0);

        assert_eq!(decode_descriptor_list(&bytes).unwrap(), list);
    }

    #[test]
    fn test_descriptor_list_rejects_partial_record() {
        let bytes = vec![0u8; PROPERTY_DESCRIPTOR_SIZE + 3];
        assert!(matches!(
            decode_descriptor_list(&bytes),
            Err(HostError::InvalidSize { actual, .. }) if actual == PROPERTY_DESCRIPTOR_SIZE + 3
        ));
    }

    #[test]
    fn test_descriptor_list_rejects_unknown_type() {
        let mut bytes = encode_descriptor_list(&[PropertyDescriptor::new(
            PropertyValueType::Number,
            "Level",
        )]);
        bytes[..4].copy_from_slice(&9u32.to_ne_bytes());
        assert!(matches!(decode_descriptor_list(&bytes), Err(HostError::InvalidData(_))));
    }

    #[test]
    fn test_long_names_truncate_on_char_boundary() {
        let name = "é".repeat(40);
        let mut out = Vec::new();
        PropertyDescriptor::new(PropertyValueType::Number, name).encode_into(&mut out);
        let decoded = decode_descriptor_list(&out).unwrap();
        assert_eq!(decoded[0].name, "é".repeat(31));
    }

    #[test]
    fn test_empty_list() {
        assert!(decode_descriptor_list(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_script_names() {
        assert_eq!(PropertyValueType::Number.script_name(), "number");
        assert_eq!(PropertyValueType::String.script_name(), "string");
        assert_eq!(PropertyValueType::NumberArray.script_name(), "number-array");
    }
}
