//! Parameter metadata types.
//!
//! This module provides types for describing host parameter metadata:
//! - [`ParameterInfo`] - Name, unit, range, default and access flags
//! - [`ParameterFlags`] - Read/write access
//! - [`ParameterUnit`] - Unit type hints as reported by the host

use serde::Serialize;

use crate::types::ParameterId;

/// AudioUnitParameterUnit values.
///
/// The values match Apple's `AudioUnitParameterUnit` enum from
/// `AudioToolbox/AudioUnitProperties.h` so a host adapter can pass them
/// through unchanged.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum ParameterUnit {
    #[default]
    Generic = 0,
    Indexed = 1,
    Boolean = 2,
    Percent = 3,
    Seconds = 4,
    SampleFrames = 5,
    Phase = 6,
    Rate = 7,
    Hertz = 8,
    Cents = 9,
    RelativeSemiTones = 10,
    MidiNoteNumber = 11,
    MidiController = 12,
    Decibels = 13,
    LinearGain = 14,
    Degrees = 15,
    EqualPowerCrossfade = 16,
    MixerFaderCurve1 = 17,
    Pan = 18,
    Meters = 19,
    AbsoluteCents = 20,
    Octaves = 21,
    Bpm = 22,
    Beats = 23,
    Milliseconds = 24,
    Ratio = 25,
    /// Custom unit, see [`ParameterInfo::unit_name`].
    CustomUnit = 26,
}

impl ParameterUnit {
    /// Short label for display next to a value.
    pub const fn label(self) -> &'static str {
        match self {
            ParameterUnit::Percent => "%",
            ParameterUnit::Seconds => "s",
            ParameterUnit::Hertz => "Hz",
            ParameterUnit::Cents | ParameterUnit::AbsoluteCents => "cents",
            ParameterUnit::RelativeSemiTones => "st",
            ParameterUnit::Decibels => "dB",
            ParameterUnit::Degrees => "deg",
            ParameterUnit::Meters => "m",
            ParameterUnit::Octaves => "oct",
            ParameterUnit::Bpm => "BPM",
            ParameterUnit::Beats => "beats",
            ParameterUnit::Milliseconds => "ms",
            _ => "",
        }
    }
}

/// Access flags reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParameterFlags {
    /// Value can be read with `GetParameter`.
    pub readable: bool,
    /// Value can be written with `SetParameter`.
    pub writable: bool,
}

impl Default for ParameterFlags {
    fn default() -> Self {
        Self {
            readable: true,
            writable: true,
        }
    }
}

/// Metadata describing a single host parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    /// Host parameter identifier.
    pub id: ParameterId,
    /// Display name. Also used as the key in the scripting `Params` collection.
    pub name: String,
    /// Unit type hint.
    pub unit: ParameterUnit,
    /// Unit label for [`ParameterUnit::CustomUnit`]. Empty otherwise.
    pub unit_name: String,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub flags: ParameterFlags,
}

impl ParameterInfo {
    /// Create a read/write generic parameter ranging over `0.0..=1.0`.
    pub fn new(id: ParameterId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            unit: ParameterUnit::Generic,
            unit_name: String::new(),
            min: 0.0,
            max: 1.0,
            default: 0.0,
            flags: ParameterFlags::default(),
        }
    }

    /// Set the value range.
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: f32) -> Self {
        self.default = default;
        self
    }

    /// Set the unit type hint.
    pub fn with_unit(mut self, unit: ParameterUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Set a custom unit label. Implies [`ParameterUnit::CustomUnit`].
    pub fn with_unit_name(mut self, unit_name: impl Into<String>) -> Self {
        self.unit = ParameterUnit::CustomUnit;
        self.unit_name = unit_name.into();
        self
    }

    /// Set access flags.
    pub fn with_flags(mut self, flags: ParameterFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Unit label: the custom name for custom units, the standard label otherwise.
    pub fn unit_label(&self) -> &str {
        if self.unit == ParameterUnit::CustomUnit {
            &self.unit_name
        } else {
            self.unit.label()
        }
    }

    /// Whether `value` lies within `min..=max`.
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}
