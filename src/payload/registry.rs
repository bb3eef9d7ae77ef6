//! # Field Registry
//!
//! Fixed table mapping the 6-bit field-type key carried on the wire to the
//! descriptor that tells the field codec how wide the field is and how its
//! bits turn into a number. Keys 1-43 are assigned; key 0 is the end-of-data
//! sentinel and every other key resolves to [`FieldDescriptor::UNASSIGNED`].
//!
//! The table is immutable for the lifetime of the process and is shared by
//! reference from every decode/encode call.
//!
//! Keys 33-42 (pressure through rssi) are provisional. Their ranges and
//! precisions have not yet been confirmed against the device firmware's field
//! table, and frames using them may decode differently once they are.

use crate::constants::MAX_FIELD_KEY;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Field-type keys, named after their canonical label
pub mod keys {
    pub const END_OF_DATA: u8 = 0;
    pub const TEMPERATURE: u8 = 1;
    pub const RELATIVE_HUMIDITY: u8 = 2;
    pub const LUX: u8 = 3;
    pub const MOVEMENT: u8 = 4;
    pub const COUNTER: u8 = 5;
    pub const DIGITAL: u8 = 6;
    pub const VOLTAGE_0_10: u8 = 7;
    pub const CURRENT_4_20: u8 = 8;
    pub const OHM: u8 = 9;
    pub const CO2: u8 = 10;
    pub const BATTERY_VOLTAGE: u8 = 11;
    pub const PUSH_FREQUENCY: u8 = 12;
    pub const RAW: u8 = 13;
    pub const UO: u8 = 14;
    pub const UI: u8 = 15;
    pub const DO: u8 = 16;
    pub const DI: u8 = 17;
    pub const FIRMWARE_VERSION: u8 = 18;
    pub const HARDWARE_VERSION: u8 = 19;
    pub const INT8: u8 = 20;
    pub const UINT8: u8 = 21;
    pub const INT16: u8 = 22;
    pub const UINT16: u8 = 23;
    pub const INT32: u8 = 24;
    pub const UINT32: u8 = 25;
    pub const INT64: u8 = 26;
    pub const UINT64: u8 = 27;
    pub const BOOL: u8 = 28;
    pub const CHAR: u8 = 29;
    pub const FLOAT: u8 = 30;
    pub const DOUBLE: u8 = 31;
    pub const STRING: u8 = 32;
    pub const PRESSURE: u8 = 33;
    pub const VOLTAGE: u8 = 34;
    pub const CURRENT: u8 = 35;
    pub const POWER: u8 = 36;
    pub const ENERGY: u8 = 37;
    pub const FLOW: u8 = 38;
    pub const PERCENTAGE: u8 = 39;
    pub const SOUND_LEVEL: u8 = 40;
    pub const VOC: u8 = 41;
    pub const RSSI: u8 = 42;
    pub const ERROR: u8 = 43;
}

/// Scalar types a raw data-point field can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool,
    /// Single Latin-1 character
    Char,
}

impl ScalarKind {
    /// Width of the scalar on the wire
    pub const fn byte_width(self) -> usize {
        match self {
            Self::I8 | Self::U8 | Self::Bool | Self::Char => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub const fn bit_width(self) -> usize {
        self.byte_width() * 8
    }
}

/// How a field's bits map to a value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoding {
    /// Zero-valued descriptor returned for key 0 and unassigned keys
    Unassigned,
    /// Quantized offset from `low` at `decimals` places, minimum bit width
    FixedPoint { low: f64, high: f64, decimals: u8 },
    /// Fixed byte-width scalar, bits reinterpreted as-is
    RawDataPoint(ScalarKind),
    /// 8-bit length followed by that many 1-byte characters
    Text,
}

/// Registry entry for one field-type key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    pub key: u8,
    /// Canonical label used to synthesize point names
    pub label: &'static str,
    pub encoding: Encoding,
}

impl FieldDescriptor {
    pub const UNASSIGNED: FieldDescriptor = FieldDescriptor {
        key: 0,
        label: "",
        encoding: Encoding::Unassigned,
    };

    const fn fixed(key: u8, label: &'static str, low: f64, high: f64, decimals: u8) -> Self {
        Self {
            key,
            label,
            encoding: Encoding::FixedPoint { low, high, decimals },
        }
    }

    const fn raw(key: u8, label: &'static str, kind: ScalarKind) -> Self {
        Self {
            key,
            label,
            encoding: Encoding::RawDataPoint(kind),
        }
    }

    const fn text(key: u8, label: &'static str) -> Self {
        Self {
            key,
            label,
            encoding: Encoding::Text,
        }
    }

    pub fn is_assigned(&self) -> bool {
        !matches!(self.encoding, Encoding::Unassigned)
    }

    /// Bit width of the field body, `None` for variable-length text
    pub fn bit_count(&self) -> Option<usize> {
        match self.encoding {
            Encoding::Unassigned => Some(0),
            Encoding::FixedPoint { low, high, decimals } => {
                Some(fixed_point_bits(low, high, decimals))
            }
            Encoding::RawDataPoint(kind) => Some(kind.bit_width()),
            Encoding::Text => None,
        }
    }
}

/// Smallest `b` such that `2^b >= (high - low) * 10^decimals`
pub fn fixed_point_bits(low: f64, high: f64, decimals: u8) -> usize {
    let span = (high - low) * 10f64.powi(decimals as i32);
    if span <= 1.0 {
        return 0;
    }
    span.log2().ceil() as usize
}

use ScalarKind::*;

/// The registry, indexed by `key - 1`
pub static REGISTRY: [FieldDescriptor; MAX_FIELD_KEY as usize] = [
    FieldDescriptor::fixed(keys::TEMPERATURE, "temp", -45.0, 120.0, 2),
    FieldDescriptor::fixed(keys::RELATIVE_HUMIDITY, "rh", 0.0, 100.0, 2),
    FieldDescriptor::fixed(keys::LUX, "lux", 0.0, 65535.0, 0),
    FieldDescriptor::raw(keys::MOVEMENT, "movement", Bool),
    FieldDescriptor::raw(keys::COUNTER, "counter", U32),
    FieldDescriptor::raw(keys::DIGITAL, "digital", Bool),
    FieldDescriptor::fixed(keys::VOLTAGE_0_10, "voltage_0_10", 0.0, 10.0, 3),
    FieldDescriptor::fixed(keys::CURRENT_4_20, "current_4_20", 4.0, 20.0, 3),
    FieldDescriptor::fixed(keys::OHM, "ohm", 0.0, 1_000_000.0, 0),
    FieldDescriptor::fixed(keys::CO2, "co2", 0.0, 5000.0, 0),
    FieldDescriptor::fixed(keys::BATTERY_VOLTAGE, "battery_voltage", 0.0, 5.0, 2),
    FieldDescriptor::raw(keys::PUSH_FREQUENCY, "push_frequency", U16),
    FieldDescriptor::fixed(keys::RAW, "raw", 0.0, 1023.0, 0),
    FieldDescriptor::fixed(keys::UO, "uo", 0.0, 100.0, 1),
    FieldDescriptor::fixed(keys::UI, "ui", 0.0, 100.0, 1),
    FieldDescriptor::raw(keys::DO, "do", Bool),
    FieldDescriptor::raw(keys::DI, "di", Bool),
    FieldDescriptor::raw(keys::FIRMWARE_VERSION, "firmware_version", U8),
    FieldDescriptor::raw(keys::HARDWARE_VERSION, "hardware_version", U8),
    FieldDescriptor::raw(keys::INT8, "int8", I8),
    FieldDescriptor::raw(keys::UINT8, "uint8", U8),
    FieldDescriptor::raw(keys::INT16, "int16", I16),
    FieldDescriptor::raw(keys::UINT16, "uint16", U16),
    FieldDescriptor::raw(keys::INT32, "int32", I32),
    FieldDescriptor::raw(keys::UINT32, "uint32", U32),
    FieldDescriptor::raw(keys::INT64, "int64", I64),
    FieldDescriptor::raw(keys::UINT64, "uint64", U64),
    FieldDescriptor::raw(keys::BOOL, "bool", Bool),
    FieldDescriptor::raw(keys::CHAR, "char", Char),
    FieldDescriptor::raw(keys::FLOAT, "float", F32),
    FieldDescriptor::raw(keys::DOUBLE, "double", F64),
    FieldDescriptor::text(keys::STRING, "string"),
    // provisional until checked against the firmware table
    FieldDescriptor::fixed(keys::PRESSURE, "pressure", 300.0, 1100.0, 1),
    FieldDescriptor::fixed(keys::VOLTAGE, "voltage", 0.0, 50.0, 2),
    FieldDescriptor::fixed(keys::CURRENT, "current", 0.0, 100.0, 3),
    FieldDescriptor::fixed(keys::POWER, "power", 0.0, 100_000.0, 1),
    FieldDescriptor::raw(keys::ENERGY, "energy", U32),
    FieldDescriptor::fixed(keys::FLOW, "flow", 0.0, 1000.0, 2),
    FieldDescriptor::fixed(keys::PERCENTAGE, "percentage", 0.0, 100.0, 1),
    FieldDescriptor::fixed(keys::SOUND_LEVEL, "sound_level", 0.0, 150.0, 1),
    FieldDescriptor::fixed(keys::VOC, "voc", 0.0, 60_000.0, 0),
    FieldDescriptor::fixed(keys::RSSI, "rssi", -150.0, 0.0, 0),
    FieldDescriptor::raw(keys::ERROR, "error", U8),
];

static BY_LABEL: Lazy<HashMap<&'static str, &'static FieldDescriptor>> =
    Lazy::new(|| REGISTRY.iter().map(|d| (d.label, d)).collect());

/// Resolve a field-type key. Key 0 and unassigned keys yield
/// [`FieldDescriptor::UNASSIGNED`].
pub fn lookup(key: u8) -> &'static FieldDescriptor {
    match key {
        1..=MAX_FIELD_KEY => &REGISTRY[key as usize - 1],
        _ => &FieldDescriptor::UNASSIGNED,
    }
}

/// Resolve a canonical label such as `"temp"` or `"rh"`
pub fn lookup_label(label: &str) -> Option<&'static FieldDescriptor> {
    BY_LABEL.get(label).copied()
}

/// Iterate every assigned descriptor in key order
pub fn descriptors() -> impl Iterator<Item = &'static FieldDescriptor> {
    REGISTRY.iter()
}
