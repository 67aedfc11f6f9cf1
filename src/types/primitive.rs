//! Primitive field types and decoded values

use serde::{Deserialize, Serialize};

use super::Record;

/// Primitive field representations used by the plugin ABI.
///
/// All multi-byte values are little-endian, matching the x86/x64 writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum PrimitiveType {
    /// 8-bit signed integer (`signed char`)
    Int8,
    /// 8-bit unsigned integer (`unsigned char`)
    UInt8,
    /// 16-bit signed integer (`short`)
    Int16,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit signed integer (`long` on Windows)
    Int32,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit unsigned integer
    UInt64,
    /// IEEE-754 single precision
    Float32,
    /// IEEE-754 double precision
    Float64,
}

impl PrimitiveType {
    /// Returns the size in bytes of this type.
    pub const fn size(&self) -> usize {
        match self {
            PrimitiveType::Int8 | PrimitiveType::UInt8 => 1,
            PrimitiveType::Int16 | PrimitiveType::UInt16 => 2,
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::Float32 => 4,
            PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Float64 => 8,
        }
    }

    /// Natural alignment before packing is applied.
    pub const fn align(&self) -> usize {
        self.size()
    }

    /// Reads a value of this type from exactly `self.size()` bytes.
    pub(crate) fn read(&self, bytes: &[u8]) -> Option<Value> {
        let value = match self {
            PrimitiveType::Int8 => Value::Int8(i8::from_le_bytes(bytes.try_into().ok()?)),
            PrimitiveType::UInt8 => Value::UInt8(u8::from_le_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Int16 => Value::Int16(i16::from_le_bytes(bytes.try_into().ok()?)),
            PrimitiveType::UInt16 => Value::UInt16(u16::from_le_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Int32 => Value::Int32(i32::from_le_bytes(bytes.try_into().ok()?)),
            PrimitiveType::UInt32 => Value::UInt32(u32::from_le_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Int64 => Value::Int64(i64::from_le_bytes(bytes.try_into().ok()?)),
            PrimitiveType::UInt64 => Value::UInt64(u64::from_le_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Float32 => Value::Float32(f32::from_le_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Float64 => Value::Float64(f64::from_le_bytes(bytes.try_into().ok()?)),
        };
        Some(value)
    }
}

/// Decoded value of a schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    /// Fixed-length text, truncated at the first zero byte
    Text(String),
    /// Opaque fixed-length bytes (padding, expansion areas)
    Bytes(Vec<u8>),
    /// Fixed repeat of a primitive or nested field
    Array(Vec<Value>),
    /// Nested structure keyed by field name
    Struct(Record),
}

impl Value {
    /// Short type label used in conversion errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int8(_) => "Int8",
            Value::UInt8(_) => "UInt8",
            Value::Int16(_) => "Int16",
            Value::UInt16(_) => "UInt16",
            Value::Int32(_) => "Int32",
            Value::UInt32(_) => "UInt32",
            Value::Int64(_) => "Int64",
            Value::UInt64(_) => "UInt64",
            Value::Float32(_) => "Float32",
            Value::Float64(_) => "Float64",
            Value::Text(_) => "Text",
            Value::Bytes(_) => "Bytes",
            Value::Array(_) => "Array",
            Value::Struct(_) => "Struct",
        }
    }

    /// Numeric view of any scalar value.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int8(v) => Some(v.into()),
            Value::UInt8(v) => Some(v.into()),
            Value::Int16(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::Int32(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::Int64(v) => Some(v as f64),
            Value::UInt64(v) => Some(v as f64),
            Value::Float32(v) => Some(v.into()),
            Value::Float64(v) => Some(v),
            _ => None,
        }
    }

    /// Integer view of any integral value.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int8(v) => Some(v.into()),
            Value::UInt8(v) => Some(v.into()),
            Value::Int16(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::Int32(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::Int64(v) => Some(v),
            Value::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Nested record, if this is a structure.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Struct(record) => Some(record),
            _ => None,
        }
    }

    /// Elements, if this is a repeat.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}
