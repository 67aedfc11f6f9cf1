//! Schema-driven binary encoding
//!
//! The inverse of [`super::decode`]. Used to build ABI-exact buffers for
//! in-memory regions, fixtures and benchmarks. Fields absent from the record are
//! left zeroed.

use crate::types::{FieldKind, PrimitiveType, Record, StructSchema, Value};
use crate::{Result, TelemetryError};

/// Encode `record` into a new buffer of exactly `schema.size()` bytes.
pub fn encode(record: &Record, schema: &StructSchema) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; schema.size()];
    write_struct(&mut buf, 0, schema, record)?;
    Ok(buf)
}

/// Overwrite one field of an existing full-size buffer.
///
/// `path` uses the same syntax as [`StructSchema::locate`], for example
/// `mVehicles[127].mID` or `mWheels[0].mTemperature[0]`.
pub fn write_field(buf: &mut [u8], schema: &StructSchema, path: &str, value: &Value) -> Result<()> {
    if buf.len() != schema.size() {
        return Err(TelemetryError::StructSizeMismatch {
            schema: schema.name().to_string(),
            expected: schema.size(),
            actual: buf.len(),
        });
    }

    let slot = schema.locate(path).ok_or_else(|| TelemetryError::missing_field(path))?;
    write_value(buf, slot.offset, slot.kind, slot.repeat, value)
}

fn write_struct(buf: &mut [u8], base: usize, schema: &StructSchema, record: &Record) -> Result<()> {
    for field in schema.fields() {
        if let Some(value) = record.value(&field.name) {
            write_value(buf, base + field.offset, &field.kind, field.repeat, value)?;
        }
    }
    Ok(())
}

fn write_value(
    buf: &mut [u8],
    offset: usize,
    kind: &FieldKind,
    repeat: Option<usize>,
    value: &Value,
) -> Result<()> {
    let Some(count) = repeat else {
        return write_element(buf, offset, kind, value);
    };

    let items = value.as_array().ok_or_else(|| TelemetryError::TypeConversion {
        details: format!("Expected Array of {count}, got {}", value.kind_name()),
    })?;
    if items.len() > count {
        return Err(TelemetryError::TypeConversion {
            details: format!("Array of {} elements exceeds repeat count {count}", items.len()),
        });
    }

    let stride = kind.size();
    for (i, item) in items.iter().enumerate() {
        write_element(buf, offset + i * stride, kind, item)?;
    }
    Ok(())
}

fn write_element(buf: &mut [u8], offset: usize, kind: &FieldKind, value: &Value) -> Result<()> {
    match (kind, value) {
        (FieldKind::Primitive(ty), _) => {
            let bytes = primitive_bytes(*ty, value).ok_or_else(|| TelemetryError::TypeConversion {
                details: format!("Cannot store {} as {:?}", value.kind_name(), ty),
            })?;
            slice_mut(buf, offset, bytes.len())?.copy_from_slice(&bytes);
            Ok(())
        }
        (FieldKind::Text(len), Value::Text(text)) => write_padded(buf, offset, *len, text.as_bytes()),
        (FieldKind::Bytes(len), Value::Bytes(bytes)) => write_padded(buf, offset, *len, bytes),
        (FieldKind::Nested(schema), Value::Struct(record)) => {
            write_struct(buf, offset, schema, record)
        }
        (kind, value) => Err(TelemetryError::TypeConversion {
            details: format!("Cannot store {} in {:?} field", value.kind_name(), kind_label(kind)),
        }),
    }
}

fn write_padded(buf: &mut [u8], offset: usize, len: usize, data: &[u8]) -> Result<()> {
    if data.len() > len {
        return Err(TelemetryError::TypeConversion {
            details: format!("{} bytes do not fit in a {len}-byte field", data.len()),
        });
    }

    let target = slice_mut(buf, offset, len)?;
    target[..data.len()].copy_from_slice(data);
    target[data.len()..].fill(0);
    Ok(())
}

fn slice_mut(buf: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
    buf.get_mut(offset..offset + len).ok_or(TelemetryError::Memory { offset })
}

fn kind_label(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Primitive(_) => "primitive",
        FieldKind::Text(_) => "text",
        FieldKind::Bytes(_) => "bytes",
        FieldKind::Nested(_) => "nested",
    }
}

fn primitive_bytes(ty: PrimitiveType, value: &Value) -> Option<Vec<u8>> {
    let bytes = match ty {
        PrimitiveType::Int8 => i8::try_from(value.as_i64()?).ok()?.to_le_bytes().to_vec(),
        PrimitiveType::UInt8 => u8::try_from(value.as_i64()?).ok()?.to_le_bytes().to_vec(),
        PrimitiveType::Int16 => i16::try_from(value.as_i64()?).ok()?.to_le_bytes().to_vec(),
        PrimitiveType::UInt16 => u16::try_from(value.as_i64()?).ok()?.to_le_bytes().to_vec(),
        PrimitiveType::Int32 => i32::try_from(value.as_i64()?).ok()?.to_le_bytes().to_vec(),
        PrimitiveType::UInt32 => u32::try_from(value.as_i64()?).ok()?.to_le_bytes().to_vec(),
        PrimitiveType::Int64 => value.as_i64()?.to_le_bytes().to_vec(),
        PrimitiveType::UInt64 => match *value {
            Value::UInt64(v) => v.to_le_bytes().to_vec(),
            _ => u64::try_from(value.as_i64()?).ok()?.to_le_bytes().to_vec(),
        },
        PrimitiveType::Float32 => match *value {
            Value::Float32(v) => v.to_le_bytes().to_vec(),
            _ => (value.as_f64()? as f32).to_le_bytes().to_vec(),
        },
        PrimitiveType::Float64 => value.as_f64()?.to_le_bytes().to_vec(),
    };
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> std::sync::Arc<StructSchema> {
        StructSchema::builder("Entry", 4)
            .scalar("mID", PrimitiveType::Int32)
            .scalar("mPlace", PrimitiveType::UInt8)
            .text("mDriverName", 4)
            .array("mSectors", PrimitiveType::Float64, 2)
            .build()
            .unwrap()
    }

    #[test]
    fn integers_are_range_checked() {
        let schema = schema();
        let mut buf = vec![0u8; schema.size()];
        assert!(write_field(&mut buf, &schema, "mPlace", &Value::Int32(3)).is_ok());
        assert!(write_field(&mut buf, &schema, "mPlace", &Value::Int32(300)).is_err());
        assert!(write_field(&mut buf, &schema, "mPlace", &Value::Float64(1.0)).is_err());
    }

    #[test]
    fn text_may_fill_the_field_without_terminator() {
        let schema = schema();
        let mut buf = vec![0u8; schema.size()];
        write_field(&mut buf, &schema, "mDriverName", &Value::Text("ABCD".into())).unwrap();
        let offset = schema.field("mDriverName").unwrap().offset;
        assert_eq!(&buf[offset..offset + 4], b"ABCD");

        write_field(&mut buf, &schema, "mDriverName", &Value::Text("AB".into())).unwrap();
        assert_eq!(&buf[offset..offset + 4], b"AB\0\0");

        assert!(write_field(&mut buf, &schema, "mDriverName", &Value::Text("ABCDE".into())).is_err());
    }

    #[test]
    fn repeats_reject_oversized_arrays() {
        let schema = schema();
        let mut buf = vec![0u8; schema.size()];
        let three = Value::Array(vec![Value::Float64(1.0); 3]);
        assert!(write_field(&mut buf, &schema, "mSectors", &three).is_err());

        let two = Value::Array(vec![Value::Float64(1.0); 2]);
        assert!(write_field(&mut buf, &schema, "mSectors", &two).is_ok());
    }

    #[test]
    fn wrong_buffer_size_is_rejected() {
        let schema = schema();
        let mut buf = vec![0u8; schema.size() + 4];
        assert!(matches!(
            write_field(&mut buf, &schema, "mID", &Value::Int32(1)),
            Err(TelemetryError::StructSizeMismatch { .. })
        ));
    }
}
