//! Schema-driven binary decoding.
//!
//! [`decode`] walks a [`StructSchema`] and produces a [`Record`]. It is a pure
//! transform over a byte snapshot and performs no I/O. The buffer must be exactly
//! the schema size; anything else is a layout mismatch with the writer and is
//! rejected before any field is read.
//!
//! Decoding rules:
//! - primitives are read little-endian at their declared offset and width
//! - nested schemas recurse into a [`Value::Struct`]
//! - fixed repeats become a [`Value::Array`] of decoded elements
//! - text fields stop at the first zero byte (or use the full array when there is
//!   none) and replace invalid UTF-8 sequences instead of failing

mod encode;

pub use encode::{encode, write_field};

use crate::types::{FieldDef, FieldKind, Record, StructSchema, Value};
use crate::{Result, TelemetryError};

/// Decode a byte snapshot according to `schema`.
pub fn decode(bytes: &[u8], schema: &StructSchema) -> Result<Record> {
    if bytes.len() != schema.size() {
        return Err(TelemetryError::StructSizeMismatch {
            schema: schema.name().to_string(),
            expected: schema.size(),
            actual: bytes.len(),
        });
    }

    decode_struct(bytes, 0, schema)
}

/// Decode a single named field of `schema` from a full-size snapshot.
///
/// Avoids materialising the whole record when only one value is needed.
pub fn decode_field(bytes: &[u8], schema: &StructSchema, path: &str) -> Result<Value> {
    if bytes.len() != schema.size() {
        return Err(TelemetryError::StructSizeMismatch {
            schema: schema.name().to_string(),
            expected: schema.size(),
            actual: bytes.len(),
        });
    }

    let slot = schema.locate(path).ok_or_else(|| TelemetryError::missing_field(path))?;
    match slot.repeat {
        Some(count) => decode_repeat(bytes, slot.offset, slot.kind, count),
        None => decode_element(bytes, slot.offset, slot.kind),
    }
}

fn decode_struct(bytes: &[u8], base: usize, schema: &StructSchema) -> Result<Record> {
    let mut record = Record::with_capacity(schema.fields().len());
    for field in schema.fields() {
        record.insert(field.name.clone(), decode_def(bytes, base, field)?);
    }
    Ok(record)
}

fn decode_def(bytes: &[u8], base: usize, field: &FieldDef) -> Result<Value> {
    let offset = base + field.offset;
    match field.repeat {
        Some(count) => decode_repeat(bytes, offset, &field.kind, count),
        None => decode_element(bytes, offset, &field.kind),
    }
}

fn decode_repeat(bytes: &[u8], offset: usize, kind: &FieldKind, count: usize) -> Result<Value> {
    let stride = kind.size();
    let items = (0..count)
        .map(|i| decode_element(bytes, offset + i * stride, kind))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Array(items))
}

fn decode_element(bytes: &[u8], offset: usize, kind: &FieldKind) -> Result<Value> {
    match kind {
        FieldKind::Primitive(ty) => {
            let raw = slice(bytes, offset, ty.size())?;
            ty.read(raw).ok_or(TelemetryError::Memory { offset })
        }
        FieldKind::Text(len) => Ok(Value::Text(decode_text(slice(bytes, offset, *len)?))),
        FieldKind::Bytes(len) => Ok(Value::Bytes(slice(bytes, offset, *len)?.to_vec())),
        FieldKind::Nested(schema) => Ok(Value::Struct(decode_struct(bytes, offset, schema)?)),
    }
}

fn slice(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    bytes.get(offset..offset + len).ok_or(TelemetryError::Memory { offset })
}

/// Decode a fixed-length, zero-terminated text field.
///
/// A missing terminator is not an error: the whole array is the text.
pub fn decode_text(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrimitiveType;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn vec3() -> Arc<StructSchema> {
        StructSchema::builder("Vec3", 4)
            .scalar("x", PrimitiveType::Float64)
            .scalar("y", PrimitiveType::Float64)
            .scalar("z", PrimitiveType::Float64)
            .build()
            .unwrap()
    }

    fn sample_schema() -> Arc<StructSchema> {
        StructSchema::builder("Sample", 4)
            .scalar("mID", PrimitiveType::Int32)
            .scalar("mElapsedTime", PrimitiveType::Float64)
            .scalar("mSector", PrimitiveType::Int8)
            .scalar("mTotalLaps", PrimitiveType::Int16)
            .scalar("mFlags", PrimitiveType::UInt32)
            .scalar("mRange", PrimitiveType::Float32)
            .scalar("mCounter", PrimitiveType::UInt64)
            .text("mName", 8)
            .nested("mPos", &vec3())
            .array("mTemps", PrimitiveType::Float64, 3)
            .bytes("mExpansion", 4)
            .build()
            .unwrap()
    }

    #[test]
    fn rejects_buffers_of_the_wrong_size() {
        let schema = sample_schema();
        let short = vec![0u8; schema.size() - 1];
        let long = vec![0u8; schema.size() + 1];

        for buf in [short, long] {
            match decode(&buf, &schema) {
                Err(TelemetryError::StructSizeMismatch { expected, actual, .. }) => {
                    assert_eq!(expected, schema.size());
                    assert_eq!(actual, buf.len());
                }
                other => panic!("expected StructSizeMismatch, got {other:?}"),
            }
        }
    }

    #[test]
    fn decodes_every_field_kind() {
        let schema = sample_schema();
        let mut buf = vec![0u8; schema.size()];
        write_field(&mut buf, &schema, "mID", &Value::Int32(42)).unwrap();
        write_field(&mut buf, &schema, "mElapsedTime", &Value::Float64(12.345)).unwrap();
        write_field(&mut buf, &schema, "mSector", &Value::Int8(-1)).unwrap();
        write_field(&mut buf, &schema, "mTotalLaps", &Value::Int16(17)).unwrap();
        write_field(&mut buf, &schema, "mFlags", &Value::UInt32(0xDEAD_BEEF)).unwrap();
        write_field(&mut buf, &schema, "mRange", &Value::Float32(540.0)).unwrap();
        write_field(&mut buf, &schema, "mCounter", &Value::UInt64(u64::MAX)).unwrap();
        write_field(&mut buf, &schema, "mName", &Value::Text("GT3".into())).unwrap();
        write_field(&mut buf, &schema, "mPos.y", &Value::Float64(-3.5)).unwrap();
        write_field(&mut buf, &schema, "mTemps[2]", &Value::Float64(360.0)).unwrap();
        write_field(&mut buf, &schema, "mExpansion", &Value::Bytes(vec![1, 2, 3, 4])).unwrap();

        let record = decode(&buf, &schema).unwrap();
        assert_eq!(record.value("mID"), Some(&Value::Int32(42)));
        assert_eq!(record.value("mElapsedTime"), Some(&Value::Float64(12.345)));
        assert_eq!(record.value("mSector"), Some(&Value::Int8(-1)));
        assert_eq!(record.value("mTotalLaps"), Some(&Value::Int16(17)));
        assert_eq!(record.value("mFlags"), Some(&Value::UInt32(0xDEAD_BEEF)));
        assert_eq!(record.value("mRange"), Some(&Value::Float32(540.0)));
        assert_eq!(record.value("mCounter"), Some(&Value::UInt64(u64::MAX)));
        assert_eq!(record.value("mName"), Some(&Value::Text("GT3".into())));
        assert_eq!(record.get_path::<f64>("mPos.y").unwrap(), -3.5);
        assert_eq!(record.get_path::<f64>("mPos.x").unwrap(), 0.0);
        assert_eq!(record.get::<Vec<f64>>("mTemps").unwrap(), vec![0.0, 0.0, 360.0]);
        assert_eq!(record.value("mExpansion"), Some(&Value::Bytes(vec![1, 2, 3, 4])));
    }

    #[test]
    fn text_without_terminator_uses_the_whole_array() {
        assert_eq!(decode_text(b"ABCDEFGH"), "ABCDEFGH");
        assert_eq!(decode_text(b"ABC\0EFGH"), "ABC");
        assert_eq!(decode_text(b"\0BCDEFGH"), "");
        assert_eq!(decode_text(&[]), "");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let text = decode_text(&[b'L', 0xFF, b'M', b'U', 0]);
        assert_eq!(text, "L\u{FFFD}MU");
    }

    #[test]
    fn single_fields_decode_without_the_whole_record() {
        let schema = sample_schema();
        let mut buf = vec![0u8; schema.size()];
        write_field(&mut buf, &schema, "mTemps[1]", &Value::Float64(351.5)).unwrap();

        assert_eq!(decode_field(&buf, &schema, "mTemps[1]").unwrap(), Value::Float64(351.5));
        assert!(matches!(
            decode_field(&buf, &schema, "mTemps").unwrap(),
            Value::Array(items) if items.len() == 3
        ));
        assert!(matches!(
            decode_field(&buf, &schema, "mNope"),
            Err(TelemetryError::MissingField { .. })
        ));
    }

    proptest! {
        #[test]
        fn full_text_fields_decode_verbatim(text in "[ -~]{8}") {
            let schema = sample_schema();
            let mut buf = vec![0u8; schema.size()];
            let offset = schema.field("mName").unwrap().offset;
            buf[offset..offset + 8].copy_from_slice(text.as_bytes());

            let record = decode(&buf, &schema).unwrap();
            prop_assert_eq!(record.get::<String>("mName").unwrap(), text);
        }

        #[test]
        fn encoded_values_decode_exactly(
            id in any::<i32>(),
            elapsed in any::<f64>().prop_filter("finite", |v| v.is_finite()),
            sector in any::<i8>(),
            laps in any::<i16>(),
            flags in any::<u32>(),
            pos in prop::array::uniform3(-1.0e6f64..1.0e6),
            temps in prop::array::uniform3(0.0f64..500.0),
            name in "[a-zA-Z0-9 ]{0,7}",
        ) {
            let schema = sample_schema();

            let mut pos_record = Record::new();
            pos_record.insert("x", Value::Float64(pos[0]));
            pos_record.insert("y", Value::Float64(pos[1]));
            pos_record.insert("z", Value::Float64(pos[2]));

            let mut record = Record::new();
            record.insert("mID", Value::Int32(id));
            record.insert("mElapsedTime", Value::Float64(elapsed));
            record.insert("mSector", Value::Int8(sector));
            record.insert("mTotalLaps", Value::Int16(laps));
            record.insert("mFlags", Value::UInt32(flags));
            record.insert("mRange", Value::Float32(0.0));
            record.insert("mCounter", Value::UInt64(0));
            record.insert("mName", Value::Text(name));
            record.insert("mPos", Value::Struct(pos_record));
            record.insert("mTemps", Value::Array(temps.iter().copied().map(Value::Float64).collect()));
            record.insert("mExpansion", Value::Bytes(vec![0; 4]));

            let buf = encode(&record, &schema).unwrap();
            prop_assert_eq!(buf.len(), schema.size());
            prop_assert_eq!(decode(&buf, &schema).unwrap(), record);
        }
    }
}
