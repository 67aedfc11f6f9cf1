//! Decoded structure records and typed field extraction

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Value;
use crate::{Result, TelemetryError};

/// A decoded structure: field name to value.
///
/// Records are produced by [`crate::layout::decode`] and carry no layout
/// information of their own. Lookups are by name; nested structures are
/// [`Value::Struct`] and fixed repeats are [`Value::Array`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { fields: HashMap::with_capacity(capacity) }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Raw value of a direct field.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Raw value at a dotted path such as `mWheels[1].mTemperature[0]`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut record = self;
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            let value = match segment.split_once('[') {
                None => record.value(segment)?,
                Some((name, rest)) => {
                    let index: usize = rest.strip_suffix(']')?.parse().ok()?;
                    record.value(name)?.as_array()?.get(index)?
                }
            };

            if segments.peek().is_none() {
                return Some(value);
            }
            record = value.as_record()?;
        }

        None
    }

    /// Typed lookup of a direct field.
    ///
    /// Absent fields yield [`TelemetryError::MissingField`]; present fields of an
    /// incompatible type yield [`TelemetryError::TypeConversion`].
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.value(name).ok_or_else(|| TelemetryError::missing_field(name))?;
        T::from_value(value)
    }

    /// Typed lookup at a dotted path.
    pub fn get_path<T: FromValue>(&self, path: &str) -> Result<T> {
        let value = self.lookup(path).ok_or_else(|| TelemetryError::missing_field(path))?;
        T::from_value(value)
    }

    /// Nested record of a direct field.
    pub fn record(&self, name: &str) -> Result<&Record> {
        match self.value(name) {
            Some(Value::Struct(record)) => Ok(record),
            Some(other) => Err(TelemetryError::TypeConversion {
                details: format!("Expected Struct for '{}', got {}", name, other.kind_name()),
            }),
            None => Err(TelemetryError::missing_field(name)),
        }
    }

    /// Elements of a repeated direct field.
    pub fn array(&self, name: &str) -> Result<&[Value]> {
        match self.value(name) {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(TelemetryError::TypeConversion {
                details: format!("Expected Array for '{}', got {}", name, other.kind_name()),
            }),
            None => Err(TelemetryError::missing_field(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Types that can be extracted from a decoded [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(expected: &str, value: &Value) -> TelemetryError {
    TelemetryError::TypeConversion {
        details: format!("Expected {}, got {}", expected, value.kind_name()),
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch("numeric", value))
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self> {
        match *value {
            Value::Float32(v) => Ok(v),
            Value::Float64(v) => Ok(v as f32),
            _ => value.as_i64().map(|v| v as f32).ok_or_else(|| mismatch("Float32", value)),
        }
    }
}

macro_rules! impl_integral {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self> {
                    value
                        .as_i64()
                        .and_then(|v| <$ty>::try_from(v).ok())
                        .ok_or_else(|| mismatch(stringify!($ty), value))
                }
            }
        )*
    };
}

impl_integral!(i8, i16, i32, i64, u8, u16, u32);

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_i64().map(|v| v != 0).ok_or_else(|| mismatch("bool", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(text) => Ok(text.clone()),
            _ => Err(mismatch("Text", value)),
        }
    }
}

impl FromValue for Record {
    fn from_value(value: &Value) -> Result<Self> {
        value.as_record().cloned().ok_or_else(|| mismatch("Struct", value))
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => items.iter().map(T::from_value).collect(),
            Value::Bytes(bytes) => bytes.iter().map(|b| T::from_value(&Value::UInt8(*b))).collect(),
            _ => Err(mismatch("Array", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheel(pressure: f64, temps: [f64; 3]) -> Value {
        let mut record = Record::new();
        record.insert("mPressure", Value::Float64(pressure));
        record.insert(
            "mTemperature",
            Value::Array(temps.iter().copied().map(Value::Float64).collect()),
        );
        Value::Struct(record)
    }

    fn telemetry() -> Record {
        let mut record = Record::new();
        record.insert("mID", Value::Int32(42));
        record.insert("mGear", Value::Int32(-1));
        record.insert("mSector", Value::Int8(2));
        record.insert("mVehicleName", Value::Text("Oreca 07".into()));
        record.insert("mWheels", Value::Array(vec![wheel(140.0, [350.0, 351.0, 352.0])]));
        record
    }

    #[test]
    fn typed_lookup_by_name() {
        let record = telemetry();
        assert_eq!(record.get::<i32>("mID").unwrap(), 42);
        assert_eq!(record.get::<i32>("mGear").unwrap(), -1);
        assert_eq!(record.get::<i64>("mSector").unwrap(), 2);
        assert_eq!(record.get::<f64>("mSector").unwrap(), 2.0);
        assert_eq!(record.get::<String>("mVehicleName").unwrap(), "Oreca 07");
    }

    #[test]
    fn absent_fields_are_missing_field_errors() {
        let record = telemetry();
        let err = record.get::<f64>("mEngineRPM").unwrap_err();
        assert!(matches!(err, TelemetryError::MissingField { ref field } if field == "mEngineRPM"));

        let err = record.get_path::<f64>("mWheels[3].mPressure").unwrap_err();
        assert!(matches!(err, TelemetryError::MissingField { .. }));
    }

    #[test]
    fn incompatible_types_are_conversion_errors() {
        let record = telemetry();
        assert!(matches!(
            record.get::<f64>("mVehicleName"),
            Err(TelemetryError::TypeConversion { .. })
        ));
        assert!(matches!(record.get::<u8>("mGear"), Err(TelemetryError::TypeConversion { .. })));
        assert!(matches!(record.record("mID"), Err(TelemetryError::TypeConversion { .. })));
    }

    #[test]
    fn paths_index_into_nested_arrays() {
        let record = telemetry();
        assert_eq!(record.get_path::<f64>("mWheels[0].mPressure").unwrap(), 140.0);
        assert_eq!(record.get_path::<f64>("mWheels[0].mTemperature[2]").unwrap(), 352.0);

        let temps: Vec<f64> = record.get_path("mWheels[0].mTemperature").unwrap();
        assert_eq!(temps, vec![350.0, 351.0, 352.0]);

        assert!(record.lookup("mID.x").is_none());
        assert!(record.lookup("mWheels[x]").is_none());
    }
}
