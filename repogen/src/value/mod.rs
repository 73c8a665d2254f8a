//! Values bound to statements and read back from rows.
//!
//! Generated code converts entity fields with [`ToValue`] and decodes row
//! columns with [`FromValue`]. Field types marked as custom scanners
//! implement both traits themselves.

mod row;

pub use row::{FromRow, Row};

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

/// A dynamically typed SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    /// Unsigned integers above `i64::MAX`.
    U64(u64),
    F64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) | Value::U64(_) => "integer",
            Value::F64(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
        }
    }

    /// Encode as JSON, used by drivers without a native array type.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::I64(v) => serde_json::Value::from(*v),
            Value::U64(v) => serde_json::Value::from(*v),
            Value::F64(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(v) => serde_json::Value::String(v.clone()),
            Value::Bytes(v) => serde_json::Value::from(v.clone()),
            Value::Timestamp(v) => serde_json::Value::String(v.to_rfc3339()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }

    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Bool(v),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(v), _) => Value::I64(v),
                (None, Some(v)) => Value::U64(v),
                (None, None) => Value::F64(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(v) => Value::Text(v),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            other @ serde_json::Value::Object(_) => Value::Text(other.to_string()),
        }
    }
}

/// Conversion of a Rust value into a bound [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;

    /// Value of a `Vec<Self>`. Element types with a dedicated SQL type, like
    /// `u8` for bytes, override this.
    #[doc(hidden)]
    fn vec_to_value(items: &[Self]) -> Value
    where
        Self: Sized,
    {
        Value::Array(items.iter().map(ToValue::to_value).collect())
    }
}

/// Conversion of a column [`Value`] into a Rust value.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;

    #[doc(hidden)]
    fn vec_from_value(value: Value) -> Result<Vec<Self>> {
        array_from_value(value)
    }
}

/// Explicit array wrapper for dialects with a native array parameter type.
///
/// Binds the slice as a single array parameter instead of one parameter per
/// element.
#[derive(Debug, Clone, Copy)]
pub struct Array<'a, T>(pub &'a [T]);

impl<T: ToValue> ToValue for Array<'_, T> {
    fn to_value(&self) -> Value {
        Value::Array(self.0.iter().map(ToValue::to_value).collect())
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            // SQLite has no boolean storage class
            Value::I64(v) => Ok(v != 0),
            other => Err(mismatch("bool", &other)),
        }
    }
}

macro_rules! integer_value {
    ($($ty:ty),*) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::I64(i64::from(*self))
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    integer_from_value(value, stringify!($ty))
                }
            }
        )*
    };
}

integer_value!(i8, i16, i32, i64, u16, u32);

impl ToValue for isize {
    fn to_value(&self) -> Value {
        // isize is at most 64 bits wide on every supported target
        Value::I64(*self as i64)
    }
}

impl FromValue for isize {
    fn from_value(value: Value) -> Result<Self> {
        integer_from_value(value, "isize")
    }
}

/// Values above `i64::MAX` become [`Value::U64`] instead of wrapping.
impl ToValue for u64 {
    fn to_value(&self) -> Value {
        match i64::try_from(*self) {
            Ok(v) => Value::I64(v),
            Err(_) => Value::U64(*self),
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: Value) -> Result<Self> {
        integer_from_value(value, "u64")
    }
}

impl ToValue for usize {
    fn to_value(&self) -> Value {
        // usize is at most 64 bits wide on every supported target
        (*self as u64).to_value()
    }
}

impl FromValue for usize {
    fn from_value(value: Value) -> Result<Self> {
        integer_from_value(value, "usize")
    }
}

/// `Vec<u8>` is stored as bytes, not as an array of integers.
impl ToValue for u8 {
    fn to_value(&self) -> Value {
        Value::I64(i64::from(*self))
    }

    fn vec_to_value(items: &[Self]) -> Value {
        Value::Bytes(items.to_vec())
    }
}

impl FromValue for u8 {
    fn from_value(value: Value) -> Result<Self> {
        integer_from_value(value, "u8")
    }

    fn vec_from_value(value: Value) -> Result<Vec<Self>> {
        match value {
            Value::Bytes(bytes) => Ok(bytes),
            other => array_from_value(other),
        }
    }
}

fn integer_from_value<T>(value: Value, target: &str) -> Result<T>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    let converted = match value {
        Value::I64(v) => <T as TryFrom<i64>>::try_from(v).map_err(|_| v.to_string()),
        Value::U64(v) => <T as TryFrom<u64>>::try_from(v).map_err(|_| v.to_string()),
        other => return Err(mismatch(target, &other)),
    };
    converted.map_err(|v| Error::conversion(format!("integer {v} out of range for {target}")))
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::F64(*self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::F64(v) => Ok(v),
            Value::I64(v) => Ok(v as f64),
            Value::U64(v) => Ok(v as f64),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::F64(f64::from(*self))
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::Text(v) => DateTime::parse_from_rfc3339(&v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::conversion(format!("invalid timestamp {v:?}: {e}"))),
            other => Err(mismatch("DateTime<Utc>", &other)),
        }
    }
}

impl ToValue for uuid::Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(v) => v
                .parse()
                .map_err(|e| Error::conversion(format!("invalid uuid {v:?}: {e}"))),
            other => Err(mismatch("Uuid", &other)),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        T::vec_to_value(self)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        T::vec_from_value(value)
    }
}

fn array_from_value<T: FromValue>(value: Value) -> Result<Vec<T>> {
    match value {
        Value::Array(items) => items.into_iter().map(T::from_value).collect(),
        // arrays stored as JSON text
        Value::Text(text) => {
            let json: serde_json::Value = serde_json::from_str(&text)?;
            match Value::from_json(json) {
                Value::Array(items) => items.into_iter().map(T::from_value).collect(),
                other => Err(mismatch("Vec", &other)),
            }
        }
        other => Err(mismatch("Vec", &other)),
    }
}

fn mismatch(target: &str, value: &Value) -> Error {
    Error::conversion(format!("cannot decode {} into {target}", value.kind()))
}
