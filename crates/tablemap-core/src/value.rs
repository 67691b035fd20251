//! Dynamic SQL values and conversions into Rust field types.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::ConversionError;
use crate::types::DataKind;

/// Text layouts accepted when reading a timestamp stored as text.
const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Layout used whenever a timestamp is written as text, with millisecond
/// precision. Reading accepts any fraction.
pub const TIMESTAMP_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A single column value or query parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL NULL.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Timestamp without zone.
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Variant name used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
        }
    }

    /// Whether this is SQL NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text payload.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of the value, when it has one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Uint(u) => i64::try_from(*u).ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Hashable key used to correlate owner and related rows.
    ///
    /// Integers of either signedness and integral floats collapse onto the
    /// same key so that an `i64` foreign key matches a `u64` primary key.
    /// NULL has no key.
    #[must_use]
    pub fn relation_key(&self) -> Option<RelationKey> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(RelationKey::Integer(i128::from(*b))),
            Value::Int(i) => Some(RelationKey::Integer(i128::from(*i))),
            Value::Uint(u) => Some(RelationKey::Integer(i128::from(*u))),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                Some(RelationKey::Integer(*f as i128))
            }
            Value::Float(f) => Some(RelationKey::Text(f.to_string())),
            Value::Text(s) => Some(RelationKey::Text(s.clone())),
            Value::Bytes(b) => Some(RelationKey::Bytes(b.clone())),
            // Lossless, so a timestamp key equals the same instant stored as text.
            Value::Timestamp(ts) => Some(RelationKey::Text(
                ts.format(TIMESTAMP_FORMATS[0]).to_string(),
            )),
        }
    }
}

/// Normalized, hashable form of a key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationKey {
    /// Any integer.
    Integer(i128),
    /// Text (and non-integral numbers rendered as text).
    Text(String),
    /// Binary keys.
    Bytes(Vec<u8>),
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    f32 => Float,
    f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
    NaiveDateTime => Timestamp,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v.naive_utc())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A Rust type that can be stored in a mapped column.
///
/// `KIND` and `SIZE` feed the field descriptor; `SIZE` is the declared bit
/// width (zero when the width is meaningless for the type).
pub trait FieldValue: Sized + Default + PartialEq + Send + Sync + 'static {
    /// Category of this type.
    const KIND: DataKind;
    /// Declared bit width.
    const SIZE: u16 = 0;

    /// Convert into a parameter value.
    fn to_value(&self) -> Value;

    /// Convert a column value into this type.
    fn from_value(value: Value) -> Result<Self, ConversionError>;

    /// Whether this is the type's zero value.
    fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

fn parse_text<T: std::str::FromStr>(s: &str, expected: &'static str) -> Result<T, ConversionError>
where
    T::Err: std::fmt::Display,
{
    s.trim()
        .parse()
        .map_err(|e: T::Err| ConversionError::new(expected, "text").with_detail(e.to_string()))
}

macro_rules! impl_int_field {
    ($($ty:ty => $kind:ident, $bits:expr);* $(;)?) => {
        $(
            impl FieldValue for $ty {
                const KIND: DataKind = DataKind::$kind;
                const SIZE: u16 = $bits;

                fn to_value(&self) -> Value {
                    Value::from(*self)
                }

                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    let name = stringify!($ty);
                    let overflow =
                        |found| ConversionError::new(name, found).with_detail("out of range");
                    match value {
                        Value::Int(i) => <$ty>::try_from(i).map_err(|_| overflow("int")),
                        Value::Uint(u) => <$ty>::try_from(u).map_err(|_| overflow("uint")),
                        Value::Bool(b) => Ok(<$ty>::from(b)),
                        Value::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                            <$ty>::try_from(f as i128).map_err(|_| overflow("float"))
                        }
                        Value::Text(s) => parse_text(&s, name),
                        other => Err(ConversionError::new(name, other.type_name())),
                    }
                }
            }
        )*
    };
}

impl_int_field! {
    i8 => Int, 8;
    i16 => Int, 16;
    i32 => Int, 32;
    i64 => Int, 64;
    u8 => Uint, 8;
    u16 => Uint, 16;
    u32 => Uint, 32;
    u64 => Uint, 64;
}

impl FieldValue for f64 {
    const KIND: DataKind = DataKind::Float;
    const SIZE: u16 = 64;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::Uint(u) => Ok(u as f64),
            Value::Text(s) => parse_text(&s, "f64"),
            other => Err(ConversionError::new("f64", other.type_name())),
        }
    }
}

impl FieldValue for f32 {
    const KIND: DataKind = DataKind::Float;
    const SIZE: u16 = 32;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        f64::from_value(value)
            .map(|f| f as f32)
            .map_err(|e| ConversionError { expected: "f32", ..e })
    }
}

impl FieldValue for bool {
    const KIND: DataKind = DataKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            Value::Uint(u) => Ok(u != 0),
            Value::Text(s) => match s.trim() {
                "1" | "t" | "true" | "TRUE" => Ok(true),
                "0" | "f" | "false" | "FALSE" => Ok(false),
                other => Err(ConversionError::new("bool", "text").with_detail(other)),
            },
            other => Err(ConversionError::new("bool", other.type_name())),
        }
    }
}

impl FieldValue for String {
    const KIND: DataKind = DataKind::String;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Bytes(b) => String::from_utf8(b)
                .map_err(|e| ConversionError::new("String", "bytes").with_detail(e.to_string())),
            Value::Int(i) => Ok(i.to_string()),
            Value::Uint(u) => Ok(u.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Timestamp(ts) => Ok(ts.format(TIMESTAMP_TEXT_FORMAT).to_string()),
            Value::Null => Err(ConversionError::new("String", "null")),
        }
    }
}

impl FieldValue for Vec<u8> {
    const KIND: DataKind = DataKind::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(ConversionError::new("Vec<u8>", other.type_name())),
        }
    }
}

/// Parse a timestamp stored as text.
///
/// Accepts full timestamps (space or `T` separated, optional fraction and
/// offset) and bare dates, which map to midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl FieldValue for NaiveDateTime {
    const KIND: DataKind = DataKind::Time;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            Value::Text(s) => parse_timestamp(&s).ok_or_else(|| {
                ConversionError::new("NaiveDateTime", "text").with_detail(format!("`{s}`"))
            }),
            Value::Int(secs) => DateTime::from_timestamp(secs, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| ConversionError::new("NaiveDateTime", "int")),
            other => Err(ConversionError::new("NaiveDateTime", other.type_name())),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    const KIND: DataKind = DataKind::Time;

    fn to_value(&self) -> Value {
        Value::Timestamp(self.naive_utc())
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        NaiveDateTime::from_value(value)
            .map(|ts| ts.and_utc())
            .map_err(|e| ConversionError {
                expected: "DateTime<Utc>",
                ..e
            })
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: DataKind = T::KIND;
    const SIZE: u16 = T::SIZE;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
