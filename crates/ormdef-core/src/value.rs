//! Runtime value type held by entities.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::attribute::ValueType;
use crate::entity::Entity;
use crate::error::{Error, Result};

/// A runtime attribute value.
///
/// Every attribute value of an [`Entity`] is one of these variants; the
/// variant used for a given attribute is dictated by its [`ValueType`].
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Null value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// 16-bit signed integer.
    Short(i16),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 64-bit floating point.
    Double(f64),
    /// Arbitrary precision decimal.
    Decimal(Decimal),
    /// Single character.
    Char(char),
    /// UTF-8 string.
    String(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Date and time without offset.
    DateTime(NaiveDateTime),
    /// Date and time with a UTC offset.
    OffsetDateTime(DateTime<FixedOffset>),
    /// Binary data.
    Bytes(Vec<u8>),
    /// A referenced entity.
    Entity(Arc<Entity>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64, widening smaller integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Short(i) => Some(*i as i64),
            Value::Int(i) => Some(*i as i64),
            Value::Long(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get any numeric value as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Short(i) => Some(*i as f64),
            Value::Int(i) => Some(*i as f64),
            Value::Long(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Try to get as decimal.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes reference.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as a referenced entity.
    pub fn as_entity(&self) -> Option<&Arc<Entity>> {
        match self {
            Value::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::OffsetDateTime(_) => "offset datetime",
            Value::Bytes(_) => "bytes",
            Value::Entity(_) => "entity",
        }
    }

    /// Natural ordering between two values of the same variant.
    ///
    /// Null sorts before everything else. Returns `None` for values that have
    /// no natural ordering (mismatched variants, bytes, NaN).
    pub fn natural_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Short(a), Value::Short(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::OffsetDateTime(a), Value::OffsetDateTime(b)) => Some(a.cmp(b)),
            (Value::Entity(a), Value::Entity(b)) => a.key().natural_cmp(b.key()),
            _ => None,
        }
    }

    /// Convert a numeric value to the representation used by `value_type`.
    ///
    /// Storage collaborators frequently hand back a wider integer than the
    /// attribute declares (a sequence returning a long for an integer key);
    /// this narrows it, failing when the value does not fit.
    pub fn convert(self, value_type: &ValueType) -> Result<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }
        let converted = match value_type {
            ValueType::Short => self
                .as_i64()
                .and_then(|i| i16::try_from(i).ok())
                .map(Value::Short),
            ValueType::Integer => self
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(Value::Int),
            ValueType::Long => self.as_i64().map(Value::Long),
            ValueType::Double => self.as_f64().map(Value::Double),
            ValueType::Decimal => match &self {
                Value::Decimal(d) => Some(Value::Decimal(*d)),
                Value::Double(d) => Decimal::from_f64(*d).map(Value::Decimal),
                other => other.as_i64().map(|i| Value::Decimal(Decimal::from(i))),
            },
            _ => None,
        };

        match converted {
            Some(value) => Ok(value),
            None if value_type.accepts(&self) => Ok(self),
            None => Err(Error::InvalidData(format!(
                "{} can not be represented as {}",
                self, value_type
            ))),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::OffsetDateTime(a), Value::OffsetDateTime(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Entity(a), Value::Entity(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Short(i) => write!(f, "{}", i),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Char(c) => write!(f, "{}", c),
            Value::String(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::OffsetDateTime(dt) => write!(f, "{}", dt),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Entity(e) => write!(f, "{}", e),
        }
    }
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::OffsetDateTime(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Entity> for Value {
    fn from(v: Entity) -> Self {
        Value::Entity(Arc::new(v))
    }
}

impl From<Arc<Entity>> for Value {
    fn from(v: Arc<Entity>) -> Self {
        Value::Entity(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
