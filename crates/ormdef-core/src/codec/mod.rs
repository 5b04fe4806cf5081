//! Column codecs: moving attribute values in and out of storage.
//!
//! Storage access itself is provided by the host through the [`ResultRow`]
//! and [`Statement`] traits. A [`ColumnCodec`] knows the [`ColumnType`] of
//! one column and the [`Converter`] between the attribute value and the
//! stored value, and drives both traits accordingly.

mod column;
mod converter;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::attribute::ValueType;
use crate::error::{Error, Result};
use crate::value::Value;

pub use column::ColumnCodec;
pub use converter::{BooleanConverter, Converter, IdentityConverter};

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    Double,
    Decimal,
    Date,
    Time,
    Timestamp,
    TimeWithTimezone,
    TimestampWithTimezone,
    Varchar,
    Char,
    Boolean,
    Blob,
    Other,
}

impl ColumnType {
    /// The default storage type for values of `value_type`.
    pub fn for_value_type(value_type: &ValueType) -> Self {
        match value_type {
            ValueType::Short => ColumnType::SmallInt,
            ValueType::Integer => ColumnType::Integer,
            ValueType::Long => ColumnType::BigInt,
            ValueType::Double => ColumnType::Double,
            ValueType::Decimal => ColumnType::Decimal,
            ValueType::Boolean => ColumnType::Boolean,
            ValueType::Character => ColumnType::Char,
            ValueType::String | ValueType::Enum { .. } => ColumnType::Varchar,
            ValueType::Date => ColumnType::Date,
            ValueType::Time => ColumnType::Time,
            ValueType::DateTime => ColumnType::Timestamp,
            ValueType::OffsetDateTime => ColumnType::TimestampWithTimezone,
            ValueType::Bytes => ColumnType::Blob,
            ValueType::Entity(_) => ColumnType::Other,
        }
    }

    /// The JDBC style SQL type code.
    pub fn sql_type(self) -> i32 {
        match self {
            ColumnType::SmallInt => 5,
            ColumnType::Integer => 4,
            ColumnType::BigInt => -5,
            ColumnType::Double => 8,
            ColumnType::Decimal => 3,
            ColumnType::Date => 91,
            ColumnType::Time => 92,
            ColumnType::Timestamp => 93,
            ColumnType::TimeWithTimezone => 2013,
            ColumnType::TimestampWithTimezone => 2014,
            ColumnType::Varchar => 12,
            ColumnType::Char => 1,
            ColumnType::Boolean => 16,
            ColumnType::Blob => 2004,
            ColumnType::Other => 1111,
        }
    }
}

impl TryFrom<i32> for ColumnType {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            5 => Ok(ColumnType::SmallInt),
            4 => Ok(ColumnType::Integer),
            -5 => Ok(ColumnType::BigInt),
            8 => Ok(ColumnType::Double),
            3 => Ok(ColumnType::Decimal),
            91 => Ok(ColumnType::Date),
            92 => Ok(ColumnType::Time),
            93 => Ok(ColumnType::Timestamp),
            2013 => Ok(ColumnType::TimeWithTimezone),
            2014 => Ok(ColumnType::TimestampWithTimezone),
            12 => Ok(ColumnType::Varchar),
            1 => Ok(ColumnType::Char),
            16 => Ok(ColumnType::Boolean),
            2004 => Ok(ColumnType::Blob),
            1111 => Ok(ColumnType::Other),
            _ => Err(Error::InvalidData(format!("Unknown SQL type: {}", value))),
        }
    }
}

/// A row of a query result, read by zero based column index.
///
/// Primitive getters return zero/false for SQL NULL; [`ResultRow::was_null`]
/// reports whether the last value read was NULL.
pub trait ResultRow {
    fn get_short(&self, index: usize) -> Result<i16>;
    fn get_int(&self, index: usize) -> Result<i32>;
    fn get_long(&self, index: usize) -> Result<i64>;
    fn get_double(&self, index: usize) -> Result<f64>;
    fn get_boolean(&self, index: usize) -> Result<bool>;
    fn get_decimal(&self, index: usize) -> Result<Option<Decimal>>;
    fn get_string(&self, index: usize) -> Result<Option<String>>;
    fn get_bytes(&self, index: usize) -> Result<Option<Vec<u8>>>;
    fn get_date(&self, index: usize) -> Result<Option<NaiveDate>>;
    fn get_time(&self, index: usize) -> Result<Option<NaiveTime>>;
    fn get_date_time(&self, index: usize) -> Result<Option<NaiveDateTime>>;
    fn get_offset_date_time(&self, index: usize) -> Result<Option<DateTime<FixedOffset>>>;
    /// Read a column of a type with no dedicated getter.
    fn get_object(&self, index: usize) -> Result<Value>;
    /// Whether the last value read was SQL NULL.
    fn was_null(&self) -> bool;
}

/// A statement with positional parameters, bound by zero based index.
pub trait Statement {
    fn set(&mut self, index: usize, value: &Value, column_type: ColumnType) -> Result<()>;
    fn set_null(&mut self, index: usize, column_type: ColumnType) -> Result<()>;
}
