//! Fetching and binding a single column.

use std::fmt;
use std::sync::Arc;

use super::{ColumnType, Converter, IdentityConverter, ResultRow, Statement};
use crate::attribute::ValueType;
use crate::error::Result;
use crate::value::Value;

/// Fetches and binds the values of one column.
#[derive(Clone)]
pub struct ColumnCodec {
    column_type: ColumnType,
    converter: Arc<dyn Converter>,
}

impl ColumnCodec {
    pub fn new(column_type: ColumnType, converter: Arc<dyn Converter>) -> Self {
        Self {
            column_type,
            converter,
        }
    }

    /// A codec storing values of `value_type` as they are.
    pub fn for_type(value_type: &ValueType) -> Self {
        Self::new(
            ColumnType::for_value_type(value_type),
            Arc::new(IdentityConverter),
        )
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    /// Convert an attribute value to its column value.
    pub fn to_column(&self, value: &Value) -> Result<Value> {
        if value.is_null() && !self.converter.handles_null() {
            return Ok(Value::Null);
        }
        self.converter.to_column(value)
    }

    /// Convert a column value to its attribute value.
    ///
    /// Decimals come back with trailing zeros stripped.
    pub fn from_column(&self, column_value: Value) -> Result<Value> {
        if column_value.is_null() && !self.converter.handles_null() {
            return Ok(Value::Null);
        }
        Ok(match self.converter.from_column(column_value)? {
            Value::Decimal(d) => Value::Decimal(d.normalize()),
            value => value,
        })
    }

    /// Read the column at `index` of `row` as an attribute value.
    pub fn fetch(&self, row: &dyn ResultRow, index: usize) -> Result<Value> {
        let column_value = fetch_column(self.column_type, row, index)?;
        self.from_column(column_value)
    }

    /// Bind `value` to the parameter at `index` of `statement`.
    pub fn bind(&self, statement: &mut dyn Statement, index: usize, value: &Value) -> Result<()> {
        let column_value = self.to_column(value)?;
        if column_value.is_null() {
            statement.set_null(index, self.column_type)
        } else {
            statement.set(index, &column_value, self.column_type)
        }
    }
}

impl fmt::Debug for ColumnCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnCodec")
            .field("column_type", &self.column_type)
            .finish_non_exhaustive()
    }
}

// Primitive getters return zero for SQL NULL, so zero is only trusted when
// the row says the value was not null.
fn fetch_column(column_type: ColumnType, row: &dyn ResultRow, index: usize) -> Result<Value> {
    Ok(match column_type {
        ColumnType::SmallInt => {
            let value = row.get_short(index)?;
            if value == 0 && row.was_null() {
                Value::Null
            } else {
                Value::Short(value)
            }
        }
        ColumnType::Integer => {
            let value = row.get_int(index)?;
            if value == 0 && row.was_null() {
                Value::Null
            } else {
                Value::Int(value)
            }
        }
        ColumnType::BigInt => {
            let value = row.get_long(index)?;
            if value == 0 && row.was_null() {
                Value::Null
            } else {
                Value::Long(value)
            }
        }
        ColumnType::Double => {
            let value = row.get_double(index)?;
            if value == 0.0 && row.was_null() {
                Value::Null
            } else {
                Value::Double(value)
            }
        }
        ColumnType::Boolean => {
            let value = row.get_boolean(index)?;
            if !value && row.was_null() {
                Value::Null
            } else {
                Value::Bool(value)
            }
        }
        ColumnType::Decimal => row.get_decimal(index)?.map(|d| d.normalize()).into(),
        ColumnType::Varchar => row.get_string(index)?.into(),
        ColumnType::Char => row
            .get_string(index)?
            .and_then(|s| s.chars().next())
            .into(),
        ColumnType::Date => row.get_date(index)?.into(),
        ColumnType::Time | ColumnType::TimeWithTimezone => row.get_time(index)?.into(),
        ColumnType::Timestamp => row.get_date_time(index)?.into(),
        ColumnType::TimestampWithTimezone => row.get_offset_date_time(index)?.into(),
        ColumnType::Blob => row.get_bytes(index)?.into(),
        ColumnType::Other => row.get_object(index)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BooleanConverter;
    use crate::error::Error;
    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
    use rust_decimal::Decimal;
    use std::cell::Cell;
    use std::str::FromStr;

    /// A single row where every column holds `value`, NULL when `Value::Null`.
    struct SingleValueRow {
        value: Value,
        was_null: Cell<bool>,
    }

    impl SingleValueRow {
        fn new(value: Value) -> Self {
            Self {
                value,
                was_null: Cell::new(false),
            }
        }

        fn read(&self) -> &Value {
            self.was_null.set(self.value.is_null());
            &self.value
        }
    }

    impl ResultRow for SingleValueRow {
        fn get_short(&self, _: usize) -> Result<i16> {
            Ok(match self.read() {
                Value::Short(v) => *v,
                _ => 0,
            })
        }
        fn get_int(&self, _: usize) -> Result<i32> {
            Ok(match self.read() {
                Value::Int(v) => *v,
                _ => 0,
            })
        }
        fn get_long(&self, _: usize) -> Result<i64> {
            Ok(self.read().as_i64().unwrap_or(0))
        }
        fn get_double(&self, _: usize) -> Result<f64> {
            Ok(self.read().as_f64().unwrap_or(0.0))
        }
        fn get_boolean(&self, _: usize) -> Result<bool> {
            Ok(self.read().as_bool().unwrap_or(false))
        }
        fn get_decimal(&self, _: usize) -> Result<Option<Decimal>> {
            Ok(self.read().as_decimal())
        }
        fn get_string(&self, _: usize) -> Result<Option<String>> {
            Ok(match self.read() {
                Value::Null => None,
                other => Some(other.to_string()),
            })
        }
        fn get_bytes(&self, _: usize) -> Result<Option<Vec<u8>>> {
            Ok(self.read().as_bytes().map(<[u8]>::to_vec))
        }
        fn get_date(&self, _: usize) -> Result<Option<NaiveDate>> {
            Ok(match self.read() {
                Value::Date(d) => Some(*d),
                _ => None,
            })
        }
        fn get_time(&self, _: usize) -> Result<Option<NaiveTime>> {
            Ok(match self.read() {
                Value::Time(t) => Some(*t),
                _ => None,
            })
        }
        fn get_date_time(&self, _: usize) -> Result<Option<NaiveDateTime>> {
            Ok(match self.read() {
                Value::DateTime(dt) => Some(*dt),
                _ => None,
            })
        }
        fn get_offset_date_time(&self, _: usize) -> Result<Option<DateTime<FixedOffset>>> {
            Ok(match self.read() {
                Value::OffsetDateTime(dt) => Some(*dt),
                _ => None,
            })
        }
        fn get_object(&self, _: usize) -> Result<Value> {
            Ok(self.read().clone())
        }
        fn was_null(&self) -> bool {
            self.was_null.get()
        }
    }

    #[derive(Default)]
    struct RecordingStatement {
        bound: Vec<(usize, Value, ColumnType)>,
    }

    impl Statement for RecordingStatement {
        fn set(&mut self, index: usize, value: &Value, column_type: ColumnType) -> Result<()> {
            self.bound.push((index, value.clone(), column_type));
            Ok(())
        }

        fn set_null(&mut self, index: usize, column_type: ColumnType) -> Result<()> {
            self.bound.push((index, Value::Null, column_type));
            Ok(())
        }
    }

    #[test]
    fn test_zero_and_null_are_distinguished() {
        let codec = ColumnCodec::for_type(&ValueType::Integer);
        assert_eq!(
            codec.fetch(&SingleValueRow::new(Value::Int(0)), 0).unwrap(),
            Value::Int(0)
        );
        assert_eq!(
            codec.fetch(&SingleValueRow::new(Value::Null), 0).unwrap(),
            Value::Null
        );

        let codec = ColumnCodec::for_type(&ValueType::Double);
        assert_eq!(
            codec.fetch(&SingleValueRow::new(Value::Null), 0).unwrap(),
            Value::Null
        );

        let codec = ColumnCodec::for_type(&ValueType::Boolean);
        assert_eq!(
            codec.fetch(&SingleValueRow::new(Value::Bool(false)), 0).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            codec.fetch(&SingleValueRow::new(Value::Null), 0).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_decimal_is_normalized() {
        let codec = ColumnCodec::for_type(&ValueType::Decimal);
        let stored = Decimal::from_str("12.3400").unwrap();
        let fetched = codec
            .fetch(&SingleValueRow::new(Value::Decimal(stored)), 0)
            .unwrap();
        assert_eq!(fetched.as_decimal().unwrap().to_string(), "12.34");
    }

    #[test]
    fn test_char_column() {
        let codec = ColumnCodec::for_type(&ValueType::Character);
        assert_eq!(
            codec.fetch(&SingleValueRow::new(Value::from("x")), 0).unwrap(),
            Value::Char('x')
        );
    }

    #[test]
    fn test_boolean_stored_as_integer() {
        let codec = ColumnCodec::new(
            ColumnType::Integer,
            Arc::new(BooleanConverter::new(1, 0).unwrap()),
        );
        assert_eq!(
            codec.fetch(&SingleValueRow::new(Value::Int(1)), 0).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            codec.fetch(&SingleValueRow::new(Value::Int(7)), 0).unwrap(),
            Value::Null
        );

        let mut statement = RecordingStatement::default();
        codec.bind(&mut statement, 2, &Value::Bool(false)).unwrap();
        codec.bind(&mut statement, 3, &Value::Null).unwrap();
        assert_eq!(
            statement.bound,
            vec![
                (2, Value::Int(0), ColumnType::Integer),
                (3, Value::Null, ColumnType::Integer),
            ]
        );
    }

    struct NullAsEmpty;

    impl Converter for NullAsEmpty {
        fn to_column(&self, value: &Value) -> Result<Value> {
            Ok(match value {
                Value::Null => Value::from(""),
                other => other.clone(),
            })
        }

        fn from_column(&self, column_value: Value) -> Result<Value> {
            Ok(match column_value {
                Value::String(s) if s.is_empty() => Value::Null,
                other => other,
            })
        }

        fn handles_null(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_converter_handling_nulls() {
        let codec = ColumnCodec::new(ColumnType::Varchar, Arc::new(NullAsEmpty));
        assert_eq!(codec.to_column(&Value::Null).unwrap(), Value::from(""));
        assert_eq!(codec.from_column(Value::from("")).unwrap(), Value::Null);

        let plain = ColumnCodec::for_type(&ValueType::String);
        assert_eq!(plain.to_column(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_converter_errors_propagate() {
        let codec = ColumnCodec::new(
            ColumnType::Varchar,
            Arc::new(BooleanConverter::new("Y", "N").unwrap()),
        );
        assert!(matches!(
            codec.to_column(&Value::from("Y")),
            Err(Error::Codec(_))
        ));
    }
}
