//! Converters between attribute values and stored column values.

use std::fmt;

use crate::error::{Error, Result};
use crate::value::Value;

/// Converts an attribute value to its column representation and back.
pub trait Converter: Send + Sync {
    /// Convert an attribute value to the value stored in the column.
    fn to_column(&self, value: &Value) -> Result<Value>;

    /// Convert a stored column value to the attribute value.
    fn from_column(&self, column_value: Value) -> Result<Value>;

    /// Whether this converter receives nulls.
    ///
    /// When false, nulls map to null in both directions without calling
    /// the converter.
    fn handles_null(&self) -> bool {
        false
    }
}

/// Stores values as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityConverter;

impl Converter for IdentityConverter {
    fn to_column(&self, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }

    fn from_column(&self, column_value: Value) -> Result<Value> {
        Ok(column_value)
    }
}

/// Stores booleans using a pair of column values, e.g. `1`/`0` or `"Y"`/`"N"`.
///
/// Stored values matching neither representation read as null.
#[derive(Clone)]
pub struct BooleanConverter {
    true_value: Value,
    false_value: Value,
}

impl BooleanConverter {
    /// Fails if the two representations are equal.
    pub fn new(true_value: impl Into<Value>, false_value: impl Into<Value>) -> Result<Self> {
        let true_value = true_value.into();
        let false_value = false_value.into();
        if true_value == false_value {
            return Err(Error::InvalidArgument(format!(
                "true and false values must differ, both are '{}'",
                true_value
            )));
        }
        Ok(Self {
            true_value,
            false_value,
        })
    }

    pub fn true_value(&self) -> &Value {
        &self.true_value
    }

    pub fn false_value(&self) -> &Value {
        &self.false_value
    }
}

impl Converter for BooleanConverter {
    fn to_column(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Bool(true) => Ok(self.true_value.clone()),
            Value::Bool(false) => Ok(self.false_value.clone()),
            other => Err(Error::Codec(format!(
                "expected a boolean, got {}",
                other.type_name()
            ))),
        }
    }

    fn from_column(&self, column_value: Value) -> Result<Value> {
        if column_value == self.true_value {
            Ok(Value::Bool(true))
        } else if column_value == self.false_value {
            Ok(Value::Bool(false))
        } else {
            Ok(Value::Null)
        }
    }
}

impl fmt::Debug for BooleanConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BooleanConverter")
            .field("true_value", &self.true_value)
            .field("false_value", &self.false_value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_converter() {
        let converter = BooleanConverter::new("Y", "N").unwrap();
        assert_eq!(
            converter.to_column(&Value::Bool(true)).unwrap(),
            Value::from("Y")
        );
        assert_eq!(
            converter.from_column(Value::from("N")).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            converter.from_column(Value::from("maybe")).unwrap(),
            Value::Null
        );
        assert!(converter.to_column(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_boolean_converter_rejects_equal_values() {
        assert!(matches!(
            BooleanConverter::new(1, 1),
            Err(Error::InvalidArgument(_))
        ));
    }
}
