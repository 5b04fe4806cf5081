//! Attribute value types.

use std::fmt;

use crate::value::Value;

/// The type of values an attribute holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    /// 64-bit floating point.
    Double,
    /// Arbitrary precision decimal.
    Decimal,
    /// Boolean value.
    Boolean,
    /// Single character.
    Character,
    /// UTF-8 string.
    String,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time without offset.
    DateTime,
    /// Date and time with a UTC offset.
    OffsetDateTime,
    /// Binary data.
    Bytes,
    /// An enumeration stored by variant name.
    Enum {
        /// Name of the enum type.
        name: String,
        /// Allowed variant values.
        variants: Vec<String>,
    },
    /// A reference to an entity of the named entity type.
    Entity(String),
}

impl ValueType {
    /// Create an enum value type.
    pub fn enum_type(name: impl Into<String>, variants: Vec<String>) -> Self {
        ValueType::Enum {
            name: name.into(),
            variants,
        }
    }

    /// Create an entity reference value type.
    pub fn entity(entity_type: impl Into<String>) -> Self {
        ValueType::Entity(entity_type.into())
    }

    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        self.is_integral() || self.is_decimal()
    }

    /// Check if this type is a whole number type.
    pub fn is_integral(&self) -> bool {
        matches!(self, ValueType::Short | ValueType::Integer | ValueType::Long)
    }

    /// Check if this type carries fraction digits.
    pub fn is_decimal(&self) -> bool {
        matches!(self, ValueType::Double | ValueType::Decimal)
    }

    /// Check if this type is a date and/or time type.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ValueType::Date | ValueType::Time | ValueType::DateTime | ValueType::OffsetDateTime
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(self, ValueType::String)
    }

    pub fn is_character(&self) -> bool {
        matches!(self, ValueType::Character)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, ValueType::Boolean)
    }

    pub fn is_bytes(&self) -> bool {
        matches!(self, ValueType::Bytes)
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, ValueType::Enum { .. })
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, ValueType::Entity(_))
    }

    /// Whether values of this type have a natural ordering.
    pub fn is_comparable(&self) -> bool {
        !matches!(self, ValueType::Bytes | ValueType::Entity(_))
    }

    /// Check whether `value` is a valid value of this type.
    ///
    /// Null is accepted by every type; nullability is a property of the
    /// attribute definition, not of the type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ValueType::Short, Value::Short(_))
            | (ValueType::Integer, Value::Int(_))
            | (ValueType::Long, Value::Long(_))
            | (ValueType::Double, Value::Double(_))
            | (ValueType::Decimal, Value::Decimal(_))
            | (ValueType::Boolean, Value::Bool(_))
            | (ValueType::Character, Value::Char(_))
            | (ValueType::String, Value::String(_))
            | (ValueType::Date, Value::Date(_))
            | (ValueType::Time, Value::Time(_))
            | (ValueType::DateTime, Value::DateTime(_))
            | (ValueType::OffsetDateTime, Value::OffsetDateTime(_))
            | (ValueType::Bytes, Value::Bytes(_)) => true,
            (ValueType::Enum { variants, .. }, Value::String(s)) => variants.contains(s),
            (ValueType::Entity(name), Value::Entity(entity)) => {
                entity.entity_type().name() == name
            }
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Short => write!(f, "short"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Long => write!(f, "long"),
            ValueType::Double => write!(f, "double"),
            ValueType::Decimal => write!(f, "decimal"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Character => write!(f, "character"),
            ValueType::String => write!(f, "string"),
            ValueType::Date => write!(f, "date"),
            ValueType::Time => write!(f, "time"),
            ValueType::DateTime => write!(f, "datetime"),
            ValueType::OffsetDateTime => write!(f, "offset datetime"),
            ValueType::Bytes => write!(f, "bytes"),
            ValueType::Enum { name, .. } => write!(f, "enum {}", name),
            ValueType::Entity(name) => write!(f, "entity {}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ValueType::Short.is_numeric());
        assert!(ValueType::Decimal.is_numeric());
        assert!(ValueType::Double.is_decimal());
        assert!(!ValueType::Long.is_decimal());
        assert!(ValueType::OffsetDateTime.is_temporal());
        assert!(!ValueType::String.is_temporal());
        assert!(!ValueType::Bytes.is_comparable());
        assert!(ValueType::entity("dept").is_entity());
    }

    #[test]
    fn test_accepts() {
        assert!(ValueType::Integer.accepts(&Value::Int(1)));
        assert!(ValueType::Integer.accepts(&Value::Null));
        assert!(!ValueType::Integer.accepts(&Value::Long(1)));
        assert!(!ValueType::String.accepts(&Value::Char('a')));

        let status = ValueType::enum_type("status", vec!["ACTIVE".into(), "RETIRED".into()]);
        assert!(status.accepts(&Value::from("ACTIVE")));
        assert!(!status.accepts(&Value::from("UNKNOWN")));
    }
}
