//! Attribute value validation.
//!
//! [`validate_value`] checks a single value against the item, range and
//! length constraints of its definition. [`EntityValidator`] adds the
//! nullability check and applies both to every attribute of an entity.

use std::cmp::Ordering;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::attribute::Attribute;
use crate::definition::AttributeDefinition;
use crate::entity::Entity;
use crate::error::{Result, ValidationError, ValidationKind};
use crate::value::Value;

/// Check `value` against the items, value range and maximum length of
/// `definition`.
///
/// Range bounds are inclusive. Null passes every check here; nullability is
/// up to [`EntityValidator`].
pub fn validate_value(
    definition: &AttributeDefinition,
    value: &Value,
) -> std::result::Result<(), ValidationError> {
    if !definition.is_valid_item(value) {
        return Err(ValidationError::new(
            definition.attribute().clone(),
            value.clone(),
            ValidationKind::Item,
            format!(
                "invalid value for {}: {}",
                definition.caption(),
                definition.string_of(value)
            ),
        ));
    }
    if value.is_null() {
        return Ok(());
    }
    if definition.value_type().is_numeric() {
        validate_range(definition, value)?;
    }
    if definition.value_type().is_string() {
        validate_length(definition, value)?;
    }
    Ok(())
}

fn validate_range(
    definition: &AttributeDefinition,
    value: &Value,
) -> std::result::Result<(), ValidationError> {
    let minimum = definition.minimum_value();
    let maximum = definition.maximum_value();
    let below =
        minimum.is_some_and(|minimum| compare_to_bound(value, minimum) == Some(Ordering::Less));
    let above =
        maximum.is_some_and(|maximum| compare_to_bound(value, maximum) == Some(Ordering::Greater));
    if !below && !above {
        return Ok(());
    }
    let message = match (below, minimum, maximum) {
        (true, Some(minimum), _) => format!(
            "{} must be greater than or equal to {}",
            definition.caption(),
            minimum
        ),
        (_, _, Some(maximum)) => format!(
            "{} must be less than or equal to {}",
            definition.caption(),
            maximum
        ),
        _ => format!("{} is out of range", definition.caption()),
    };
    Err(ValidationError::new(
        definition.attribute().clone(),
        value.clone(),
        ValidationKind::Range { minimum, maximum },
        message,
    ))
}

// Integers and decimals compare exactly against bounds a decimal can hold.
fn compare_to_bound(value: &Value, bound: f64) -> Option<Ordering> {
    let exact = match value {
        Value::Short(_) | Value::Int(_) | Value::Long(_) => value.as_i64().map(Decimal::from),
        Value::Decimal(decimal) => Some(*decimal),
        _ => None,
    };
    match (exact, Decimal::from_f64(bound)) {
        (Some(number), Some(bound)) => Some(number.cmp(&bound)),
        _ => value.as_f64()?.partial_cmp(&bound),
    }
}

fn validate_length(
    definition: &AttributeDefinition,
    value: &Value,
) -> std::result::Result<(), ValidationError> {
    let Ok(maximum) = usize::try_from(definition.maximum_length()) else {
        return Ok(());
    };
    match value.as_str() {
        Some(text) if text.chars().count() > maximum => Err(ValidationError::new(
            definition.attribute().clone(),
            value.clone(),
            ValidationKind::Length { maximum },
            format!(
                "{} exceeds the maximum length of {}",
                definition.caption(),
                maximum
            ),
        )),
        _ => Ok(()),
    }
}

/// Validates the attribute values of entities.
#[derive(Debug, Clone)]
pub struct EntityValidator {
    strict: bool,
}

impl Default for EntityValidator {
    fn default() -> Self {
        Self { strict: true }
    }
}

impl EntityValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// In strict mode every attribute is validated; otherwise only the
    /// modified attributes of entities that already exist.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_valid(&self, entity: &Entity) -> bool {
        self.validate(entity).is_ok()
    }

    /// Validate every attribute, failing on the first invalid one.
    pub fn validate(&self, entity: &Entity) -> Result<()> {
        for definition in entity.definition().definitions() {
            if self.requires_validation(entity, definition) {
                self.validate_attribute(entity, definition.attribute())?;
            }
        }
        Ok(())
    }

    /// Validate the value of one attribute.
    pub fn validate_attribute(&self, entity: &Entity, attribute: &Attribute) -> Result<()> {
        let definition = entity.definition().definition(attribute)?;
        if definition.is_derived() {
            return Ok(());
        }
        if let Some(foreign_key) = definition.as_foreign_key() {
            if !definition.nullable() && entity.is_foreign_key_null(foreign_key.foreign_key())? {
                return Err(null_value(definition, Value::Null).into());
            }
            return Ok(());
        }
        let value = entity.get(attribute)?;
        if value.is_null() && !self.is_nullable(entity, definition) {
            return Err(null_value(definition, value).into());
        }
        validate_value(definition, &value)?;
        Ok(())
    }

    /// Whether `definition` may be null in `entity`.
    ///
    /// Read-only columns and derived attributes are filled elsewhere. In a
    /// new entity, primary key columns with a key generator and columns with
    /// a database default are filled on insert.
    pub fn is_nullable(&self, entity: &Entity, definition: &AttributeDefinition) -> bool {
        if definition.nullable() || definition.is_derived() {
            return true;
        }
        let Some(column) = definition.as_column() else {
            return false;
        };
        if column.read_only() {
            return true;
        }
        let new = entity.original_key().is_null();
        new && ((column.is_primary_key() && entity.definition().key_generator().is_some())
            || column.column_has_default_value())
    }

    fn requires_validation(&self, entity: &Entity, definition: &AttributeDefinition) -> bool {
        self.strict
            || entity.original_key().is_null()
            || entity.is_attribute_modified(definition.attribute())
    }
}

fn null_value(definition: &AttributeDefinition, value: Value) -> ValidationError {
    ValidationError::new(
        definition.attribute().clone(),
        value,
        ValidationKind::NullValue,
        format!("{} is required", definition.caption()),
    )
}
