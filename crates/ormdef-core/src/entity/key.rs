//! Entity keys.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::attribute::{Attribute, EntityType};
use crate::value::Value;

static NULL: Value = Value::Null;

/// Values of a set of key columns identifying an entity.
///
/// A primary key holds the primary key columns of its entity type; a
/// referenced key, built from the local columns of a foreign key, holds the
/// referenced columns. A key where some but not all values are null is
/// partial: neither null nor resolvable.
#[derive(Clone)]
pub struct Key {
    entity_type: EntityType,
    attributes: Arc<[Attribute]>,
    values: Vec<Value>,
    primary: bool,
}

impl Key {
    pub(crate) fn new(
        entity_type: EntityType,
        attributes: Arc<[Attribute]>,
        values: Vec<Value>,
        primary: bool,
    ) -> Self {
        debug_assert_eq!(attributes.len(), values.len());
        Self {
            entity_type,
            attributes,
            values,
            primary,
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// The key columns, in key order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// The key values, in key order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The value of a key column.
    pub fn get(&self, attribute: &Attribute) -> Option<&Value> {
        self.attributes
            .iter()
            .position(|a| a == attribute)
            .map(|index| &self.values[index])
    }

    /// The first key value, null for an empty key.
    pub fn value(&self) -> &Value {
        self.values.first().unwrap_or(&NULL)
    }

    /// Whether the key columns are the primary key of the entity type.
    pub fn is_primary_key(&self) -> bool {
        self.primary
    }

    /// A single column key.
    pub fn is_single(&self) -> bool {
        self.attributes.len() == 1
    }

    /// No values, or only nulls.
    pub fn is_null(&self) -> bool {
        self.values.iter().all(Value::is_null)
    }

    /// Every key value is present.
    pub fn is_resolvable(&self) -> bool {
        !self.values.is_empty() && !self.values.iter().any(Value::is_null)
    }

    /// Some, but not all, values are null.
    pub fn is_partial(&self) -> bool {
        !self.is_null() && !self.is_resolvable()
    }

    /// Lexicographic natural ordering of the key values.
    pub fn natural_cmp(&self, other: &Key) -> Option<Ordering> {
        for (a, b) in self.values.iter().zip(other.values.iter()) {
            match a.natural_cmp(b)? {
                Ordering::Equal => continue,
                ordering => return Some(ordering),
            }
        }
        Some(self.values.len().cmp(&other.values.len()))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type
            && self.attributes == other.attributes
            && self.values == other.values
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            return write!(f, "{}", self.values[0]);
        }
        for (index, (attribute, value)) in self.attributes.iter().zip(&self.values).enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", attribute.name(), value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}: {})", self.entity_type, self)
    }
}
