//! Entity types and attribute identity.
//!
//! An [`Attribute`] is identified by its entity type and name only. The
//! value type travels with it but takes no part in equality or hashing, so
//! two attributes with the same name on the same entity type are the same
//! attribute regardless of how they were declared.

mod types;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub use types::ValueType;

use crate::resource::ResourceBundle;

/// A named entity type, optionally backed by a resource bundle for captions.
#[derive(Clone)]
pub struct EntityType {
    inner: Arc<EntityTypeInner>,
}

struct EntityTypeInner {
    name: String,
    resource_bundle: Option<ResourceBundle>,
}

impl EntityType {
    /// Create an entity type without a resource bundle.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EntityTypeInner {
                name: name.into(),
                resource_bundle: None,
            }),
        }
    }

    /// Create an entity type whose captions are looked up in `bundle`.
    pub fn with_resource_bundle(name: impl Into<String>, bundle: ResourceBundle) -> Self {
        Self {
            inner: Arc::new(EntityTypeInner {
                name: name.into(),
                resource_bundle: Some(bundle),
            }),
        }
    }

    /// The entity type name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The resource bundle used for caption lookups, if any.
    pub fn resource_bundle(&self) -> Option<&ResourceBundle> {
        self.inner.resource_bundle.as_ref()
    }

    /// Declare an attribute of this entity type.
    pub fn attribute(&self, name: impl Into<String>, value_type: ValueType) -> Attribute {
        Attribute::new(self.clone(), name, value_type)
    }

    pub fn short_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::Short)
    }

    pub fn integer_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::Integer)
    }

    pub fn long_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::Long)
    }

    pub fn double_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::Double)
    }

    pub fn decimal_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::Decimal)
    }

    pub fn boolean_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::Boolean)
    }

    pub fn character_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::Character)
    }

    pub fn string_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::String)
    }

    pub fn date_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::Date)
    }

    pub fn time_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::Time)
    }

    pub fn date_time_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::DateTime)
    }

    pub fn offset_date_time_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::OffsetDateTime)
    }

    pub fn bytes_attribute(&self, name: impl Into<String>) -> Attribute {
        self.attribute(name, ValueType::Bytes)
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.inner.name == other.inner.name
    }
}

impl Eq for EntityType {}

impl Hash for EntityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.name.hash(state);
    }
}

impl fmt::Debug for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityType").field(&self.inner.name).finish()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

/// A typed attribute of an entity type.
#[derive(Clone)]
pub struct Attribute {
    inner: Arc<AttributeInner>,
}

struct AttributeInner {
    entity_type: EntityType,
    name: String,
    value_type: ValueType,
}

impl Attribute {
    /// Create a new attribute.
    pub fn new(entity_type: EntityType, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            inner: Arc::new(AttributeInner {
                entity_type,
                name: name.into(),
                value_type,
            }),
        }
    }

    /// The entity type this attribute belongs to.
    pub fn entity_type(&self) -> &EntityType {
        &self.inner.entity_type
    }

    /// The attribute name, unique within its entity type.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The type of values this attribute holds.
    pub fn value_type(&self) -> &ValueType {
        &self.inner.value_type
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.name == other.inner.name
                && self.inner.entity_type == other.inner.entity_type)
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.entity_type.hash(state);
        self.inner.name.hash(state);
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Attribute({}.{}: {})",
            self.inner.entity_type, self.inner.name, self.inner.value_type
        )
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.inner.entity_type, self.inner.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_attribute_identity_ignores_value_type() {
        let employee = EntityType::new("employee");
        let as_int = employee.integer_attribute("id");
        let as_long = employee.long_attribute("id");
        assert_eq!(as_int, as_long);

        let mut set = HashSet::new();
        set.insert(as_int);
        assert!(set.contains(&as_long));
    }

    #[test]
    fn test_attribute_identity_includes_entity_type() {
        let employee = EntityType::new("employee");
        let department = EntityType::new("department");
        assert_ne!(
            employee.integer_attribute("id"),
            department.integer_attribute("id")
        );
    }

    #[test]
    fn test_display() {
        let employee = EntityType::new("employee");
        let name = employee.string_attribute("name");
        assert_eq!(name.to_string(), "employee.name");
        assert_eq!(name.entity_type().name(), "employee");
        assert!(name.value_type().is_string());
    }
}
