//! Foreign keys: named, ordered column references between entity types.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::attribute::{Attribute, EntityType, ValueType};
use crate::error::{Error, Result};

/// A local column paired with the column it references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    column: Attribute,
    referenced_column: Attribute,
}

impl Reference {
    pub fn new(column: Attribute, referenced_column: Attribute) -> Self {
        Self {
            column,
            referenced_column,
        }
    }

    /// The local column.
    pub fn column(&self) -> &Attribute {
        &self.column
    }

    /// The column on the referenced entity type.
    pub fn referenced_column(&self) -> &Attribute {
        &self.referenced_column
    }
}

/// A foreign key attribute.
///
/// The key itself is an attribute of its entity type, holding the referenced
/// entity; its value is backed by the local columns of its references.
#[derive(Clone)]
pub struct ForeignKey {
    inner: Arc<ForeignKeyInner>,
}

struct ForeignKeyInner {
    attribute: Attribute,
    referenced_type: EntityType,
    references: Vec<Reference>,
}

impl ForeignKey {
    /// Create a foreign key named `name` on `entity_type`.
    ///
    /// Fails unless there is at least one reference, all local columns
    /// belong to `entity_type`, all referenced columns belong to one entity
    /// type, no local column repeats, and every reference pairs two distinct
    /// columns of the same value type.
    pub fn new(
        entity_type: &EntityType,
        name: impl Into<String>,
        references: Vec<Reference>,
    ) -> Result<Self> {
        let name = name.into();
        let first = references.first().ok_or_else(|| {
            Error::InvalidArgument(format!(
                "foreign key {}.{} must have at least one reference",
                entity_type, name
            ))
        })?;
        let referenced_type = first.referenced_column.entity_type().clone();

        for (index, reference) in references.iter().enumerate() {
            if reference.column.entity_type() != entity_type {
                return Err(Error::InvalidArgument(format!(
                    "column {} in foreign key {} is not part of entity type {}",
                    reference.column, name, entity_type
                )));
            }
            if reference.referenced_column.entity_type() != &referenced_type {
                return Err(Error::InvalidArgument(format!(
                    "foreign key {} references columns of more than one entity type",
                    name
                )));
            }
            if reference.column == reference.referenced_column {
                return Err(Error::InvalidArgument(format!(
                    "column {} can not reference itself",
                    reference.column
                )));
            }
            if reference.column.value_type() != reference.referenced_column.value_type() {
                return Err(Error::InvalidArgument(format!(
                    "value type mismatch in foreign key {}: {} is {}, {} is {}",
                    name,
                    reference.column,
                    reference.column.value_type(),
                    reference.referenced_column,
                    reference.referenced_column.value_type()
                )));
            }
            if references[..index]
                .iter()
                .any(|other| other.column == reference.column)
            {
                return Err(Error::InvalidArgument(format!(
                    "column {} appears more than once in foreign key {}",
                    reference.column, name
                )));
            }
        }

        let attribute = entity_type.attribute(name, ValueType::entity(referenced_type.name()));
        Ok(Self {
            inner: Arc::new(ForeignKeyInner {
                attribute,
                referenced_type,
                references,
            }),
        })
    }

    /// A single column foreign key.
    pub fn single(
        entity_type: &EntityType,
        name: impl Into<String>,
        column: Attribute,
        referenced_column: Attribute,
    ) -> Result<Self> {
        Self::new(
            entity_type,
            name,
            vec![Reference::new(column, referenced_column)],
        )
    }

    /// The attribute holding the referenced entity.
    pub fn attribute(&self) -> &Attribute {
        &self.inner.attribute
    }

    pub fn name(&self) -> &str {
        self.inner.attribute.name()
    }

    pub fn entity_type(&self) -> &EntityType {
        self.inner.attribute.entity_type()
    }

    /// The entity type this key references.
    pub fn referenced_type(&self) -> &EntityType {
        &self.inner.referenced_type
    }

    /// The references, in declaration order.
    pub fn references(&self) -> &[Reference] {
        &self.inner.references
    }

    /// The reference for a local column, if it is part of this key.
    pub fn reference(&self, column: &Attribute) -> Option<&Reference> {
        self.inner
            .references
            .iter()
            .find(|reference| &reference.column == column)
    }

    /// The local columns, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &Attribute> {
        self.inner.references.iter().map(Reference::column)
    }

    /// The referenced columns, in declaration order.
    pub fn referenced_columns(&self) -> impl Iterator<Item = &Attribute> {
        self.inner
            .references
            .iter()
            .map(Reference::referenced_column)
    }
}

impl PartialEq for ForeignKey {
    fn eq(&self, other: &Self) -> bool {
        self.inner.attribute == other.inner.attribute
    }
}

impl Eq for ForeignKey {}

impl Hash for ForeignKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.attribute.hash(state);
    }
}

impl AsRef<Attribute> for ForeignKey {
    fn as_ref(&self) -> &Attribute {
        &self.inner.attribute
    }
}

impl fmt::Debug for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKey")
            .field("attribute", &self.inner.attribute)
            .field("references", &self.inner.references)
            .finish()
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types() -> (EntityType, EntityType) {
        (EntityType::new("employee"), EntityType::new("department"))
    }

    #[test]
    fn test_single_reference() {
        let (employee, department) = types();
        let fk = ForeignKey::single(
            &employee,
            "department_fk",
            employee.integer_attribute("department_id"),
            department.integer_attribute("id"),
        )
        .unwrap();

        assert_eq!(fk.referenced_type(), &department);
        assert_eq!(fk.attribute().value_type(), &ValueType::entity("department"));
        assert!(fk
            .reference(&employee.integer_attribute("department_id"))
            .is_some());
        assert_eq!(fk.columns().count(), 1);
    }

    #[test]
    fn test_empty_references() {
        let (employee, _) = types();
        assert!(matches!(
            ForeignKey::new(&employee, "fk", vec![]),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_foreign_local_column() {
        let (employee, department) = types();
        let result = ForeignKey::single(
            &employee,
            "fk",
            department.integer_attribute("id"),
            department.integer_attribute("id"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_mixed_referenced_types() {
        let (employee, department) = types();
        let location = EntityType::new("location");
        let result = ForeignKey::new(
            &employee,
            "fk",
            vec![
                Reference::new(
                    employee.integer_attribute("a"),
                    department.integer_attribute("id"),
                ),
                Reference::new(
                    employee.integer_attribute("b"),
                    location.integer_attribute("id"),
                ),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_local_column() {
        let (employee, department) = types();
        let result = ForeignKey::new(
            &employee,
            "fk",
            vec![
                Reference::new(
                    employee.integer_attribute("a"),
                    department.integer_attribute("id"),
                ),
                Reference::new(
                    employee.integer_attribute("a"),
                    department.integer_attribute("other"),
                ),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_self_reference_column() {
        let (employee, _) = types();
        let id = employee.integer_attribute("id");
        assert!(ForeignKey::single(&employee, "fk", id.clone(), id).is_err());

        let manager = ForeignKey::single(
            &employee,
            "manager_fk",
            employee.integer_attribute("manager_id"),
            employee.integer_attribute("id"),
        )
        .unwrap();
        assert_eq!(manager.referenced_type(), &employee);
    }

    #[test]
    fn test_type_mismatch() {
        let (employee, department) = types();
        let result = ForeignKey::single(
            &employee,
            "fk",
            employee.long_attribute("department_id"),
            department.integer_attribute("id"),
        );
        assert!(result.is_err());
    }
}
