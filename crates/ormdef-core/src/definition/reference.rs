//! Foreign key definitions.

use std::fmt;

use super::builder::{BaseDefinition, DefinitionBuilder};
use super::{AttributeDefinition, DefinitionKind};
use crate::attribute::{Attribute, EntityType};
use crate::error::{Error, Result};
use crate::foreign_key::{ForeignKey, Reference};

/// A foreign key attribute and its fetch metadata.
#[derive(Clone)]
pub struct ForeignKeyDefinition {
    foreign_key: ForeignKey,
    reference_depth: i32,
    soft_reference: bool,
    read_only: Vec<Attribute>,
    attributes: Vec<Attribute>,
}

impl ForeignKeyDefinition {
    /// Start building a definition for `foreign_key`.
    pub fn builder(foreign_key: ForeignKey) -> ForeignKeyDefinitionBuilder {
        let base = BaseDefinition::new(foreign_key.attribute().clone());
        let definition = ForeignKeyDefinition {
            reference_depth: base.config.foreign_key_reference_depth,
            foreign_key,
            soft_reference: false,
            read_only: Vec::new(),
            attributes: Vec::new(),
        };
        ForeignKeyDefinitionBuilder { base, definition }
    }

    pub fn foreign_key(&self) -> &ForeignKey {
        &self.foreign_key
    }

    pub fn referenced_type(&self) -> &EntityType {
        self.foreign_key.referenced_type()
    }

    pub fn references(&self) -> &[Reference] {
        self.foreign_key.references()
    }

    /// How many levels of references to fetch: 0 for none, -1 for all.
    pub fn reference_depth(&self) -> i32 {
        self.reference_depth
    }

    /// Whether the reference may point to an entity that does not exist.
    pub fn soft_reference(&self) -> bool {
        self.soft_reference
    }

    /// Whether `column` is left untouched when the referenced entity is set.
    pub fn is_read_only(&self, column: &Attribute) -> bool {
        self.read_only.contains(column)
    }

    /// Attributes of the referenced entity to fetch, empty for all.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}

impl fmt::Debug for ForeignKeyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKeyDefinition")
            .field("foreign_key", &self.foreign_key)
            .field("reference_depth", &self.reference_depth)
            .field("soft_reference", &self.soft_reference)
            .field("read_only", &self.read_only)
            .finish()
    }
}

/// Builds a foreign key [`AttributeDefinition`].
pub struct ForeignKeyDefinitionBuilder {
    base: BaseDefinition,
    definition: ForeignKeyDefinition,
}

impl ForeignKeyDefinitionBuilder {
    /// Levels of references to fetch, -1 for unlimited.
    pub fn reference_depth(mut self, depth: i32) -> Result<Self> {
        if depth < -1 {
            return Err(Error::InvalidArgument(format!(
                "reference depth must be at least -1: {}",
                depth
            )));
        }
        self.definition.reference_depth = depth;
        Ok(self)
    }

    pub fn soft_reference(mut self, soft_reference: bool) -> Self {
        self.definition.soft_reference = soft_reference;
        self
    }

    /// Leave `column` untouched when the referenced entity is set.
    pub fn read_only(mut self, column: &Attribute) -> Result<Self> {
        if self.definition.foreign_key.reference(column).is_none() {
            return Err(Error::InvalidArgument(format!(
                "{} is not part of foreign key {}",
                column, self.definition.foreign_key
            )));
        }
        if !self.definition.read_only.contains(column) {
            self.definition.read_only.push(column.clone());
        }
        Ok(self)
    }

    /// Restrict the attributes fetched for the referenced entity.
    pub fn attributes(mut self, attributes: impl IntoIterator<Item = Attribute>) -> Result<Self> {
        let attributes: Vec<Attribute> = attributes.into_iter().collect();
        let referenced_type = self.definition.foreign_key.referenced_type();
        if let Some(foreign) = attributes
            .iter()
            .find(|attribute| attribute.entity_type() != referenced_type)
        {
            return Err(Error::InvalidArgument(format!(
                "{} is not an attribute of {}",
                foreign, referenced_type
            )));
        }
        self.definition.attributes = attributes;
        Ok(self)
    }
}

impl DefinitionBuilder for ForeignKeyDefinitionBuilder {
    fn base(&mut self) -> &mut BaseDefinition {
        &mut self.base
    }

    fn build(self) -> Result<AttributeDefinition> {
        Ok(AttributeDefinition::new(
            self.base,
            DefinitionKind::ForeignKey(self.definition),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foreign_key() -> ForeignKey {
        let employee = EntityType::new("employee");
        let department = EntityType::new("department");
        ForeignKey::single(
            &employee,
            "department_fk",
            employee.integer_attribute("department_id"),
            department.integer_attribute("id"),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let definition = ForeignKeyDefinition::builder(foreign_key()).build().unwrap();
        let fk = definition.as_foreign_key().unwrap();
        assert_eq!(fk.reference_depth(), 1);
        assert!(!fk.soft_reference());
        assert!(fk.attributes().is_empty());
        assert_eq!(fk.referenced_type().name(), "department");
    }

    #[test]
    fn test_reference_depth() {
        assert!(ForeignKeyDefinition::builder(foreign_key())
            .reference_depth(-1)
            .is_ok());
        assert!(matches!(
            ForeignKeyDefinition::builder(foreign_key()).reference_depth(-2),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_read_only_column_must_belong_to_key() {
        let fk = foreign_key();
        let employee = fk.entity_type().clone();
        let definition = ForeignKeyDefinition::builder(fk.clone())
            .read_only(&employee.integer_attribute("department_id"))
            .unwrap()
            .build()
            .unwrap();
        assert!(definition
            .as_foreign_key()
            .unwrap()
            .is_read_only(&employee.integer_attribute("department_id")));

        assert!(ForeignKeyDefinition::builder(fk)
            .read_only(&employee.integer_attribute("id"))
            .is_err());
    }

    #[test]
    fn test_fetch_attributes() {
        let fk = foreign_key();
        let department = fk.referenced_type().clone();
        let employee = fk.entity_type().clone();
        assert!(ForeignKeyDefinition::builder(fk.clone())
            .attributes([department.string_attribute("name")])
            .is_ok());
        assert!(ForeignKeyDefinition::builder(fk)
            .attributes([employee.string_attribute("name")])
            .is_err());
    }
}
