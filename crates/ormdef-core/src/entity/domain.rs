//! Domains: the set of entity definitions that reference each other.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use tracing::debug;

use super::{Entity, EntityDefinition, Key};
use crate::attribute::EntityType;
use crate::error::{Error, Result};
use crate::value::Value;

static REGISTRY: LazyLock<DashMap<String, Arc<Domain>>> = LazyLock::new(DashMap::new);

/// Entity definitions of a domain, with foreign keys resolved between them.
pub struct Domain {
    name: String,
    definitions: Vec<Arc<EntityDefinition>>,
    indexes: HashMap<EntityType, usize>,
}

impl Domain {
    pub fn builder(name: impl Into<String>) -> DomainBuilder {
        DomainBuilder {
            name: name.into(),
            definitions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definitions(&self) -> &[Arc<EntityDefinition>] {
        &self.definitions
    }

    pub fn contains(&self, entity_type: &EntityType) -> bool {
        self.indexes.contains_key(entity_type)
    }

    pub fn definition(&self, entity_type: &EntityType) -> Result<&Arc<EntityDefinition>> {
        self.indexes
            .get(entity_type)
            .map(|&index| &self.definitions[index])
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "entity {} is not defined in domain {}",
                    entity_type, self.name
                ))
            })
    }

    /// A new, empty entity.
    pub fn entity(self: &Arc<Self>, entity_type: &EntityType) -> Result<Entity> {
        let definition = Arc::clone(self.definition(entity_type)?);
        Ok(Entity::new(Arc::clone(self), definition))
    }

    /// A new entity holding the default value of every attribute that has one.
    pub fn entity_with_defaults(self: &Arc<Self>, entity_type: &EntityType) -> Result<Entity> {
        let mut entity = self.entity(entity_type)?;
        entity.apply_default_values()?;
        Ok(entity)
    }

    /// An entity populated with the values of `key`.
    pub fn entity_from_key(self: &Arc<Self>, key: &Key) -> Result<Entity> {
        let mut entity = self.entity(key.entity_type())?;
        for (attribute, value) in key.attributes().iter().zip(key.values()) {
            entity.set(attribute, value.clone())?;
        }
        entity.save_all();
        Ok(entity)
    }

    /// The primary key of `entity_type` holding a single `value`.
    pub fn primary_key(&self, entity_type: &EntityType, value: impl Into<Value>) -> Result<Key> {
        let definition = self.definition(entity_type)?;
        let attributes = definition.shared_primary_key_attributes();
        if attributes.len() != 1 {
            return Err(Error::InvalidArgument(format!(
                "entity {} does not have a single column primary key",
                entity_type
            )));
        }
        let value = value.into();
        if !attributes[0].value_type().accepts(&value) {
            return Err(Error::InvalidArgument(format!(
                "{} is not a valid value for {}",
                value, attributes[0]
            )));
        }
        Ok(Key::new(entity_type.clone(), attributes, vec![value], true))
    }

    /// Make this domain available through [`Domain::lookup`].
    pub fn register(self: &Arc<Self>) {
        debug!(domain = %self.name, "registered domain");
        REGISTRY.insert(self.name.clone(), Arc::clone(self));
    }

    /// A registered domain.
    pub fn lookup(name: &str) -> Option<Arc<Domain>> {
        REGISTRY.get(name).map(|domain| Arc::clone(domain.value()))
    }

    pub fn unregister(name: &str) -> Option<Arc<Domain>> {
        REGISTRY.remove(name).map(|(_, domain)| domain)
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("name", &self.name)
            .field(
                "entities",
                &self
                    .definitions
                    .iter()
                    .map(|d| d.entity_type().name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builds a [`Domain`].
pub struct DomainBuilder {
    name: String,
    definitions: Vec<EntityDefinition>,
}

impl DomainBuilder {
    /// Add an entity definition.
    pub fn entity(mut self, definition: EntityDefinition) -> Result<Self> {
        if self
            .definitions
            .iter()
            .any(|d| d.entity_type() == definition.entity_type())
        {
            return Err(Error::InvalidArgument(format!(
                "entity {} is defined more than once in domain {}",
                definition.entity_type(),
                self.name
            )));
        }
        self.definitions.push(definition);
        Ok(self)
    }

    /// Resolve foreign keys between the entity definitions.
    ///
    /// Every referenced entity type must be part of the domain, and every
    /// referenced column must be a column of it.
    pub fn build(self) -> Result<Arc<Domain>> {
        let indexes: HashMap<EntityType, usize> = self
            .definitions
            .iter()
            .enumerate()
            .map(|(index, d)| (d.entity_type().clone(), index))
            .collect();

        for definition in &self.definitions {
            for foreign_key in definition.foreign_key_definitions() {
                let referenced_type = foreign_key.referenced_type();
                let referenced = indexes
                    .get(referenced_type)
                    .map(|&index| &self.definitions[index])
                    .ok_or_else(|| {
                        Error::InvalidArgument(format!(
                            "entity {} referenced by {} is not defined in domain {}",
                            referenced_type,
                            foreign_key.foreign_key(),
                            self.name
                        ))
                    })?;
                for reference in foreign_key.references() {
                    let column = referenced.definition(reference.referenced_column())?;
                    if !column.is_column() {
                        return Err(Error::InvalidArgument(format!(
                            "referenced attribute {} of {} is not a column",
                            reference.referenced_column(),
                            foreign_key.foreign_key()
                        )));
                    }
                }
                for attribute in foreign_key.attributes() {
                    referenced.definition(attribute)?;
                }
            }
        }

        debug!(
            domain = %self.name,
            entities = self.definitions.len(),
            "built domain"
        );

        Ok(Arc::new(Domain {
            name: self.name,
            definitions: self.definitions.into_iter().map(Arc::new).collect(),
            indexes,
        }))
    }
}
