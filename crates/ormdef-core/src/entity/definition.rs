//! Entity definitions.
//!
//! An [`EntityDefinition`] owns the attribute definitions of one entity
//! type as an arena indexed by position. Two indexes are derived from it at
//! build time: a reverse dependency index mapping each attribute to the
//! derived attributes whose cached values depend on it, and a foreign key
//! index mapping each column to the foreign keys it participates in.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::Entity;
use crate::attribute::{Attribute, EntityType};
use crate::definition::{
    AttributeDefinition, ColumnDefinition, DefinitionBuilder, DefinitionKind, DerivedDefinition,
    ForeignKeyDefinition,
};
use crate::error::{Error, Result};
use crate::foreign_key::ForeignKey;
use crate::keygen::KeyGenerator;

/// Renders an entity for display.
pub type StringProvider = Arc<dyn Fn(&Entity) -> String + Send + Sync>;

/// The definitions of every attribute of one entity type.
pub struct EntityDefinition {
    entity_type: EntityType,
    table_name: String,
    caption: Option<String>,
    description: Option<String>,
    read_only: bool,
    string_provider: Option<StringProvider>,
    definitions: Vec<Arc<AttributeDefinition>>,
    indexes: HashMap<Attribute, usize>,
    primary_key: Vec<usize>,
    primary_key_attributes: Arc<[Attribute]>,
    /// Cache slot of each cached derived attribute.
    derived_slots: Vec<Option<usize>>,
    derived_slot_count: usize,
    /// Direct dependents of each attribute.
    dependents: Vec<Vec<usize>>,
    /// Cache slots to clear when an attribute changes, transitively.
    invalidations: Vec<Vec<usize>>,
    /// Referenced key cache slot of each foreign key.
    foreign_key_slots: Vec<Option<usize>>,
    foreign_key_count: usize,
    /// Foreign keys each column participates in.
    column_foreign_keys: Vec<Vec<usize>>,
}

impl EntityDefinition {
    pub fn builder(entity_type: EntityType) -> EntityDefinitionBuilder {
        EntityDefinitionBuilder {
            entity_type,
            table_name: None,
            caption: None,
            description: None,
            read_only: false,
            string_provider: None,
            definitions: Vec::new(),
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// The table name, the entity type name unless set.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn caption(&self) -> &str {
        self.caption
            .as_deref()
            .unwrap_or_else(|| self.entity_type.name())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Every attribute definition, in declaration order.
    pub fn definitions(&self) -> &[Arc<AttributeDefinition>] {
        &self.definitions
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.definitions.iter().map(|d| d.attribute())
    }

    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.indexes.contains_key(attribute)
    }

    /// The definition of `attribute`.
    pub fn definition(&self, attribute: &Attribute) -> Result<&Arc<AttributeDefinition>> {
        self.index_of(attribute)
            .map(|index| &self.definitions[index])
            .ok_or_else(|| self.not_found(attribute))
    }

    pub fn column_definitions(&self) -> impl Iterator<Item = (&Attribute, &ColumnDefinition)> {
        self.definitions
            .iter()
            .filter_map(|d| d.as_column().map(|c| (d.attribute(), c)))
    }

    pub fn derived_definitions(&self) -> impl Iterator<Item = (&Attribute, &DerivedDefinition)> {
        self.definitions
            .iter()
            .filter_map(|d| d.as_derived().map(|c| (d.attribute(), c)))
    }

    pub fn foreign_key_definitions(&self) -> impl Iterator<Item = &ForeignKeyDefinition> {
        self.definitions.iter().filter_map(|d| d.as_foreign_key())
    }

    pub fn foreign_key_definition(&self, foreign_key: &ForeignKey) -> Result<&ForeignKeyDefinition> {
        self.definition(foreign_key.attribute())?
            .as_foreign_key()
            .ok_or_else(|| {
                Error::InvalidArgument(format!("{} is not a foreign key", foreign_key.attribute()))
            })
    }

    /// Primary key column definitions, ordered by primary key index.
    pub fn primary_key_definitions(&self) -> impl Iterator<Item = &Arc<AttributeDefinition>> {
        self.primary_key.iter().map(|&index| &self.definitions[index])
    }

    /// Primary key columns, ordered by primary key index.
    pub fn primary_key_attributes(&self) -> &[Attribute] {
        &self.primary_key_attributes
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// The key generator of the first primary key column.
    pub fn key_generator(&self) -> Option<&Arc<dyn KeyGenerator>> {
        self.primary_key_definitions()
            .next()
            .and_then(|d| d.as_column())
            .and_then(ColumnDefinition::key_generator)
    }

    /// Foreign keys `column` participates in.
    pub fn foreign_keys(&self, column: &Attribute) -> Vec<&ForeignKey> {
        self.index_of(column)
            .map(|index| {
                self.column_foreign_keys[index]
                    .iter()
                    .filter_map(|&fk| self.definitions[fk].as_foreign_key())
                    .map(ForeignKeyDefinition::foreign_key)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Derived attributes reading `attribute` directly.
    pub fn derived_attributes(&self, attribute: &Attribute) -> Vec<&Attribute> {
        self.index_of(attribute)
            .map(|index| {
                self.dependents[index]
                    .iter()
                    .map(|&d| self.definitions[d].attribute())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_derived_attributes(&self, attribute: &Attribute) -> bool {
        self.index_of(attribute)
            .is_some_and(|index| !self.dependents[index].is_empty())
    }

    pub(crate) fn string_provider(&self) -> Option<&StringProvider> {
        self.string_provider.as_ref()
    }

    pub(crate) fn index_of(&self, attribute: &Attribute) -> Option<usize> {
        self.indexes.get(attribute).copied()
    }

    pub(crate) fn not_found(&self, attribute: &Attribute) -> Error {
        Error::InvalidArgument(format!(
            "attribute {} is not defined in entity {}",
            attribute, self.entity_type
        ))
    }

    pub(crate) fn definition_at(&self, index: usize) -> &Arc<AttributeDefinition> {
        &self.definitions[index]
    }

    pub(crate) fn len(&self) -> usize {
        self.definitions.len()
    }

    pub(crate) fn primary_key_indexes(&self) -> &[usize] {
        &self.primary_key
    }

    pub(crate) fn shared_primary_key_attributes(&self) -> Arc<[Attribute]> {
        Arc::clone(&self.primary_key_attributes)
    }

    pub(crate) fn derived_slot(&self, index: usize) -> Option<usize> {
        self.derived_slots[index]
    }

    pub(crate) fn derived_slot_count(&self) -> usize {
        self.derived_slot_count
    }

    pub(crate) fn invalidations(&self, index: usize) -> &[usize] {
        &self.invalidations[index]
    }

    pub(crate) fn foreign_key_slot(&self, index: usize) -> Option<usize> {
        self.foreign_key_slots[index]
    }

    pub(crate) fn foreign_key_count(&self) -> usize {
        self.foreign_key_count
    }

    pub(crate) fn column_foreign_keys(&self, index: usize) -> &[usize] {
        &self.column_foreign_keys[index]
    }
}

impl fmt::Debug for EntityDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDefinition")
            .field("entity_type", &self.entity_type)
            .field("table_name", &self.table_name)
            .field("definitions", &self.definitions)
            .finish_non_exhaustive()
    }
}

/// Builds an [`EntityDefinition`].
pub struct EntityDefinitionBuilder {
    entity_type: EntityType,
    table_name: Option<String>,
    caption: Option<String>,
    description: Option<String>,
    read_only: bool,
    string_provider: Option<StringProvider>,
    definitions: Vec<AttributeDefinition>,
}

impl EntityDefinitionBuilder {
    /// Add an attribute definition.
    pub fn attribute(mut self, definition: AttributeDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Build and add an attribute definition.
    pub fn define(self, builder: impl DefinitionBuilder) -> Result<Self> {
        Ok(self.attribute(builder.build()?))
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn string_provider(
        mut self,
        provider: impl Fn(&Entity) -> String + Send + Sync + 'static,
    ) -> Self {
        self.string_provider = Some(Arc::new(provider));
        self
    }

    /// Validate the definitions and build the dependency indexes.
    ///
    /// Fails when a definition belongs to another entity type, an attribute
    /// is defined twice, primary key indexes collide, a derived source or
    /// foreign key column is not defined, or derived attributes form a
    /// cycle.
    pub fn build(self) -> Result<EntityDefinition> {
        let entity_type = self.entity_type;
        let mut indexes = HashMap::with_capacity(self.definitions.len());
        for (index, definition) in self.definitions.iter().enumerate() {
            if definition.entity_type() != &entity_type {
                return Err(Error::InvalidArgument(format!(
                    "attribute {} does not belong to entity {}",
                    definition.attribute(),
                    entity_type
                )));
            }
            if indexes.insert(definition.attribute().clone(), index).is_some() {
                return Err(Error::InvalidArgument(format!(
                    "attribute {} is defined more than once",
                    definition.attribute()
                )));
            }
        }
        let definitions = self.definitions;
        let count = definitions.len();
        let lookup = |attribute: &Attribute, what: &str| {
            indexes.get(attribute).copied().ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "{} {} is not defined in entity {}",
                    what, attribute, entity_type
                ))
            })
        };

        let primary_key = primary_key_indexes(&definitions)?;

        let mut sources = vec![Vec::new(); count];
        let mut dependents = vec![Vec::new(); count];
        for (index, definition) in definitions.iter().enumerate() {
            if let DefinitionKind::Derived(derived) = definition.kind() {
                for source in derived.sources() {
                    let source_index = lookup(source, "source attribute")?;
                    sources[index].push(source_index);
                    dependents[source_index].push(index);
                }
            }
        }
        detect_cycles(&definitions, &sources)?;

        let mut derived_slots = vec![None; count];
        let mut derived_slot_count = 0;
        for (index, definition) in definitions.iter().enumerate() {
            if definition.as_derived().is_some_and(DerivedDefinition::cached) {
                derived_slots[index] = Some(derived_slot_count);
                derived_slot_count += 1;
            }
        }
        let invalidations = (0..count)
            .map(|index| transitive_slots(index, &dependents, &derived_slots))
            .collect();

        let mut foreign_key_slots = vec![None; count];
        let mut foreign_key_count = 0;
        let mut column_foreign_keys = vec![Vec::new(); count];
        for (index, definition) in definitions.iter().enumerate() {
            let Some(foreign_key) = definition.as_foreign_key() else {
                continue;
            };
            foreign_key_slots[index] = Some(foreign_key_count);
            foreign_key_count += 1;
            for reference in foreign_key.references() {
                let column_index = lookup(reference.column(), "foreign key column")?;
                if !definitions[column_index].is_column() {
                    return Err(Error::InvalidArgument(format!(
                        "foreign key column {} of {} is not a column",
                        reference.column(),
                        definition.attribute()
                    )));
                }
                column_foreign_keys[column_index].push(index);
            }
        }

        let primary_key_attributes: Arc<[Attribute]> = primary_key
            .iter()
            .map(|&index| definitions[index].attribute().clone())
            .collect();
        let table_name = self
            .table_name
            .unwrap_or_else(|| entity_type.name().to_string());

        debug!(
            entity_type = %entity_type,
            attributes = count,
            cached_derived = derived_slot_count,
            foreign_keys = foreign_key_count,
            "built entity definition"
        );

        Ok(EntityDefinition {
            entity_type,
            table_name,
            caption: self.caption,
            description: self.description,
            read_only: self.read_only,
            string_provider: self.string_provider,
            definitions: definitions.into_iter().map(Arc::new).collect(),
            indexes,
            primary_key,
            primary_key_attributes,
            derived_slots,
            derived_slot_count,
            dependents,
            invalidations,
            foreign_key_slots,
            foreign_key_count,
            column_foreign_keys,
        })
    }
}

fn primary_key_indexes(definitions: &[AttributeDefinition]) -> Result<Vec<usize>> {
    let mut keyed: Vec<(u32, usize)> = definitions
        .iter()
        .enumerate()
        .filter_map(|(index, d)| {
            d.as_column()
                .and_then(ColumnDefinition::primary_key_index)
                .map(|pk| (pk, index))
        })
        .collect();
    keyed.sort_unstable();
    for pair in keyed.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(Error::InvalidArgument(format!(
                "primary key index {} is used by both {} and {}",
                pair[0].0,
                definitions[pair[0].1].attribute(),
                definitions[pair[1].1].attribute()
            )));
        }
    }
    Ok(keyed.into_iter().map(|(_, index)| index).collect())
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    New,
    Active,
    Done,
}

fn detect_cycles(definitions: &[AttributeDefinition], sources: &[Vec<usize>]) -> Result<()> {
    let mut state = vec![Visit::New; definitions.len()];
    let mut path = Vec::new();
    for index in 0..definitions.len() {
        if state[index] == Visit::New && !sources[index].is_empty() {
            visit(index, definitions, sources, &mut state, &mut path)?;
        }
    }
    Ok(())
}

fn visit(
    index: usize,
    definitions: &[AttributeDefinition],
    sources: &[Vec<usize>],
    state: &mut [Visit],
    path: &mut Vec<usize>,
) -> Result<()> {
    state[index] = Visit::Active;
    path.push(index);
    for &source in &sources[index] {
        match state[source] {
            Visit::Done => {}
            Visit::New => visit(source, definitions, sources, state, path)?,
            Visit::Active => {
                let start = path.iter().position(|&i| i == source).unwrap_or(0);
                let cycle = path[start..]
                    .iter()
                    .chain(std::iter::once(&source))
                    .map(|&i| definitions[i].attribute().name())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(Error::InvalidArgument(format!(
                    "derived attributes of {} form a cycle: {}",
                    definitions[index].entity_type(),
                    cycle
                )));
            }
        }
    }
    path.pop();
    state[index] = Visit::Done;
    Ok(())
}

fn transitive_slots(
    index: usize,
    dependents: &[Vec<usize>],
    derived_slots: &[Option<usize>],
) -> Vec<usize> {
    let mut seen = vec![false; dependents.len()];
    let mut pending: Vec<usize> = dependents[index].clone();
    let mut slots = Vec::new();
    while let Some(dependent) = pending.pop() {
        if std::mem::replace(&mut seen[dependent], true) {
            continue;
        }
        if let Some(slot) = derived_slots[dependent] {
            slots.push(slot);
        }
        pending.extend(&dependents[dependent]);
    }
    slots.sort_unstable();
    slots
}
