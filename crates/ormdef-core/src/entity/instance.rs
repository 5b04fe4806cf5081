//! Entity instances.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::trace;

use super::{Domain, EntityDefinition, Key};
use crate::attribute::{Attribute, EntityType};
use crate::definition::{AttributeDefinition, DefinitionKind, DerivedDefinition, ForeignKeyDefinition};
use crate::derived::SourceValues;
use crate::error::{Error, Result};
use crate::foreign_key::ForeignKey;
use crate::value::Value;

/// The attribute values of one entity.
///
/// Stored values are kept per attribute; an attribute that was never set
/// reads as null. Derived values are computed on read and cached until one
/// of their sources changes. Writing a foreign key copies the referenced
/// column values into the local columns, and writing a local column drops a
/// loaded referenced entity that no longer matches.
///
/// Reads take `&self` and fill the caches lazily; writes take `&mut self`.
#[derive(Clone)]
pub struct Entity {
    domain: Arc<Domain>,
    definition: Arc<EntityDefinition>,
    values: Vec<Option<Value>>,
    originals: Option<HashMap<usize, Value>>,
    derived_cache: Box<[OnceLock<Value>]>,
    key_cache: Box<[OnceLock<Option<Key>>]>,
    primary_key: OnceLock<Key>,
}

impl Entity {
    pub(crate) fn new(domain: Arc<Domain>, definition: Arc<EntityDefinition>) -> Self {
        let values = vec![None; definition.len()];
        let derived_cache = (0..definition.derived_slot_count())
            .map(|_| OnceLock::new())
            .collect();
        let key_cache = (0..definition.foreign_key_count())
            .map(|_| OnceLock::new())
            .collect();
        Self {
            domain,
            definition,
            values,
            originals: None,
            derived_cache,
            key_cache,
            primary_key: OnceLock::new(),
        }
    }

    pub fn entity_type(&self) -> &EntityType {
        self.definition.entity_type()
    }

    pub fn definition(&self) -> &Arc<EntityDefinition> {
        &self.definition
    }

    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    /// The value of `attribute`, null when not set.
    ///
    /// Derived values are computed here; provider errors are returned
    /// unchanged.
    pub fn get(&self, attribute: &Attribute) -> Result<Value> {
        let index = self.index_of(attribute)?;
        self.value_at(index)
    }

    /// Set the value of `attribute`, returning the previous value.
    ///
    /// The value must be of the attribute's type, and a foreign key accepts
    /// only entities of the referenced type. Derived attributes can not be
    /// set.
    pub fn set(&mut self, attribute: &Attribute, value: impl Into<Value>) -> Result<Value> {
        let index = self.index_of(attribute)?;
        let definition = Arc::clone(self.definition.definition_at(index));
        let value = self.checked(&definition, value.into())?;
        Ok(self.put(index, value)?.unwrap_or_default())
    }

    /// Set a value and return the entity.
    pub fn with(mut self, attribute: &Attribute, value: impl Into<Value>) -> Result<Self> {
        self.set(attribute, value)?;
        Ok(self)
    }

    /// Remove the value of `attribute`, returning it if present.
    ///
    /// Removing a foreign key leaves its local columns untouched.
    pub fn remove(&mut self, attribute: &Attribute) -> Result<Option<Value>> {
        let index = self.index_of(attribute)?;
        if self.definition.definition_at(index).is_derived() {
            return Err(Error::InvalidArgument(format!(
                "derived attribute {} has no value to remove",
                attribute
            )));
        }
        Ok(self.remove_at(index))
    }

    /// Whether a value has been set for `attribute`.
    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.definition
            .index_of(attribute)
            .is_some_and(|index| self.values[index].is_some())
    }

    /// Whether the value of `attribute` is null.
    ///
    /// For a foreign key this is [`Entity::is_foreign_key_null`].
    pub fn is_null(&self, attribute: &Attribute) -> Result<bool> {
        let definition = self.definition.definition(attribute)?;
        match definition.as_foreign_key() {
            Some(foreign_key) => self.is_foreign_key_null(foreign_key.foreign_key()),
            None => Ok(self.get(attribute)?.is_null()),
        }
    }

    /// Whether every local column of `foreign_key` is null.
    pub fn is_foreign_key_null(&self, foreign_key: &ForeignKey) -> Result<bool> {
        let definition = self.definition.foreign_key_definition(foreign_key)?;
        for column in definition.foreign_key().columns() {
            if !self.get(column)?.is_null() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// The key of the entity referenced by `foreign_key`, built from the
    /// local column values.
    ///
    /// `None` when every local column is null. A key with some null values
    /// is partial and not resolvable. The key is cached until a local column
    /// or the foreign key changes.
    pub fn referenced_key(&self, foreign_key: &ForeignKey) -> Result<Option<&Key>> {
        let index = self.index_of(foreign_key.attribute())?;
        let (Some(definition), Some(slot)) = (
            self.definition.definition_at(index).as_foreign_key(),
            self.definition.foreign_key_slot(index),
        ) else {
            return Err(Error::InvalidArgument(format!(
                "{} is not a foreign key",
                foreign_key.attribute()
            )));
        };
        if let Some(key) = self.key_cache[slot].get() {
            return Ok(key.as_ref());
        }
        let key = self.build_referenced_key(definition.foreign_key())?;
        Ok(self.key_cache[slot].get_or_init(|| key).as_ref())
    }

    /// The entity referenced by `foreign_key`.
    ///
    /// The loaded entity if one has been set, otherwise an entity holding
    /// only the referenced key values, or `None` when the key is null.
    pub fn referenced_entity(&self, foreign_key: &ForeignKey) -> Result<Option<Arc<Entity>>> {
        let index = self.index_of(foreign_key.attribute())?;
        if let Some(Value::Entity(entity)) = &self.values[index] {
            return Ok(Some(Arc::clone(entity)));
        }
        match self.referenced_key(foreign_key)? {
            Some(key) => Ok(Some(Arc::new(self.domain.entity_from_key(key)?))),
            None => Ok(None),
        }
    }

    /// Whether the entity referenced by `foreign_key` has been set.
    pub fn is_loaded(&self, foreign_key: &ForeignKey) -> Result<bool> {
        let index = self.index_of(foreign_key.attribute())?;
        Ok(matches!(self.values[index], Some(Value::Entity(_))))
    }

    /// The value of `attribute` formatted for display.
    pub fn string_of(&self, attribute: &Attribute) -> Result<String> {
        let definition = self.definition.definition(attribute)?;
        Ok(definition.string_of(&self.get(attribute)?))
    }

    /// The primary key.
    pub fn key(&self) -> &Key {
        self.primary_key
            .get_or_init(|| self.build_primary_key(|index| self.stored(index)))
    }

    /// The primary key as it was before any unsaved modification.
    pub fn original_key(&self) -> Key {
        self.build_primary_key(|index| {
            self.originals
                .as_ref()
                .and_then(|originals| originals.get(&index).cloned())
                .unwrap_or_else(|| self.stored(index))
        })
    }

    /// Whether any column or modifying transient attribute has unsaved
    /// changes.
    pub fn is_modified(&self) -> bool {
        self.originals.as_ref().is_some_and(|originals| {
            originals
                .keys()
                .any(|&index| self.marks_modified(self.definition.definition_at(index)))
        })
    }

    pub fn is_attribute_modified(&self, attribute: &Attribute) -> bool {
        match (&self.originals, self.definition.index_of(attribute)) {
            (Some(originals), Some(index)) => originals.contains_key(&index),
            _ => false,
        }
    }

    /// The value of `attribute` before any unsaved modification.
    pub fn original(&self, attribute: &Attribute) -> Result<Value> {
        let index = self.index_of(attribute)?;
        match self.originals.as_ref().and_then(|o| o.get(&index)) {
            Some(original) => Ok(original.clone()),
            None => self.value_at(index),
        }
    }

    /// Accept the current value of `attribute` as unmodified.
    pub fn save(&mut self, attribute: &Attribute) -> Result<()> {
        let index = self.index_of(attribute)?;
        self.remove_original(index);
        Ok(())
    }

    pub fn save_all(&mut self) {
        self.originals = None;
    }

    /// Restore the original value of `attribute`.
    pub fn revert(&mut self, attribute: &Attribute) -> Result<()> {
        let index = self.index_of(attribute)?;
        self.revert_at(index)
    }

    pub fn revert_all(&mut self) -> Result<()> {
        let indexes: Vec<usize> = self
            .originals
            .as_ref()
            .map(|originals| originals.keys().copied().collect())
            .unwrap_or_default();
        for index in indexes {
            self.revert_at(index)?;
        }
        Ok(())
    }

    /// Set every attribute without a value to its default value.
    pub fn apply_default_values(&mut self) -> Result<()> {
        let definition = Arc::clone(&self.definition);
        for (index, attribute) in definition.definitions().iter().enumerate() {
            if attribute.has_default_value() && !attribute.is_derived() && self.values[index].is_none()
            {
                self.put(index, attribute.prepare_value(attribute.default_value().clone()))?;
            }
        }
        Ok(())
    }

    /// Remove the primary key values.
    pub fn clear_primary_key(&mut self) {
        let indexes = self.definition.primary_key_indexes().to_vec();
        for index in indexes {
            self.remove_at(index);
        }
    }

    /// The stored values, in declaration order.
    pub fn values(&self) -> impl Iterator<Item = (&Attribute, &Value)> {
        self.definition
            .definitions()
            .iter()
            .zip(&self.values)
            .filter_map(|(definition, value)| value.as_ref().map(|v| (definition.attribute(), v)))
    }

    fn index_of(&self, attribute: &Attribute) -> Result<usize> {
        self.definition
            .index_of(attribute)
            .ok_or_else(|| self.definition.not_found(attribute))
    }

    fn stored(&self, index: usize) -> Value {
        self.values[index].clone().unwrap_or_default()
    }

    fn value_at(&self, index: usize) -> Result<Value> {
        let definition = self.definition.definition_at(index);
        match definition.as_derived() {
            Some(derived) => self.derived_value(index, definition, derived),
            None => Ok(self.stored(index)),
        }
    }

    fn derived_value(
        &self,
        index: usize,
        definition: &AttributeDefinition,
        derived: &DerivedDefinition,
    ) -> Result<Value> {
        let Some(slot) = self.definition.derived_slot(index) else {
            return self.derive(definition, derived);
        };
        if let Some(value) = self.derived_cache[slot].get() {
            return Ok(value.clone());
        }
        let value = self.derive(definition, derived)?;
        trace!(attribute = %definition.attribute(), "cached derived value");
        Ok(self.derived_cache[slot].get_or_init(|| value).clone())
    }

    fn derive(&self, definition: &AttributeDefinition, derived: &DerivedDefinition) -> Result<Value> {
        let sources = SourceValues::new(self, definition.attribute(), derived.sources());
        derived.provider().get(&sources)
    }

    fn checked(&self, definition: &AttributeDefinition, value: Value) -> Result<Value> {
        if definition.is_derived() {
            return Err(Error::InvalidArgument(format!(
                "derived attribute {} can not be set",
                definition.attribute()
            )));
        }
        if !definition.value_type().accepts(&value) {
            return Err(Error::InvalidArgument(format!(
                "{} ({}) is not a valid {} value for {}",
                value,
                value.type_name(),
                definition.value_type(),
                definition.attribute()
            )));
        }
        if let (Some(foreign_key), Value::Entity(referenced)) = (definition.as_foreign_key(), &value) {
            for reference in foreign_key.references() {
                if !referenced.definition().contains(reference.referenced_column()) {
                    return Err(Error::InvalidArgument(format!(
                        "referenced entity {} does not define {}",
                        referenced.entity_type(),
                        reference.referenced_column()
                    )));
                }
            }
        }
        Ok(definition.prepare_value(value))
    }

    fn put(&mut self, index: usize, value: Value) -> Result<Option<Value>> {
        let previous = self.values[index].replace(value.clone());
        if previous.as_ref() == Some(&value) {
            return Ok(previous);
        }
        if let Some(previous) = &previous {
            self.update_original(index, previous.clone(), &value);
        }
        self.value_changed(index, &value);
        let definition = Arc::clone(&self.definition);
        if let Some(foreign_key) = definition.definition_at(index).as_foreign_key() {
            self.propagate_references(foreign_key, &value)?;
        }
        Ok(previous)
    }

    fn remove_at(&mut self, index: usize) -> Option<Value> {
        let removed = self.values[index].take();
        if removed.is_some() {
            self.remove_original(index);
            self.value_changed(index, &Value::Null);
        }
        removed
    }

    fn revert_at(&mut self, index: usize) -> Result<()> {
        let original = self.originals.as_ref().and_then(|o| o.get(&index).cloned());
        if let Some(original) = original {
            self.put(index, original)?;
        }
        Ok(())
    }

    fn update_original(&mut self, index: usize, previous: Value, current: &Value) {
        let originals = self.originals.get_or_insert_with(HashMap::new);
        match originals.get(&index).map(|original| original == current) {
            None => {
                originals.insert(index, previous);
            }
            Some(true) => {
                originals.remove(&index);
            }
            Some(false) => {}
        }
        if originals.is_empty() {
            self.originals = None;
        }
    }

    fn remove_original(&mut self, index: usize) {
        if let Some(originals) = &mut self.originals {
            originals.remove(&index);
            if originals.is_empty() {
                self.originals = None;
            }
        }
    }

    fn marks_modified(&self, definition: &AttributeDefinition) -> bool {
        match definition.kind() {
            DefinitionKind::Column(column) => !column.read_only(),
            DefinitionKind::Transient(transient) => transient.modifies(),
            DefinitionKind::ForeignKey(_) | DefinitionKind::Derived(_) => false,
        }
    }

    fn value_changed(&mut self, index: usize, value: &Value) {
        let definition = Arc::clone(&self.definition);
        let attribute = definition.definition_at(index);
        match attribute.kind() {
            DefinitionKind::Column(column) => {
                if column.is_primary_key() && self.primary_key.take().is_some() {
                    trace!(entity_type = %definition.entity_type(), "dropped cached primary key");
                }
                for &foreign_key in definition.column_foreign_keys(index) {
                    self.foreign_key_column_changed(foreign_key, attribute.attribute(), value);
                }
            }
            DefinitionKind::ForeignKey(_) => self.drop_referenced_key(index),
            DefinitionKind::Derived(_) | DefinitionKind::Transient(_) => {}
        }
        self.invalidate_dependents(index);
    }

    fn propagate_references(
        &mut self,
        foreign_key: &ForeignKeyDefinition,
        value: &Value,
    ) -> Result<()> {
        let referenced = value.as_entity().cloned();
        for reference in foreign_key.references() {
            if foreign_key.is_read_only(reference.column()) {
                continue;
            }
            let Some(column) = self.definition.index_of(reference.column()) else {
                continue;
            };
            let column_value = match &referenced {
                Some(entity) => entity.get(reference.referenced_column())?,
                None => Value::Null,
            };
            let column_value = self
                .definition
                .definition_at(column)
                .prepare_value(column_value);
            self.put(column, column_value)?;
        }
        Ok(())
    }

    fn foreign_key_column_changed(&mut self, foreign_key: usize, column: &Attribute, value: &Value) {
        self.drop_referenced_key(foreign_key);
        let mismatch = match (
            &self.values[foreign_key],
            self.definition.definition_at(foreign_key).as_foreign_key(),
        ) {
            (Some(Value::Entity(referenced)), Some(definition)) => definition
                .foreign_key()
                .reference(column)
                .is_some_and(|reference| {
                    referenced
                        .get(reference.referenced_column())
                        .map_or(true, |referenced_value| &referenced_value != value)
                }),
            _ => false,
        };
        if mismatch {
            self.values[foreign_key] = None;
            self.remove_original(foreign_key);
            trace!(
                foreign_key = %self.definition.definition_at(foreign_key).attribute(),
                column = %column,
                "removed referenced entity no longer matching its column"
            );
            self.invalidate_dependents(foreign_key);
        }
    }

    fn drop_referenced_key(&mut self, foreign_key: usize) {
        if let Some(slot) = self.definition.foreign_key_slot(foreign_key) {
            if self.key_cache[slot].take().is_some() {
                trace!(
                    foreign_key = %self.definition.definition_at(foreign_key).attribute(),
                    "dropped cached referenced key"
                );
            }
        }
    }

    fn invalidate_dependents(&mut self, index: usize) {
        for &slot in self.definition.invalidations(index) {
            if self.derived_cache[slot].take().is_some() {
                trace!(
                    source = %self.definition.definition_at(index).attribute(),
                    slot,
                    "invalidated cached derived value"
                );
            }
        }
    }

    fn build_referenced_key(&self, foreign_key: &ForeignKey) -> Result<Option<Key>> {
        let mut values = Vec::with_capacity(foreign_key.references().len());
        for column in foreign_key.columns() {
            values.push(self.get(column)?);
        }
        if values.iter().all(Value::is_null) {
            return Ok(None);
        }
        let referenced_type = foreign_key.referenced_type();
        let attributes: Arc<[Attribute]> = foreign_key.referenced_columns().cloned().collect();
        let primary = self
            .domain
            .definition(referenced_type)
            .is_ok_and(|definition| definition.primary_key_attributes() == &attributes[..]);
        Ok(Some(Key::new(referenced_type.clone(), attributes, values, primary)))
    }

    fn build_primary_key(&self, value_of: impl Fn(usize) -> Value) -> Key {
        let values = self
            .definition
            .primary_key_indexes()
            .iter()
            .map(|&index| value_of(index))
            .collect();
        Key::new(
            self.definition.entity_type().clone(),
            self.definition.shared_primary_key_attributes(),
            values,
            true,
        )
    }
}

impl PartialEq for Entity {
    /// Entities are equal when of the same type with equal primary keys.
    /// Entities without a primary key value compare all stored values.
    fn eq(&self, other: &Self) -> bool {
        if self.entity_type() != other.entity_type() {
            return false;
        }
        let key = self.key();
        if key.is_null() {
            self.values == other.values
        } else {
            key == other.key()
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.definition.string_provider() {
            Some(provider) => f.write_str(&provider(self)),
            None => write!(f, "{}: {}", self.entity_type(), self.key()),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}) ", self.entity_type())?;
        f.debug_map()
            .entries(self.values().map(|(attribute, value)| (attribute.name(), value)))
            .finish()
    }
}
