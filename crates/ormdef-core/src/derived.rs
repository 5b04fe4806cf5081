//! Derived value providers.
//!
//! A derived attribute has no stored value; it is computed on read by a
//! [`ValueProvider`] from a fixed, ordered set of source attributes of the
//! same entity.

use std::fmt;

use crate::attribute::Attribute;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::value::Value;

/// Computes a derived value from its source values.
///
/// Errors are propagated to the caller of [`Entity::get`] unchanged.
pub trait ValueProvider: Send + Sync {
    /// Compute the value.
    fn get(&self, sources: &SourceValues<'_>) -> Result<Value>;

    /// Whether this provider reads through a foreign key.
    ///
    /// Denormalized values can change without any local write and are
    /// therefore never cached.
    fn is_denormalized(&self) -> bool {
        false
    }
}

impl<F> ValueProvider for F
where
    F: Fn(&SourceValues<'_>) -> Result<Value> + Send + Sync,
{
    fn get(&self, sources: &SourceValues<'_>) -> Result<Value> {
        self(sources)
    }
}

/// Read access to the declared sources of one derived attribute.
pub struct SourceValues<'a> {
    entity: &'a Entity,
    attribute: &'a Attribute,
    sources: &'a [Attribute],
}

impl<'a> SourceValues<'a> {
    pub(crate) fn new(entity: &'a Entity, attribute: &'a Attribute, sources: &'a [Attribute]) -> Self {
        Self {
            entity,
            attribute,
            sources,
        }
    }

    /// The derived attribute being computed.
    pub fn attribute(&self) -> &Attribute {
        self.attribute
    }

    /// The declared source attributes.
    pub fn sources(&self) -> &[Attribute] {
        self.sources
    }

    /// The value of a source attribute.
    ///
    /// Asking for an attribute that is not a declared source is an error.
    pub fn get(&self, source: &Attribute) -> Result<Value> {
        if !self.sources.contains(source) {
            return Err(Error::InvalidArgument(format!(
                "{} is not a source attribute of {}",
                source, self.attribute
            )));
        }
        self.entity.get(source)
    }

    /// The value of a source attribute, or `default` when it is null.
    pub fn get_or(&self, source: &Attribute, default: impl Into<Value>) -> Result<Value> {
        let value = self.get(source)?;
        Ok(if value.is_null() { default.into() } else { value })
    }
}

impl fmt::Debug for SourceValues<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceValues")
            .field("attribute", self.attribute)
            .field("sources", &self.sources)
            .finish()
    }
}

/// Reads one attribute of the entity referenced by a foreign key.
///
/// Yields null while the foreign key holds no entity.
#[derive(Debug, Clone)]
pub struct DenormalizedProvider {
    foreign_key: Attribute,
    attribute: Attribute,
}

impl DenormalizedProvider {
    pub fn new(foreign_key: Attribute, attribute: Attribute) -> Self {
        Self {
            foreign_key,
            attribute,
        }
    }

    /// The foreign key attribute read through.
    pub fn foreign_key(&self) -> &Attribute {
        &self.foreign_key
    }

    /// The attribute read from the referenced entity.
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }
}

impl ValueProvider for DenormalizedProvider {
    fn get(&self, sources: &SourceValues<'_>) -> Result<Value> {
        match sources.get(&self.foreign_key)? {
            Value::Entity(referenced) => referenced.get(&self.attribute),
            _ => Ok(Value::Null),
        }
    }

    fn is_denormalized(&self) -> bool {
        true
    }
}
